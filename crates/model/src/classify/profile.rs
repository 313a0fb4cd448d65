use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Label for a record whose reduction produced no value.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Label for a value outside every bin (or not finite).
pub const FALLBACK_LABEL: &str = "Unknown moisture class";

#[derive(Debug, Error, PartialEq)]
pub enum ClassifyError {
    #[error("Profile '{0}' has no bins")]
    Empty(String),

    #[error("Bin {index} of profile '{profile}' has non-finite or inverted bounds")]
    InvalidBounds { profile: String, index: usize },

    #[error("Bin {index} of profile '{profile}' overlaps or precedes the previous bin")]
    Unordered { profile: String, index: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoistureBin {
    pub lower: f64,
    pub upper: f64,
    pub label: String,
}

impl MoistureBin {
    pub fn new(lower: f64, upper: f64, label: impl Into<String>) -> Self {
        Self {
            lower,
            upper,
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationProfile {
    name: String,
    bins: Vec<MoistureBin>,
}

impl ClassificationProfile {
    /// Build a profile, rejecting empty, inverted or overlapping tables.
    pub fn new(name: impl Into<String>, bins: Vec<MoistureBin>) -> Result<Self, ClassifyError> {
        let name = name.into();
        if bins.is_empty() {
            return Err(ClassifyError::Empty(name));
        }

        for (index, bin) in bins.iter().enumerate() {
            if !bin.lower.is_finite() || !bin.upper.is_finite() || bin.lower >= bin.upper {
                return Err(ClassifyError::InvalidBounds {
                    profile: name,
                    index,
                });
            }
            if index > 0 && bin.lower < bins[index - 1].upper {
                return Err(ClassifyError::Unordered {
                    profile: name,
                    index,
                });
            }
        }

        Ok(Self { name, bins })
    }

    pub(crate) fn new_unchecked(name: &str, bins: Vec<MoistureBin>) -> Self {
        Self {
            name: name.to_string(),
            bins,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bins(&self) -> &[MoistureBin] {
        &self.bins
    }

    /// `(lowest lower bound, highest upper bound)`.
    pub fn domain(&self) -> Option<(f64, f64)> {
        Some((self.bins.first()?.lower, self.bins.last()?.upper))
    }

    /// Pure and total: every input maps to exactly one label.
    pub fn classify(&self, value: Option<f64>) -> &str {
        let Some(value) = value else {
            return UNKNOWN_LABEL;
        };

        if !value.is_finite() {
            return FALLBACK_LABEL;
        }

        self.bins
            .iter()
            .find(|bin| self.bin_matches(bin, value))
            .map(|bin| bin.label.as_str())
            .unwrap_or(FALLBACK_LABEL)
    }

    pub(crate) fn bin_matches(&self, bin: &MoistureBin, value: f64) -> bool {
        let is_last = self
            .bins
            .last()
            .is_some_and(|last| std::ptr::eq(last, bin));
        if is_last {
            bin.lower <= value && value <= bin.upper
        } else {
            bin.lower <= value && value < bin.upper
        }
    }
}
