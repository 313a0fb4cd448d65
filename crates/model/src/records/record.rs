use crate::classify::ClassificationProfile;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One successfully extracted image: the zonal mean and its moisture class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    /// Acquisition date of the source image; unique within a batch and a store.
    pub date: NaiveDate,
    /// Zonal mean, `None` when the reduction had no pixels over the zone.
    pub value: Option<f64>,
    pub label: String,
}

impl ProcessedRecord {
    /// The only way records are produced: the label is always derived from
    /// the value through `profile`.
    pub fn classified(date: NaiveDate, value: Option<f64>, profile: &ClassificationProfile) -> Self {
        Self {
            date,
            value,
            label: profile.classify(value).to_string(),
        }
    }

    pub fn is_consistent_with(&self, profile: &ClassificationProfile) -> bool {
        self.label == profile.classify(self.value)
    }
}
