use model::records::batch::Batch;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// How far a committed batch moves the watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatermarkPolicy {
    /// Latest date with a record. A failed date below it is never revisited.
    #[default]
    MaxSucceeded,
    /// Latest date up to which every attempted date has a record. Dates after
    /// the first failure are committed but re-extracted next run.
    Contiguous,
    /// Latest attempted date, failed or not.
    MaxAttempted,
}

impl WatermarkPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatermarkPolicy::MaxSucceeded => "max-succeeded",
            WatermarkPolicy::Contiguous => "contiguous",
            WatermarkPolicy::MaxAttempted => "max-attempted",
        }
    }

    /// Proposed watermark for `batch`. The store keeps the larger of this and
    /// what it already holds.
    pub fn advance_to(&self, batch: &Batch) -> Option<NaiveDate> {
        match self {
            WatermarkPolicy::MaxSucceeded => batch.max_succeeded(),
            WatermarkPolicy::Contiguous => batch.contiguous_succeeded(),
            WatermarkPolicy::MaxAttempted => batch.max_attempted(),
        }
    }
}

impl fmt::Display for WatermarkPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WatermarkPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "max-succeeded" => Ok(WatermarkPolicy::MaxSucceeded),
            "contiguous" => Ok(WatermarkPolicy::Contiguous),
            "max-attempted" => Ok(WatermarkPolicy::MaxAttempted),
            other => Err(format!("Unknown watermark policy: {other}")),
        }
    }
}
