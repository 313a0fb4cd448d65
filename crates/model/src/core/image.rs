use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to one provider-side raster, as returned by an image listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Provider asset id, e.g. `COPERNICUS/S1_GRD/S1A_IW_GRDH_...`.
    pub id: String,
    pub acquired_at: DateTime<Utc>,
}

impl ImageRef {
    pub fn new(id: impl Into<String>, acquired_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            acquired_at,
        }
    }

    /// Acquisition date in UTC. This is the record key, never the processing date.
    pub fn date(&self) -> NaiveDate {
        self.acquired_at.date_naive()
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.acquired_at.to_rfc3339())
    }
}
