use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A closed time interval `[start, end]`.
///
/// Both the timestamp listing and the image listing of a source receive the
/// same `TimeRange`, so they always agree on whether the edges are included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// `[now - days, now]`, clamped to the earliest representable instant.
    pub fn lookback(now: DateTime<Utc>, days: u32) -> Self {
        let start = Duration::try_days(i64::from(days))
            .and_then(|span| now.checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self::new(start, now)
    }

    /// Smallest range covering every timestamp, `None` for an empty slice.
    pub fn spanning(timestamps: &[DateTime<Utc>]) -> Option<Self> {
        let start = timestamps.iter().min()?;
        let end = timestamps.iter().max()?;
        Some(Self::new(*start, *end))
    }

    pub fn contains(&self, at: &DateTime<Utc>) -> bool {
        self.start <= *at && *at <= self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}
