//! Which listed images are still unprocessed relative to the watermark.

use chrono::{DateTime, NaiveDate, Utc};
use model::core::{image::ImageRef, window::TimeRange};

/// A date is new when it is strictly after the watermark. Ties are already
/// processed.
pub fn is_new(date: NaiveDate, watermark: Option<NaiveDate>) -> bool {
    watermark.is_none_or(|w| date > w)
}

/// Timestamps whose UTC date is new, ascending.
pub fn new_timestamps(
    timestamps: &[DateTime<Utc>],
    watermark: Option<NaiveDate>,
) -> Vec<DateTime<Utc>> {
    let mut fresh: Vec<_> = timestamps
        .iter()
        .copied()
        .filter(|ts| is_new(ts.date_naive(), watermark))
        .collect();
    fresh.sort();
    fresh.dedup();
    fresh
}

/// Distinct new dates, ascending.
pub fn new_dates(timestamps: &[DateTime<Utc>], watermark: Option<NaiveDate>) -> Vec<NaiveDate> {
    let mut dates: Vec<_> = new_timestamps(timestamps, watermark)
        .into_iter()
        .map(|ts| ts.date_naive())
        .collect();
    dates.dedup();
    dates
}

/// Closed range re-queried for the actual image set, `None` when nothing is
/// new.
pub fn pending_range(
    timestamps: &[DateTime<Utc>],
    watermark: Option<NaiveDate>,
) -> Option<TimeRange> {
    TimeRange::spanning(&new_timestamps(timestamps, watermark))
}

/// Keep only new images and put them in processing order: acquisition time,
/// then id for images sharing a timestamp.
pub fn order_images(images: Vec<ImageRef>, watermark: Option<NaiveDate>) -> Vec<ImageRef> {
    let mut images: Vec<_> = images
        .into_iter()
        .filter(|image| is_new(image.date(), watermark))
        .collect();
    images.sort_by(|a, b| {
        a.acquired_at
            .cmp(&b.acquired_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    images.dedup_by(|a, b| a.id == b.id);
    images
}
