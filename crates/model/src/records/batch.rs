use crate::{core::image::ImageRef, records::record::ProcessedRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An image whose extraction failed during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedImage {
    pub date: NaiveDate,
    pub image_id: String,
    pub reason: String,
}

/// The records of one driver run, owned by that run until it is committed.
///
/// Records stay sorted by date and unique per date: pushing a second record
/// for a date replaces the first.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub run_id: String,
    records: Vec<ProcessedRecord>,
    failed: Vec<FailedImage>,
    attempted: Vec<NaiveDate>,
}

impl Batch {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            ..Default::default()
        }
    }

    /// Note that extraction of `image` is about to be attempted.
    pub fn attempt(&mut self, image: &ImageRef) {
        let date = image.date();
        if let Err(pos) = self.attempted.binary_search(&date) {
            self.attempted.insert(pos, date);
        }
    }

    pub fn push(&mut self, record: ProcessedRecord) {
        match self.records.binary_search_by_key(&record.date, |r| r.date) {
            Ok(pos) => self.records[pos] = record,
            Err(pos) => self.records.insert(pos, record),
        }
    }

    pub fn fail(&mut self, image: &ImageRef, reason: impl Into<String>) {
        self.failed.push(FailedImage {
            date: image.date(),
            image_id: image.id.clone(),
            reason: reason.into(),
        });
    }

    pub fn records(&self) -> &[ProcessedRecord] {
        &self.records
    }

    pub fn failed(&self) -> &[FailedImage] {
        &self.failed
    }

    pub fn attempted(&self) -> &[NaiveDate] {
        &self.attempted
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// `<first-date>_<last-date>` of the successful records.
    pub fn id(&self) -> Option<String> {
        let first = self.records.first()?;
        let last = self.records.last()?;
        Some(format!("{}_{}", first.date, last.date))
    }

    pub fn max_succeeded(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.date)
    }

    pub fn max_attempted(&self) -> Option<NaiveDate> {
        self.attempted.last().copied()
    }

    /// Largest attempted date `d` such that every attempted date up to `d`
    /// has a record. A date counts as failed if any of its images failed.
    pub fn contiguous_succeeded(&self) -> Option<NaiveDate> {
        let mut reached = None;
        for date in &self.attempted {
            let failed = self.failed.iter().any(|f| f.date == *date);
            let recorded = self
                .records
                .binary_search_by_key(date, |r| r.date)
                .is_ok();
            if failed || !recorded {
                break;
            }
            reached = Some(*date);
        }
        reached
    }
}
