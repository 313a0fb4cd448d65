use chrono::{DateTime, NaiveDate, Utc};
use model::{core::window::TimeRange, records::record::ProcessedRecord};
use serde::{Deserialize, Serialize};

/// What one commit asks the store to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkCommit {
    pub records: Vec<ProcessedRecord>,
    /// Proposed watermark; the store never moves backwards from it.
    pub watermark: Option<NaiveDate>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StoredRecord {
    pub record: ProcessedRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum RunOutcome {
    NoNewData,
    Committed { records: usize, failed: usize },
    NothingExtracted { failed: usize },
    Failed { error: String },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum JournalEntry {
    RunStart {
        run_id: String,
        at: DateTime<Utc>,
        window: TimeRange,
        watermark: Option<NaiveDate>,
    },
    ImageFailed {
        run_id: String,
        date: NaiveDate,
        image_id: String,
        reason: String,
    },
    BatchCommitted {
        run_id: String,
        batch_id: String,
        records: usize,
        watermark: Option<NaiveDate>,
    },
    RunFinished {
        run_id: String,
        at: DateTime<Utc>,
        outcome: RunOutcome,
    },
}

impl JournalEntry {
    pub fn run_id(&self) -> &str {
        match self {
            JournalEntry::RunStart { run_id, .. } => run_id,
            JournalEntry::ImageFailed { run_id, .. } => run_id,
            JournalEntry::BatchCommitted { run_id, .. } => run_id,
            JournalEntry::RunFinished { run_id, .. } => run_id,
        }
    }
}
