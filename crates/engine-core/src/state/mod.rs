use crate::{
    error::StateStoreError,
    state::models::{JournalEntry, StoredRecord, WatermarkCommit},
};
use async_trait::async_trait;
use chrono::NaiveDate;

pub mod models;
pub mod sled_store;

/// Journal entries kept once a run finishes. Older entries are dropped.
pub const JOURNAL_RETENTION: usize = 5_000;

/// Durable log of processed dates plus the watermark derived from it.
///
/// Single writer: nothing here guards against two runs committing at once.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// The latest committed watermark, `None` before the first commit.
    async fn last_processed(&self) -> Result<Option<NaiveDate>, StateStoreError>;

    /// Upsert every record by date and advance the watermark to
    /// `max(stored, commit.watermark)`, all in one transaction. Returns the
    /// watermark in effect after the commit.
    async fn commit_processed(
        &self,
        commit: &WatermarkCommit,
    ) -> Result<Option<NaiveDate>, StateStoreError>;

    async fn load_record(&self, date: NaiveDate) -> Result<Option<StoredRecord>, StateStoreError>;

    /// Stored records, newest date first.
    async fn history(&self, limit: usize) -> Result<Vec<StoredRecord>, StateStoreError>;

    /// Appending a `RunFinished` entry trims the journal to its retention.
    async fn append_journal(&self, entry: &JournalEntry) -> Result<(), StateStoreError>;

    /// The last `limit` journal entries, oldest first.
    async fn recent_journal(&self, limit: usize) -> Result<Vec<JournalEntry>, StateStoreError>;

    async fn run_journal(&self, run_id: &str) -> Result<Vec<JournalEntry>, StateStoreError> {
        Ok(self
            .recent_journal(usize::MAX)
            .await?
            .into_iter()
            .filter(|entry| entry.run_id() == run_id)
            .collect())
    }
}
