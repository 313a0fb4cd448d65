use crate::{
    error::StateStoreError,
    state::{
        JOURNAL_RETENTION, WatermarkStore,
        models::{JournalEntry, StoredRecord, WatermarkCommit},
    },
};
use async_trait::async_trait;
use chrono::NaiveDate;
use sled::{
    Transactional,
    transaction::{ConflictableTransactionError, TransactionError},
};
use std::path::Path;
use tracing::debug;

const RECORDS_TREE: &str = "records";
const META_TREE: &str = "meta";
const WATERMARK_KEY: &str = "watermark";
const JOURNAL_PREFIX: &str = "wal:";

pub struct SledWatermarkStore {
    db: sled::Db,
    records: sled::Tree,
    meta: sled::Tree,
    journal_retention: usize,
}

impl SledWatermarkStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StateStoreError> {
        let path = path.as_ref();
        let db = sled::open(path)
            .map_err(|e| StateStoreError::Open(format!("{}: {e}", path.display())))?;
        let records = db.open_tree(RECORDS_TREE)?;
        let meta = db.open_tree(META_TREE)?;
        Ok(Self {
            db,
            records,
            meta,
            journal_retention: JOURNAL_RETENTION,
        })
    }

    pub fn with_journal_retention(mut self, entries: usize) -> Self {
        self.journal_retention = entries;
        self
    }

    /// ISO dates sort lexicographically in date order.
    #[inline]
    fn record_key(date: NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }

    /// Journal keys are zero-padded so byte order equals append order.
    #[inline]
    fn journal_key(seq: u64) -> String {
        format!("{JOURNAL_PREFIX}{seq:020}")
    }

    /// Drop journal entries beyond the newest `journal_retention`.
    fn trim_journal(&self) -> Result<usize, StateStoreError> {
        let mut batch = sled::Batch::default();
        let mut dropped = 0;
        for item in self
            .db
            .scan_prefix(JOURNAL_PREFIX)
            .rev()
            .skip(self.journal_retention)
        {
            let (key, _) = item?;
            batch.remove(key);
            dropped += 1;
        }
        if dropped > 0 {
            self.db.apply_batch(batch)?;
            debug!(dropped, "Trimmed run journal");
        }
        Ok(dropped)
    }

    fn parse_watermark(bytes: &[u8]) -> Result<NaiveDate, StateStoreError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| StateStoreError::CorruptWatermark(e.to_string()))?;
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map_err(|e| StateStoreError::CorruptWatermark(format!("{text}: {e}")))
    }
}

#[async_trait]
impl WatermarkStore for SledWatermarkStore {
    async fn last_processed(&self) -> Result<Option<NaiveDate>, StateStoreError> {
        match self.meta.get(WATERMARK_KEY)? {
            Some(bytes) => Ok(Some(Self::parse_watermark(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn commit_processed(
        &self,
        commit: &WatermarkCommit,
    ) -> Result<Option<NaiveDate>, StateStoreError> {
        let now = chrono::Utc::now();

        // Records and watermark move together or not at all.
        let result = (&self.records, &self.meta).transaction(|(records, meta)| {
            for record in &commit.records {
                let key = Self::record_key(record.date);
                let created_at = match records.get(key.as_str())? {
                    Some(existing) => bincode::deserialize::<StoredRecord>(&existing)
                        .map_err(|e| {
                            ConflictableTransactionError::Abort(StateStoreError::Codec(
                                e.to_string(),
                            ))
                        })?
                        .created_at,
                    None => now,
                };

                let stored = StoredRecord {
                    record: record.clone(),
                    created_at,
                    updated_at: now,
                };
                let bytes = bincode::serialize(&stored).map_err(|e| {
                    ConflictableTransactionError::Abort(StateStoreError::Codec(e.to_string()))
                })?;
                records.insert(key.as_str(), bytes)?;
            }

            let current = match meta.get(WATERMARK_KEY)? {
                Some(bytes) => Some(
                    Self::parse_watermark(&bytes).map_err(ConflictableTransactionError::Abort)?,
                ),
                None => None,
            };

            let next = current.max(commit.watermark);
            if let Some(date) = next
                && Some(date) != current
            {
                meta.insert(WATERMARK_KEY, Self::record_key(date).as_str())?;
            }

            Ok(next)
        });

        let watermark = match result {
            Ok(watermark) => watermark,
            Err(TransactionError::Abort(e)) => return Err(e),
            Err(TransactionError::Storage(e)) => return Err(e.into()),
        };

        self.db.flush_async().await?;
        debug!(
            records = commit.records.len(),
            watermark = ?watermark,
            "Committed records to sled"
        );
        Ok(watermark)
    }

    async fn load_record(&self, date: NaiveDate) -> Result<Option<StoredRecord>, StateStoreError> {
        match self.records.get(Self::record_key(date))? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn history(&self, limit: usize) -> Result<Vec<StoredRecord>, StateStoreError> {
        let mut out = Vec::new();
        for item in self.records.iter().rev().take(limit) {
            let (_key, value) = item?;
            out.push(bincode::deserialize(&value)?);
        }
        Ok(out)
    }

    async fn append_journal(&self, entry: &JournalEntry) -> Result<(), StateStoreError> {
        let seq = self.db.generate_id()?;
        let value = bincode::serialize(entry)?;
        self.db.insert(Self::journal_key(seq), value)?;
        if matches!(entry, JournalEntry::RunFinished { .. }) {
            self.trim_journal()?;
        }
        self.db.flush_async().await?;
        Ok(())
    }

    async fn recent_journal(&self, limit: usize) -> Result<Vec<JournalEntry>, StateStoreError> {
        let mut entries = Vec::new();
        for item in self.db.scan_prefix(JOURNAL_PREFIX).rev().take(limit) {
            let (_key, value) = item?;
            entries.push(bincode::deserialize::<JournalEntry>(&value)?);
        }
        entries.reverse();
        Ok(entries)
    }
}
