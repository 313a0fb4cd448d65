use crate::error::RunError;
use chrono::{DateTime, NaiveDate, Utc};
use engine_core::{
    connectors::source::ImageSource,
    state::{
        WatermarkStore,
        models::{JournalEntry, RunOutcome},
    },
};
use engine_processing::{
    commit::{CommitPhase, CommitReport},
    delta,
    extract::ExtractionStep,
};
use model::{
    core::window::TimeRange,
    records::batch::{Batch, FailedImage},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Result of one `run_once`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub window: TimeRange,
    pub watermark_before: Option<NaiveDate>,
    pub new_dates: Vec<NaiveDate>,
    pub outcome: RunOutcome,
    pub commit: Option<CommitReport>,
    pub failed: Vec<FailedImage>,
}

impl RunReport {
    pub fn watermark_after(&self) -> Option<NaiveDate> {
        self.commit
            .as_ref()
            .and_then(|commit| commit.watermark)
            .or(self.watermark_before)
    }
}

/// Computes the unprocessed delta, extracts it image by image and commits
/// whatever succeeded as one batch.
///
/// Not re-entrant: two drivers sharing one store must never run at once.
pub struct IncrementalDriver {
    source: Arc<dyn ImageSource>,
    store: Arc<dyn WatermarkStore>,
    extract: ExtractionStep,
    commit: CommitPhase,
    lookback_days: u32,
}

impl IncrementalDriver {
    pub fn new(
        source: Arc<dyn ImageSource>,
        store: Arc<dyn WatermarkStore>,
        extract: ExtractionStep,
        commit: CommitPhase,
        lookback_days: u32,
    ) -> Self {
        Self {
            source,
            store,
            extract,
            commit,
            lookback_days,
        }
    }

    pub fn store(&self) -> &Arc<dyn WatermarkStore> {
        &self.store
    }

    pub async fn run_once(&self) -> Result<RunReport, RunError> {
        self.run_once_at(Utc::now()).await
    }

    /// One run with the lookback window ending at `now`.
    pub async fn run_once_at(&self, now: DateTime<Utc>) -> Result<RunReport, RunError> {
        let run_id = Uuid::new_v4().to_string();
        let window = TimeRange::lookback(now, self.lookback_days);

        let watermark = self.store.last_processed().await?;
        info!(run_id = %run_id, "Starting run over {window}, watermark {watermark:?}");
        self.journal(JournalEntry::RunStart {
            run_id: run_id.clone(),
            at: now,
            window,
            watermark,
        })
        .await;

        let mut report = RunReport {
            run_id: run_id.clone(),
            started_at: now,
            finished_at: now,
            window,
            watermark_before: watermark,
            new_dates: Vec::new(),
            outcome: RunOutcome::NoNewData,
            commit: None,
            failed: Vec::new(),
        };

        let result = self.execute(&mut report, now).await;
        report.finished_at = Utc::now();
        if let Err(e) = &result {
            report.outcome = RunOutcome::Failed {
                error: e.to_string(),
            };
        }
        self.journal(JournalEntry::RunFinished {
            run_id,
            at: report.finished_at,
            outcome: report.outcome.clone(),
        })
        .await;

        result.map(|()| report)
    }

    async fn execute(&self, report: &mut RunReport, now: DateTime<Utc>) -> Result<(), RunError> {
        let watermark = report.watermark_before;

        let timestamps = self.source.list_timestamps(&report.window).await?;
        let fresh = delta::new_timestamps(&timestamps, watermark);
        let Some(range) = TimeRange::spanning(&fresh) else {
            info!(
                run_id = %report.run_id,
                listed = timestamps.len(),
                "No new data since {watermark:?}"
            );
            return Ok(());
        };
        report.new_dates = delta::new_dates(&fresh, watermark);

        let images = delta::order_images(self.source.list_images(&range).await?, watermark);
        info!(
            run_id = %report.run_id,
            images = images.len(),
            "Processing {} new date(s) in {range}",
            report.new_dates.len()
        );

        let run_date = now.date_naive();
        let mut batch = Batch::new(report.run_id.clone());
        for image in &images {
            batch.attempt(image);
            match self.extract.extract(image, run_date).await {
                Ok(record) => batch.push(record),
                Err(e) => {
                    if e.is_transient() {
                        warn!(date = %image.date(), image_id = %image.id, "Skipping image: {e}");
                    } else {
                        error!(date = %image.date(), image_id = %image.id, "Skipping image: {e}");
                    }
                    batch.fail(image, e.to_string());
                    self.journal(JournalEntry::ImageFailed {
                        run_id: report.run_id.clone(),
                        date: image.date(),
                        image_id: image.id.clone(),
                        reason: e.to_string(),
                    })
                    .await;
                }
            }
        }
        report.failed = batch.failed().to_vec();

        if batch.is_empty() {
            warn!(
                run_id = %report.run_id,
                failed = batch.failed().len(),
                "No records extracted, nothing committed"
            );
            report.outcome = RunOutcome::NothingExtracted {
                failed: batch.failed().len(),
            };
            return Ok(());
        }

        let committed = self.commit.commit(&batch).await?;
        self.journal(JournalEntry::BatchCommitted {
            run_id: report.run_id.clone(),
            batch_id: committed.batch_id.clone(),
            records: committed.records,
            watermark: committed.watermark,
        })
        .await;

        report.outcome = RunOutcome::Committed {
            records: committed.records,
            failed: batch.failed().len(),
        };
        report.commit = Some(committed);
        Ok(())
    }

    /// The journal is an audit trail; failing to extend it never fails a run.
    async fn journal(&self, entry: JournalEntry) {
        if let Err(e) = self.store.append_journal(&entry).await {
            warn!(run_id = %entry.run_id(), "Failed to append run journal entry: {e}");
        }
    }
}
