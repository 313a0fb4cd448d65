use crate::{
    error::ProgressError,
    state::{
        JOURNAL_RETENTION, WatermarkStore,
        models::{JournalEntry, RunOutcome},
    },
};
use chrono::{DateTime, NaiveDate, Utc};
use model::core::window::TimeRange;
use serde::Serialize;
use std::{fmt, sync::Arc};

/// Status reports scan everything the journal retains.
const JOURNAL_SCAN_LIMIT: usize = JOURNAL_RETENTION;

#[derive(Clone)]
pub struct StatusService {
    pub store: Arc<dyn WatermarkStore>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RunStage {
    Never,
    Running,
    NoNewData,
    Committed,
    NothingExtracted,
    Failed,
}

impl RunStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStage::Never => "Never",
            RunStage::Running => "Running",
            RunStage::NoNewData => "NoNewData",
            RunStage::Committed => "Committed",
            RunStage::NothingExtracted => "NothingExtracted",
            RunStage::Failed => "Failed",
        }
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub stage: RunStage,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub window: Option<TimeRange>,
    pub committed: usize,
    pub failed_dates: Vec<NaiveDate>,
    pub error: Option<String>,
}

/// A date that failed extraction, is at or below the watermark, and has no
/// stored record: the date filter will never pick it up again.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Gap {
    pub date: NaiveDate,
    pub image_id: String,
    pub reason: String,
    pub run_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    pub watermark: Option<NaiveDate>,
    pub latest_run: Option<RunSummary>,
    pub gaps: Vec<Gap>,
}

impl StatusService {
    pub fn new(store: Arc<dyn WatermarkStore>) -> Self {
        StatusService { store }
    }

    pub async fn status(&self) -> Result<PipelineStatus, ProgressError> {
        let watermark = self
            .store
            .last_processed()
            .await
            .map_err(ProgressError::Watermark)?;

        let journal = self
            .store
            .recent_journal(JOURNAL_SCAN_LIMIT)
            .await
            .map_err(ProgressError::Journal)?;

        let latest_run = journal
            .iter()
            .rev()
            .find_map(|entry| match entry {
                JournalEntry::RunStart { run_id, .. } => Some(run_id.clone()),
                _ => None,
            })
            .map(|run_id| summarize(&run_id, &journal));

        let gaps = self.gaps(watermark, &journal).await?;

        Ok(PipelineStatus {
            watermark,
            latest_run,
            gaps,
        })
    }

    async fn gaps(
        &self,
        watermark: Option<NaiveDate>,
        journal: &[JournalEntry],
    ) -> Result<Vec<Gap>, ProgressError> {
        let Some(watermark) = watermark else {
            return Ok(Vec::new());
        };

        let mut gaps: Vec<Gap> = Vec::new();
        for entry in journal {
            let JournalEntry::ImageFailed {
                run_id,
                date,
                image_id,
                reason,
            } = entry
            else {
                continue;
            };

            if *date > watermark || gaps.iter().any(|g| g.date == *date) {
                continue;
            }

            let stored = self
                .store
                .load_record(*date)
                .await
                .map_err(ProgressError::Records)?;
            if stored.is_none() {
                gaps.push(Gap {
                    date: *date,
                    image_id: image_id.clone(),
                    reason: reason.clone(),
                    run_id: run_id.clone(),
                });
            }
        }

        gaps.sort_by_key(|g| g.date);
        Ok(gaps)
    }
}

fn summarize(run_id: &str, journal: &[JournalEntry]) -> RunSummary {
    let mut summary = RunSummary {
        run_id: run_id.to_string(),
        stage: RunStage::Running,
        ..Default::default()
    };

    for entry in journal.iter().filter(|e| e.run_id() == run_id) {
        match entry {
            JournalEntry::RunStart { at, window, .. } => {
                summary.started_at = Some(*at);
                summary.window = Some(*window);
            }
            JournalEntry::ImageFailed { date, .. } => summary.failed_dates.push(*date),
            JournalEntry::BatchCommitted { records, .. } => summary.committed = *records,
            JournalEntry::RunFinished { at, outcome, .. } => {
                summary.finished_at = Some(*at);
                summary.stage = match outcome {
                    RunOutcome::NoNewData => RunStage::NoNewData,
                    RunOutcome::Committed { .. } => RunStage::Committed,
                    RunOutcome::NothingExtracted { .. } => RunStage::NothingExtracted,
                    RunOutcome::Failed { error } => {
                        summary.error = Some(error.clone());
                        RunStage::Failed
                    }
                };
            }
        }
    }

    summary
}

impl Default for RunSummary {
    fn default() -> Self {
        Self {
            run_id: String::new(),
            stage: RunStage::Never,
            started_at: None,
            finished_at: None,
            window: None,
            committed: 0,
            failed_dates: Vec::new(),
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{models::WatermarkCommit, sled_store::SledWatermarkStore};
    use chrono::TimeZone;
    use model::{classify::ClassificationProfile, records::record::ProcessedRecord};
    use tempfile::tempdir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, d).unwrap()
    }

    fn window() -> TimeRange {
        TimeRange::new(
            Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 8, 6, 0, 0, 0).unwrap(),
        )
    }

    async fn store() -> (tempfile::TempDir, Arc<dyn WatermarkStore>) {
        let dir = tempdir().unwrap();
        let store: Arc<dyn WatermarkStore> =
            Arc::new(SledWatermarkStore::open(dir.path()).expect("open sled"));
        (dir, store)
    }

    #[tokio::test]
    async fn reports_never_run() {
        let (_dir, store) = store().await;
        let status = StatusService::new(store).status().await.unwrap();
        assert!(status.watermark.is_none());
        assert!(status.latest_run.is_none());
        assert!(status.gaps.is_empty());
    }

    #[tokio::test]
    async fn summarizes_latest_run_and_gaps() {
        let (_dir, store) = store().await;
        let run = "run-1";

        store
            .append_journal(&JournalEntry::RunStart {
                run_id: run.into(),
                at: Utc::now(),
                window: window(),
                watermark: None,
            })
            .await
            .unwrap();
        store
            .append_journal(&JournalEntry::ImageFailed {
                run_id: run.into(),
                date: day(2),
                image_id: "img-2".into(),
                reason: "provider 500".into(),
            })
            .await
            .unwrap();
        store
            .commit_processed(&WatermarkCommit {
                records: vec![ProcessedRecord::classified(
                    day(3),
                    Some(0.2),
                    &ClassificationProfile::smap(),
                )],
                watermark: Some(day(3)),
            })
            .await
            .unwrap();
        store
            .append_journal(&JournalEntry::BatchCommitted {
                run_id: run.into(),
                batch_id: "2025-08-03_2025-08-03".into(),
                records: 1,
                watermark: Some(day(3)),
            })
            .await
            .unwrap();
        store
            .append_journal(&JournalEntry::RunFinished {
                run_id: run.into(),
                at: Utc::now(),
                outcome: RunOutcome::Committed {
                    records: 1,
                    failed: 1,
                },
            })
            .await
            .unwrap();

        let status = StatusService::new(store).status().await.unwrap();
        assert_eq!(status.watermark, Some(day(3)));

        let latest = status.latest_run.unwrap();
        assert_eq!(latest.run_id, run);
        assert_eq!(latest.stage, RunStage::Committed);
        assert_eq!(latest.committed, 1);
        assert_eq!(latest.failed_dates, vec![day(2)]);

        assert_eq!(status.gaps.len(), 1);
        assert_eq!(status.gaps[0].date, day(2));
    }

    #[tokio::test]
    async fn recovered_dates_are_not_gaps() {
        let (_dir, store) = store().await;
        store
            .append_journal(&JournalEntry::ImageFailed {
                run_id: "r".into(),
                date: day(2),
                image_id: "img-2".into(),
                reason: "timeout".into(),
            })
            .await
            .unwrap();
        store
            .commit_processed(&WatermarkCommit {
                records: vec![ProcessedRecord::classified(
                    day(2),
                    None,
                    &ClassificationProfile::smap(),
                )],
                watermark: Some(day(4)),
            })
            .await
            .unwrap();

        let status = StatusService::new(store).status().await.unwrap();
        assert!(status.gaps.is_empty());
    }
}
