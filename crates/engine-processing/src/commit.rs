use crate::{error::CommitError, watermark::WatermarkPolicy};
use chrono::NaiveDate;
use engine_core::{
    connectors::{artifact::ArtifactWriter, notify::Notifier},
    state::{WatermarkStore, models::WatermarkCommit},
};
use model::records::batch::Batch;
use serde::Serialize;
use std::{path::PathBuf, sync::Arc};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitReport {
    pub batch_id: String,
    pub records: usize,
    pub artifact: Option<PathBuf>,
    /// Watermark in effect after the commit.
    pub watermark: Option<NaiveDate>,
}

/// End-of-run publication of a non-empty batch.
///
/// Steps run in a fixed order: local artifact, webhook, email, store commit.
/// Only the store commit can fail the phase; artifact and notification
/// problems are logged and the commit still happens.
pub struct CommitPhase {
    artifacts: Arc<dyn ArtifactWriter>,
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn WatermarkStore>,
    policy: WatermarkPolicy,
}

impl CommitPhase {
    pub fn new(
        artifacts: Arc<dyn ArtifactWriter>,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn WatermarkStore>,
        policy: WatermarkPolicy,
    ) -> Self {
        Self {
            artifacts,
            notifier,
            store,
            policy,
        }
    }

    pub async fn commit(&self, batch: &Batch) -> Result<CommitReport, CommitError> {
        let batch_id = batch.id().ok_or(CommitError::EmptyBatch)?;
        let records = batch.records();

        let artifact = match self.artifacts.write(&batch_id, records).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(batch_id = %batch_id, "Failed to write local artifact: {e}");
                None
            }
        };

        self.notifier.notify_webhook(&batch_id, records).await;
        self.notifier
            .notify_email(&batch_id, artifact.as_deref())
            .await;

        let proposed = self.policy.advance_to(batch);
        if proposed < batch.max_succeeded() {
            info!(
                batch_id = %batch_id,
                policy = %self.policy,
                "Holding watermark at {:?} below the newest record because of failed dates",
                proposed
            );
        }

        let commit = WatermarkCommit {
            records: records.to_vec(),
            watermark: proposed,
        };
        let watermark = self
            .store
            .commit_processed(&commit)
            .await
            .map_err(|source| CommitError::Store {
                batch_id: batch_id.clone(),
                source,
            })?;

        info!(
            batch_id = %batch_id,
            records = records.len(),
            watermark = ?watermark,
            "Batch committed"
        );

        Ok(CommitReport {
            batch_id,
            records: records.len(),
            artifact,
            watermark,
        })
    }
}
