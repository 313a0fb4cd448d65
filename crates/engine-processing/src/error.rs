use engine_core::error::{SourceError, StateStoreError};
use std::time::Duration;
use thiserror::Error;

/// Failure extracting one image. The driver logs it and skips the image.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("Zonal reduction failed: {0}")]
    Reduce(SourceError),

    #[error("Failed to start export: {0}")]
    ExportStart(SourceError),

    #[error("Failed to poll export '{task}': {source}")]
    ExportStatus {
        task: String,
        #[source]
        source: SourceError,
    },

    #[error("Export '{task}' failed: {reason}")]
    ExportFailed { task: String, reason: String },

    #[error("Export '{task}' was cancelled")]
    ExportCancelled { task: String },

    #[error("Export '{task}' still running after {waited:?} ({polls} polls)")]
    ExportTimedOut {
        task: String,
        waited: Duration,
        polls: usize,
    },
}

impl ExtractError {
    /// Whether rerunning later is likely to help. Every extraction failure is
    /// retried by the next run regardless; this only shapes the log level.
    pub fn is_transient(&self) -> bool {
        match self {
            ExtractError::Reduce(e) | ExtractError::ExportStart(e) => e.is_transient(),
            ExtractError::ExportStatus { source, .. } => source.is_transient(),
            ExtractError::ExportTimedOut { .. } => true,
            ExtractError::ExportFailed { .. } | ExtractError::ExportCancelled { .. } => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum CommitError {
    #[error("Cannot commit an empty batch")]
    EmptyBatch,

    #[error("Failed to persist batch '{batch_id}': {source}")]
    Store {
        batch_id: String,
        #[source]
        source: StateStoreError,
    },
}
