use connectors::{error::ConnectorError, notify::error::NotifyError};
use engine_config::settings::error::SettingsError;
use engine_core::error::{SourceError, StateStoreError};
use engine_processing::error::CommitError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error("Failed to open the watermark store: {0}")]
    StoreOpen(String),

    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Notifier setup failed: {0}")]
    Notifier(#[from] NotifyError),

    #[error("Failed to list images: {0}")]
    Listing(#[from] SourceError),

    #[error("Failed to read the watermark: {0}")]
    Watermark(#[from] StateStoreError),

    #[error("Commit failed: {0}")]
    Commit(#[from] CommitError),
}

impl RunError {
    /// Errors that no amount of rerunning fixes. Anything else is left to the
    /// next scheduled run.
    pub fn is_fatal(&self) -> bool {
        match self {
            RunError::Settings(_)
            | RunError::Initialization(_)
            | RunError::StoreOpen(_)
            | RunError::Connector(_)
            | RunError::Notifier(_) => true,
            RunError::Listing(_) | RunError::Watermark(_) | RunError::Commit(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_failures_are_not_fatal() {
        assert!(!RunError::Listing(SourceError::Transport("reset".into())).is_fatal());
        assert!(!RunError::Commit(CommitError::EmptyBatch).is_fatal());
        assert!(RunError::Settings(SettingsError::Missing("EE_PROJECT".into())).is_fatal());
        assert!(RunError::StoreOpen("locked".into()).is_fatal());
    }
}
