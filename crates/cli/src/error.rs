use engine_config::settings::error::SettingsError;
use engine_core::error::{ProgressError, StateStoreError};
use engine_runtime::error::RunError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Run failed: {0}")]
    Run(#[from] RunError),

    #[error("Failed to read pipeline status: {0}")]
    Status(#[from] ProgressError),

    #[error("Failed to read stored records: {0}")]
    Store(#[from] StateStoreError),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Unknown sensor '{0}'")]
    UnknownSensor(String),

    #[error("Shutdown requested")]
    ShutdownRequested,
}
