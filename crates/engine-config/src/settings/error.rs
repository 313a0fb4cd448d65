use thiserror::Error;

/// Errors raised while turning the environment into typed settings.
#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    /// A required key is unset or blank.
    #[error("Missing required setting {0}")]
    Missing(String),

    #[error("Invalid value for {key} ({value:?}): {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },

    /// Every problem found in one pass.
    #[error("Settings validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),

    #[error("Failed to load zone of interest from {path}: {reason}")]
    Zone { path: String, reason: String },
}
