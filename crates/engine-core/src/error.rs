use thiserror::Error;

#[derive(Error, Debug)]
pub enum StateStoreError {
    #[error("Failed to open state store: {0}")]
    Open(String),

    #[error("State backend error: {0}")]
    Backend(String),

    #[error("Failed to encode or decode stored state: {0}")]
    Codec(String),

    #[error("Stored watermark is corrupt: {0}")]
    CorruptWatermark(String),
}

impl From<sled::Error> for StateStoreError {
    fn from(err: sled::Error) -> Self {
        StateStoreError::Backend(err.to_string())
    }
}

impl From<bincode::Error> for StateStoreError {
    fn from(err: bincode::Error) -> Self {
        StateStoreError::Codec(err.to_string())
    }
}

/// Errors raised by an imagery provider.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("Transport error talking to the imagery provider: {0}")]
    Transport(String),

    #[error("Imagery provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("Imagery provider rejected the credentials: {0}")]
    Unauthorized(String),

    #[error("Unexpected provider response: {0}")]
    Decode(String),

    #[error("Invalid provider request: {0}")]
    InvalidRequest(String),
}

impl SourceError {
    /// Whether a later run has a reasonable chance of succeeding unchanged.
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Transport(_) => true,
            SourceError::Provider { status, .. } => *status == 429 || *status >= 500,
            SourceError::Unauthorized(_) => false,
            SourceError::Decode(_) => false,
            SourceError::InvalidRequest(_) => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("I/O error writing artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize artifact: {0}")]
    Serialize(String),
}

#[derive(Error, Debug)]
pub enum ProgressError {
    #[error("Failed to read the watermark: {0}")]
    Watermark(StateStoreError),

    #[error("Failed to read the run journal: {0}")]
    Journal(StateStoreError),

    #[error("Failed to load stored records: {0}")]
    Records(StateStoreError),
}
