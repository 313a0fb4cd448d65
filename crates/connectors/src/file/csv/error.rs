use engine_core::error::ArtifactError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV writing error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Failed to flush CSV buffer: {0}")]
    FlushError(String),
    #[error("Invalid artifact name: {0}")]
    InvalidName(String),
}

impl From<FileError> for ArtifactError {
    fn from(err: FileError) -> Self {
        match err {
            FileError::IoError(e) => ArtifactError::Io(e),
            other => ArtifactError::Serialize(other.to_string()),
        }
    }
}
