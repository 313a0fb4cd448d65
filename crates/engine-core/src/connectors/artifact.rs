use crate::error::ArtifactError;
use async_trait::async_trait;
use model::records::record::ProcessedRecord;
use std::path::PathBuf;

/// Local serialization sink for a committed batch.
#[async_trait]
pub trait ArtifactWriter: Send + Sync {
    /// Write `records` and return where they ended up.
    async fn write(
        &self,
        batch_id: &str,
        records: &[ProcessedRecord],
    ) -> Result<PathBuf, ArtifactError>;
}
