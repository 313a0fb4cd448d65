use crate::file::csv::error::FileError;
use async_trait::async_trait;
use engine_core::{connectors::artifact::ArtifactWriter, error::ArtifactError};
use model::records::record::ProcessedRecord;
use std::path::PathBuf;
use tracing::info;

pub const ARTIFACT_FILE_NAME: &str = "soil_moisture.csv";

/// Writes `<root>/<batch-id>/soil_moisture.csv`.
pub struct CsvArtifactWriter {
    root: PathBuf,
    value_column: String,
}

impl CsvArtifactWriter {
    pub fn new(root: impl Into<PathBuf>, value_column: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            value_column: value_column.into(),
        }
    }

    fn path_for(&self, batch_id: &str) -> Result<PathBuf, FileError> {
        let invalid = batch_id.is_empty()
            || batch_id == "."
            || batch_id == ".."
            || batch_id.contains(['/', '\\']);
        if invalid {
            return Err(FileError::InvalidName(batch_id.to_string()));
        }
        Ok(self.root.join(batch_id).join(ARTIFACT_FILE_NAME))
    }

    fn encode(&self, records: &[ProcessedRecord]) -> Result<Vec<u8>, FileError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["date", self.value_column.as_str(), "description"])?;

        for record in records {
            let value = record.value.map(|v| v.to_string()).unwrap_or_default();
            writer.write_record([
                record.date.to_string().as_str(),
                value.as_str(),
                record.label.as_str(),
            ])?;
        }

        writer
            .into_inner()
            .map_err(|e| FileError::FlushError(e.to_string()))
    }
}

#[async_trait]
impl ArtifactWriter for CsvArtifactWriter {
    async fn write(
        &self,
        batch_id: &str,
        records: &[ProcessedRecord],
    ) -> Result<PathBuf, ArtifactError> {
        let path = self.path_for(batch_id)?;
        let bytes = self.encode(records)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        info!("Combined CSV saved: {}", path.display());
        Ok(path)
    }
}
