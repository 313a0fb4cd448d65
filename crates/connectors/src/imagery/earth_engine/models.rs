use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListImagesResponse {
    #[serde(default)]
    pub images: Vec<ImageAsset>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImageAsset {
    pub id: Option<String>,
    pub name: String,
    pub start_time: DateTime<Utc>,
}

impl ImageAsset {
    /// Legacy id (`COLLECTION/IMAGE`) when present, otherwise derived from
    /// the asset resource name.
    pub fn asset_id(&self) -> String {
        if let Some(id) = &self.id {
            return id.clone();
        }
        self.name
            .split_once("/assets/")
            .map(|(_, id)| id.to_string())
            .unwrap_or_else(|| self.name.clone())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ComputeValueResponse {
    #[serde(default)]
    pub result: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Operation {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    pub error: Option<OperationError>,
    pub metadata: Option<OperationMetadata>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OperationError {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OperationMetadata {
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: String,
}
