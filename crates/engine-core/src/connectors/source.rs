use crate::error::SourceError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::core::{image::ImageRef, window::TimeRange, zone::ZoneOfInterest};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RasterFormat {
    GeoTiff,
}

impl RasterFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            RasterFormat::GeoTiff => "GEO_TIFF",
        }
    }
}

/// Where and how one image is exported. Passed straight through to the
/// provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub description: String,
    pub folder: String,
    pub file_prefix: String,
    pub scale: f64,
    pub crs: Option<String>,
    pub max_pixels: f64,
    pub format: RasterFormat,
}

/// Handle to a started provider-side export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportTask {
    pub id: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportState {
    Pending,
    Running,
    Completed,
    Failed(String),
    Cancelled,
}

impl ExportState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExportState::Completed | ExportState::Failed(_) | ExportState::Cancelled
        )
    }
}

impl fmt::Display for ExportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportState::Pending => f.write_str("pending"),
            ExportState::Running => f.write_str("running"),
            ExportState::Completed => f.write_str("completed"),
            ExportState::Failed(reason) => write!(f, "failed: {reason}"),
            ExportState::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Time-stamped rasters over a fixed region, one value band.
///
/// `list_timestamps` and `list_images` must apply the same range semantics:
/// every timestamp returned for a range has a matching image for that range.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn list_timestamps(&self, range: &TimeRange) -> Result<Vec<DateTime<Utc>>, SourceError>;

    async fn list_images(&self, range: &TimeRange) -> Result<Vec<ImageRef>, SourceError>;

    /// Spatial mean of the value band over `zone`, `None` when no pixel
    /// falls inside it.
    async fn reduce_mean(
        &self,
        image: &ImageRef,
        zone: &ZoneOfInterest,
        scale: f64,
    ) -> Result<Option<f64>, SourceError>;

    /// Start exporting `image` clipped to `zone`. Returns once the provider
    /// accepted the task, not when it finishes.
    async fn export_image(
        &self,
        image: &ImageRef,
        zone: &ZoneOfInterest,
        request: &ExportRequest,
    ) -> Result<ExportTask, SourceError>;

    async fn export_status(&self, task: &ExportTask) -> Result<ExportState, SourceError>;
}
