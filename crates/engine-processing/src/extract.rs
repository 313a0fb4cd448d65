use crate::error::ExtractError;
use chrono::NaiveDate;
use engine_core::{
    connectors::source::{ExportRequest, ExportState, ExportTask, ImageSource, RasterFormat},
    error::SourceError,
    poll::{PollError, PollPolicy, Probe},
};
use model::{
    classify::ClassificationProfile,
    core::{image::ImageRef, sensor::SensorKind, zone::ZoneOfInterest},
    records::record::ProcessedRecord,
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, sync::Arc};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    Disabled,
    /// Start the export and move on.
    #[default]
    Trigger,
    /// Start the export and poll it to a terminal state before reducing.
    Await,
}

impl fmt::Display for ExportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportMode::Disabled => f.write_str("disabled"),
            ExportMode::Trigger => f.write_str("trigger"),
            ExportMode::Await => f.write_str("await"),
        }
    }
}

impl FromStr for ExportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disabled" | "off" => Ok(ExportMode::Disabled),
            "trigger" => Ok(ExportMode::Trigger),
            "await" | "wait" => Ok(ExportMode::Await),
            other => Err(format!("Unknown export mode: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub mode: ExportMode,
    pub folder: String,
    pub crs: Option<String>,
    pub max_pixels: f64,
    pub format: RasterFormat,
    pub poll: PollPolicy,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            mode: ExportMode::Trigger,
            folder: "GEE_Soil_Moisture".to_string(),
            crs: None,
            max_pixels: 1e13,
            format: RasterFormat::GeoTiff,
            poll: PollPolicy::default(),
        }
    }
}

/// Export task description and file prefix for one image.
pub fn export_names(sensor: SensorKind, image_date: NaiveDate, run_date: NaiveDate) -> (String, String) {
    let description = format!("soil_moisture_{image_date}");
    let prefix = match sensor {
        SensorKind::Smap => format!("smap_soil_moisture_{image_date}"),
        SensorKind::Sentinel1 => format!("{run_date}/soil_moisture_{image_date}"),
    };
    (description, prefix)
}

/// Turns one image into one record: optional export, zonal mean, label.
pub struct ExtractionStep {
    source: Arc<dyn ImageSource>,
    zone: Arc<ZoneOfInterest>,
    profile: Arc<ClassificationProfile>,
    sensor: SensorKind,
    scale: f64,
    export: ExportOptions,
}

impl ExtractionStep {
    pub fn new(
        source: Arc<dyn ImageSource>,
        zone: Arc<ZoneOfInterest>,
        profile: Arc<ClassificationProfile>,
        sensor: SensorKind,
        export: ExportOptions,
    ) -> Self {
        Self {
            source,
            zone,
            profile,
            sensor,
            scale: sensor.scale(),
            export,
        }
    }

    /// An absent mean is a valid record. Only provider failures are errors.
    pub async fn extract(
        &self,
        image: &ImageRef,
        run_date: NaiveDate,
    ) -> Result<ProcessedRecord, ExtractError> {
        match self.export.mode {
            ExportMode::Disabled => {}
            ExportMode::Trigger => {
                self.start_export(image, run_date).await?;
            }
            ExportMode::Await => {
                let task = self.start_export(image, run_date).await?;
                self.await_export(&task).await?;
            }
        }

        let value = self
            .source
            .reduce_mean(image, &self.zone, self.scale)
            .await
            .map_err(ExtractError::Reduce)?;

        let record = ProcessedRecord::classified(image.date(), value, &self.profile);
        info!(
            date = %record.date,
            image_id = %image.id,
            "Processed {}: {} -> {}",
            record.date,
            record.value.map_or_else(|| "no data".to_string(), |v| v.to_string()),
            record.label
        );
        Ok(record)
    }

    fn export_request(&self, image: &ImageRef, run_date: NaiveDate) -> ExportRequest {
        let (description, file_prefix) = export_names(self.sensor, image.date(), run_date);
        ExportRequest {
            description,
            folder: self.export.folder.clone(),
            file_prefix,
            scale: self.scale,
            crs: self.export.crs.clone(),
            max_pixels: self.export.max_pixels,
            format: self.export.format,
        }
    }

    async fn start_export(&self, image: &ImageRef, run_date: NaiveDate) -> Result<ExportTask, ExtractError> {
        let request = self.export_request(image, run_date);
        let task = self
            .source
            .export_image(image, &self.zone, &request)
            .await
            .map_err(ExtractError::ExportStart)?;
        info!(
            date = %image.date(),
            task = %task.id,
            "Export task started: {}",
            task.description
        );
        Ok(task)
    }

    async fn await_export(&self, task: &ExportTask) -> Result<(), ExtractError> {
        let source = &self.source;
        let state = self
            .export
            .poll
            .wait(|| async move {
                let state = source.export_status(task).await?;
                debug!(task = %task.id, "Export status: {state}");
                Ok::<_, SourceError>(if state.is_terminal() {
                    Probe::Ready(state)
                } else {
                    Probe::Pending
                })
            })
            .await
            .map_err(|err| match err {
                PollError::Failed(source) => ExtractError::ExportStatus {
                    task: task.id.clone(),
                    source,
                },
                PollError::TimedOut { waited, polls } => ExtractError::ExportTimedOut {
                    task: task.id.clone(),
                    waited,
                    polls,
                },
            })?;

        match state {
            ExportState::Completed => {
                info!(task = %task.id, "Export completed: {}", task.description);
                Ok(())
            }
            ExportState::Failed(reason) => Err(ExtractError::ExportFailed {
                task: task.id.clone(),
                reason,
            }),
            ExportState::Cancelled => Err(ExtractError::ExportCancelled {
                task: task.id.clone(),
            }),
            ExportState::Pending | ExportState::Running => Err(ExtractError::ExportFailed {
                task: task.id.clone(),
                reason: format!("non-terminal state {state}"),
            }),
        }
    }
}
