#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use connectors::file::csv::writer::CsvArtifactWriter;
use engine_core::state::{WatermarkStore, sled_store::SledWatermarkStore};
use engine_processing::{
    commit::CommitPhase,
    extract::{ExportMode, ExportOptions, ExtractionStep},
    watermark::WatermarkPolicy,
};
use engine_runtime::driver::IncrementalDriver;
use model::{
    classify::ClassificationProfile,
    core::{image::ImageRef, sensor::SensorKind, zone::ZoneOfInterest},
};
use std::{path::PathBuf, sync::Arc};
use tempfile::TempDir;
use utils::{FakeImageSource, FlakyStore, RecordingNotifier};

pub mod integration;
pub mod utils;

pub const LOOKBACK_DAYS: u32 = 15;

/// Wall clock every scenario runs at.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
}

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
}

/// A Sentinel-1 style image acquired on June `day` at 18:02 UTC.
pub fn image(day: u32) -> ImageRef {
    ImageRef::new(
        format!("COPERNICUS/S1_GRD/S1A_IW_GRDH_202506{day:02}T180200"),
        Utc.with_ymd_and_hms(2025, 6, day, 18, 2, 0).unwrap(),
    )
}

/// An image acquired on June `day` at `hour`:00 UTC, for several images per date.
pub fn image_at(day: u32, hour: u32) -> ImageRef {
    ImageRef::new(
        format!("COPERNICUS/S1_GRD/S1A_IW_GRDH_202506{day:02}T{hour:02}0000"),
        Utc.with_ymd_and_hms(2025, 6, day, hour, 0, 0).unwrap(),
    )
}

/// A 3-hourly SMAP L4 granule on June `day` at `hour`:30 UTC.
pub fn smap_image(day: u32, hour: u32) -> ImageRef {
    ImageRef::new(
        format!("NASA/SMAP/SPL4SMGP/007/202506{day:02}_{hour:02}30"),
        Utc.with_ymd_and_hms(2025, 6, day, hour, 30, 0).unwrap(),
    )
}

/// Fake provider, recording notifier and sled store in a temp dir, wired
/// into real extraction and commit phases.
pub struct Harness {
    pub dir: TempDir,
    pub source: Arc<FakeImageSource>,
    pub notifier: Arc<RecordingNotifier>,
    pub store: Arc<FlakyStore>,
}

impl Harness {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FlakyStore::new(
            SledWatermarkStore::open(dir.path().join("state")).unwrap(),
        ));
        Self {
            dir,
            source: Arc::new(FakeImageSource::default()),
            notifier: Arc::new(RecordingNotifier::default()),
            store,
        }
    }

    /// Simulates a process restart: the store is closed and opened again
    /// from disk, the provider and notifier survive.
    pub fn restart(self) -> Self {
        let Harness {
            dir,
            source,
            notifier,
            store,
        } = self;
        drop(store);
        let store = Arc::new(FlakyStore::new(
            SledWatermarkStore::open(dir.path().join("state")).unwrap(),
        ));
        Self {
            dir,
            source,
            notifier,
            store,
        }
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.dir.path().join("exports")
    }

    pub fn store(&self) -> Arc<dyn WatermarkStore> {
        self.store.clone()
    }

    pub fn driver(&self, policy: WatermarkPolicy) -> IncrementalDriver {
        self.driver_for(SensorKind::Sentinel1, policy)
    }

    pub fn driver_for(&self, sensor: SensorKind, policy: WatermarkPolicy) -> IncrementalDriver {
        let extract = ExtractionStep::new(
            self.source.clone(),
            Arc::new(ZoneOfInterest::moulouya()),
            Arc::new(ClassificationProfile::for_sensor(sensor)),
            sensor,
            ExportOptions {
                mode: ExportMode::Trigger,
                ..ExportOptions::default()
            },
        );
        let commit = CommitPhase::new(
            Arc::new(CsvArtifactWriter::new(
                self.exports_dir(),
                sensor.value_column(),
            )),
            self.notifier.clone(),
            self.store(),
            policy,
        );
        IncrementalDriver::new(
            self.source.clone(),
            self.store(),
            extract,
            commit,
            LOOKBACK_DAYS,
        )
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
