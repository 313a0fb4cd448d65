use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use engine_core::{
    connectors::{
        notify::Notifier,
        source::{ExportRequest, ExportState, ExportTask, ImageSource},
    },
    error::{SourceError, StateStoreError},
    state::{
        WatermarkStore,
        models::{JournalEntry, StoredRecord, WatermarkCommit},
        sled_store::SledWatermarkStore,
    },
};
use model::{
    core::{image::ImageRef, window::TimeRange, zone::ZoneOfInterest},
    records::record::ProcessedRecord,
};
use std::{
    path::{Path, PathBuf},
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

/// In-process imagery provider. Each image carries the scripted outcome of
/// its reduction.
#[derive(Default)]
pub struct FakeImageSource {
    images: Mutex<Vec<(ImageRef, Result<Option<f64>, SourceError>)>>,
    /// Return listings newest first to exercise explicit sorting.
    pub reverse_listing: AtomicBool,
    pub fail_listing: AtomicBool,
    pub timestamp_queries: Mutex<Vec<TimeRange>>,
    pub image_queries: Mutex<Vec<TimeRange>>,
    pub reduced: Mutex<Vec<String>>,
    pub exports: Mutex<Vec<ExportRequest>>,
}

impl FakeImageSource {
    pub fn add(&self, image: ImageRef, mean: Option<f64>) {
        self.images.lock().unwrap().push((image, Ok(mean)));
    }

    pub fn add_failing(&self, image: ImageRef, error: SourceError) {
        self.images.lock().unwrap().push((image, Err(error)));
    }

    /// Replace the scripted outcome for an already added image.
    pub fn set_mean(&self, id: &str, mean: Option<f64>) {
        for (image, outcome) in self.images.lock().unwrap().iter_mut() {
            if image.id == id {
                *outcome = Ok(mean);
            }
        }
    }

    fn listed(&self, range: &TimeRange) -> Vec<ImageRef> {
        let mut images: Vec<ImageRef> = self
            .images
            .lock()
            .unwrap()
            .iter()
            .filter(|(image, _)| range.contains(&image.acquired_at))
            .map(|(image, _)| image.clone())
            .collect();
        if self.reverse_listing.load(Ordering::SeqCst) {
            images.reverse();
        }
        images
    }

    fn listing_error(&self) -> Option<SourceError> {
        self.fail_listing
            .load(Ordering::SeqCst)
            .then(|| SourceError::Transport("listing connection reset".into()))
    }

    pub fn reduced(&self) -> Vec<String> {
        self.reduced.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageSource for FakeImageSource {
    async fn list_timestamps(&self, range: &TimeRange) -> Result<Vec<DateTime<Utc>>, SourceError> {
        self.timestamp_queries.lock().unwrap().push(*range);
        if let Some(err) = self.listing_error() {
            return Err(err);
        }
        Ok(self.listed(range).into_iter().map(|i| i.acquired_at).collect())
    }

    async fn list_images(&self, range: &TimeRange) -> Result<Vec<ImageRef>, SourceError> {
        self.image_queries.lock().unwrap().push(*range);
        if let Some(err) = self.listing_error() {
            return Err(err);
        }
        Ok(self.listed(range))
    }

    async fn reduce_mean(
        &self,
        image: &ImageRef,
        _zone: &ZoneOfInterest,
        _scale: f64,
    ) -> Result<Option<f64>, SourceError> {
        self.reduced.lock().unwrap().push(image.id.clone());
        self.images
            .lock()
            .unwrap()
            .iter()
            .find(|(candidate, _)| candidate.id == image.id)
            .map(|(_, outcome)| outcome.clone())
            .unwrap_or_else(|| Err(SourceError::InvalidRequest(format!("unknown image {}", image.id))))
    }

    async fn export_image(
        &self,
        _image: &ImageRef,
        _zone: &ZoneOfInterest,
        request: &ExportRequest,
    ) -> Result<ExportTask, SourceError> {
        self.exports.lock().unwrap().push(request.clone());
        Ok(ExportTask {
            id: format!("operations/{}", request.description),
            description: request.description.clone(),
        })
    }

    async fn export_status(&self, _task: &ExportTask) -> Result<ExportState, SourceError> {
        Ok(ExportState::Completed)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub webhooks: Mutex<Vec<(String, Vec<ProcessedRecord>)>>,
    pub emails: Mutex<Vec<(String, Option<PathBuf>)>>,
}

impl RecordingNotifier {
    pub fn webhooks(&self) -> Vec<(String, Vec<ProcessedRecord>)> {
        self.webhooks.lock().unwrap().clone()
    }

    pub fn emails(&self) -> Vec<(String, Option<PathBuf>)> {
        self.emails.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_webhook(&self, batch_id: &str, records: &[ProcessedRecord]) {
        self.webhooks
            .lock()
            .unwrap()
            .push((batch_id.to_string(), records.to_vec()));
    }

    async fn notify_email(&self, batch_id: &str, artifact: Option<&Path>) {
        self.emails
            .lock()
            .unwrap()
            .push((batch_id.to_string(), artifact.map(Path::to_path_buf)));
    }
}

/// Sled store that can be told to fail its next commits.
pub struct FlakyStore {
    inner: SledWatermarkStore,
    failing_commits: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: SledWatermarkStore) -> Self {
        Self {
            inner,
            failing_commits: AtomicUsize::new(0),
        }
    }

    pub fn fail_next_commits(&self, count: usize) {
        self.failing_commits.store(count, Ordering::SeqCst);
    }

    /// Seed the watermark without any records.
    pub async fn seed_watermark(&self, date: NaiveDate) {
        self.inner
            .commit_processed(&WatermarkCommit {
                records: Vec::new(),
                watermark: Some(date),
            })
            .await
            .unwrap();
    }
}

#[async_trait]
impl WatermarkStore for FlakyStore {
    async fn last_processed(&self) -> Result<Option<NaiveDate>, StateStoreError> {
        self.inner.last_processed().await
    }

    async fn commit_processed(
        &self,
        commit: &WatermarkCommit,
    ) -> Result<Option<NaiveDate>, StateStoreError> {
        let failing = self
            .failing_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(StateStoreError::Backend("simulated write failure".into()));
        }
        self.inner.commit_processed(commit).await
    }

    async fn load_record(&self, date: NaiveDate) -> Result<Option<StoredRecord>, StateStoreError> {
        self.inner.load_record(date).await
    }

    async fn history(&self, limit: usize) -> Result<Vec<StoredRecord>, StateStoreError> {
        self.inner.history(limit).await
    }

    async fn append_journal(&self, entry: &JournalEntry) -> Result<(), StateStoreError> {
        self.inner.append_journal(entry).await
    }

    async fn recent_journal(&self, limit: usize) -> Result<Vec<JournalEntry>, StateStoreError> {
        self.inner.recent_journal(limit).await
    }
}
