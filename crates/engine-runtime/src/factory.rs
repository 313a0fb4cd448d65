use crate::{driver::IncrementalDriver, error::RunError};
use connectors::{
    file::csv::writer::CsvArtifactWriter,
    imagery::earth_engine::{EarthEngineConfig, EarthEngineSource},
    notify::{
        ChannelNotifier,
        email::{EmailConfig, EmailNotifier},
        webhook::WebhookNotifier,
    },
    sql::postgres::{PostgresConfig, PostgresWatermarkStore},
};
use engine_config::settings::{Settings, StoreSettings};
use engine_core::{
    connectors::{artifact::ArtifactWriter, notify::Notifier, source::ImageSource},
    poll::PollPolicy,
    state::{WatermarkStore, sled_store::SledWatermarkStore},
};
use engine_processing::{
    commit::CommitPhase,
    extract::{ExportOptions, ExtractionStep},
};
use model::{classify::ClassificationProfile, core::zone::ZoneOfInterest};
use std::sync::Arc;
use tracing::info;

pub async fn create_store(settings: &Settings) -> Result<Arc<dyn WatermarkStore>, RunError> {
    open_store(&settings.store).await
}

pub async fn open_store(store: &StoreSettings) -> Result<Arc<dyn WatermarkStore>, RunError> {
    match store {
        StoreSettings::Sled { path } => {
            let store = SledWatermarkStore::open(path)
                .map_err(|e| RunError::StoreOpen(format!("{}: {e}", path.display())))?;
            info!("Using sled state store at {}", path.display());
            Ok(Arc::new(store))
        }
        StoreSettings::Postgres(pg) => {
            let config = PostgresConfig {
                host: pg.host.clone(),
                port: pg.port,
                database: pg.database.clone(),
                user: pg.user.clone(),
                password: pg.password.clone(),
                require_tls: false,
            };
            let store = PostgresWatermarkStore::connect(&config)
                .await
                .map_err(|e| RunError::StoreOpen(format!("{}:{}: {e}", pg.host, pg.port)))?;
            Ok(Arc::new(store))
        }
    }
}

pub fn create_source(
    settings: &Settings,
    zone: &ZoneOfInterest,
) -> Result<Arc<dyn ImageSource>, RunError> {
    let sensor = settings.sensor;
    let source = EarthEngineSource::new(EarthEngineConfig {
        api_url: settings.provider.api_url.clone(),
        project: settings.provider.project.clone(),
        access_token: settings.provider.access_token.clone(),
        collection: sensor.collection_id().to_string(),
        band: sensor.band().to_string(),
        filter: sensor.collection_filter().map(str::to_string),
        region: zone.clone(),
        timeout: settings.provider.timeout,
    })?;
    Ok(Arc::new(source))
}

pub fn create_notifier(settings: &Settings) -> Result<Arc<dyn Notifier>, RunError> {
    let webhook = settings
        .webhook
        .as_ref()
        .map(|webhook| WebhookNotifier::new(&webhook.url, webhook.timeout))
        .transpose()?;

    let email = settings
        .email
        .as_ref()
        .map(|email| {
            EmailNotifier::new(EmailConfig {
                host: email.host.clone(),
                port: email.port,
                username: email.username.clone(),
                password: email.password.clone(),
                from: email.from.clone(),
                to: email.to.clone(),
                sensor_title: settings.sensor.title().to_string(),
            })
        })
        .transpose()?;

    let notifier = ChannelNotifier::new(webhook, email);
    info!(
        webhook = notifier.has_webhook(),
        email = notifier.has_email(),
        "Notification channels configured"
    );
    Ok(Arc::new(notifier))
}

pub fn create_extraction(
    settings: &Settings,
    source: Arc<dyn ImageSource>,
    zone: Arc<ZoneOfInterest>,
) -> ExtractionStep {
    let export = ExportOptions {
        mode: settings.export.mode,
        folder: settings.export.folder.clone(),
        crs: settings.export.crs.clone(),
        max_pixels: settings.export.max_pixels,
        poll: PollPolicy::new(settings.export.poll_interval, settings.export.max_wait),
        ..ExportOptions::default()
    };
    ExtractionStep::new(
        source,
        zone,
        Arc::new(ClassificationProfile::for_sensor(settings.sensor)),
        settings.sensor,
        export,
    )
}

/// Wire a driver from settings around an already opened store.
pub fn create_driver_with_store(
    settings: &Settings,
    store: Arc<dyn WatermarkStore>,
) -> Result<IncrementalDriver, RunError> {
    let zone = Arc::new(settings.load_zone()?);
    let source = create_source(settings, &zone)?;
    let extract = create_extraction(settings, source.clone(), zone);

    let artifacts: Arc<dyn ArtifactWriter> = Arc::new(CsvArtifactWriter::new(
        settings.exports_dir.clone(),
        settings.sensor.value_column(),
    ));
    let commit = CommitPhase::new(
        artifacts,
        create_notifier(settings)?,
        store.clone(),
        settings.watermark_policy,
    );

    Ok(IncrementalDriver::new(
        source,
        store,
        extract,
        commit,
        settings.lookback_days,
    ))
}

pub async fn create_driver(settings: &Settings) -> Result<IncrementalDriver, RunError> {
    let store = create_store(settings).await?;
    create_driver_with_store(settings, store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_config::settings::keys;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn settings(dir: &TempDir, extra: &[(&str, &str)]) -> Settings {
        let state = dir.path().join("state").display().to_string();
        let mut env: HashMap<String, String> = [
            (keys::EE_PROJECT, "soil-project"),
            (keys::EE_ACCESS_TOKEN, "token"),
            (keys::STATE_PATH, state.as_str()),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (k, v) in extra {
            env.insert(k.to_string(), v.to_string());
        }
        Settings::from_env(&env).unwrap()
    }

    #[tokio::test]
    async fn builds_driver_on_sled() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir, &[(keys::WEBHOOK_URL, "http://localhost:9/hook")]);
        let driver = create_driver(&settings).await.unwrap();
        assert_eq!(driver.store().last_processed().await.unwrap(), None);
    }

    #[tokio::test]
    async fn bad_zone_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir, &[(keys::ZOI_PATH, "/nonexistent/zone.geojson")]);
        let err = create_driver(&settings).await.err().unwrap();
        assert!(err.is_fatal());
    }
}
