//! Typed pipeline settings built from an environment map.
//!
//! Optional channels (webhook, email) are disabled when their keys are unset.
//! Required provider credentials and malformed values fail the whole load.

pub mod error;
pub mod keys;
pub mod validator;

use engine_processing::{extract::ExportMode, watermark::WatermarkPolicy};
use error::SettingsError;
use model::core::{sensor::SensorKind, zone::ZoneOfInterest};
use serde::Serialize;
use std::{
    collections::HashMap,
    fmt,
    path::PathBuf,
    str::FromStr,
    time::Duration,
};
use tracing::info;
use validator::EnvReader;

pub const DEFAULT_API_URL: &str = "https://earthengine.googleapis.com";
pub const DEFAULT_RUN_INTERVAL_SECS: u64 = 86_400;
pub const DEFAULT_FOLDER: &str = "GEE_Soil_Moisture";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_MAX_PIXELS: f64 = 1e13;
pub const DEFAULT_EXPORTS_DIR: &str = "exports";
pub const DEFAULT_DB_PORT: u16 = 5432;
pub const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 300;
pub const MAX_LOOKBACK_DAYS: u32 = 3650;
pub const DEFAULT_SMTP_PORT: u16 = 587;

#[derive(Clone, Serialize)]
pub struct ProviderSettings {
    pub api_url: String,
    pub project: String,
    #[serde(skip)]
    pub access_token: String,
    /// Bound on every single provider request.
    pub timeout: Duration,
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_url", &self.api_url)
            .field("project", &self.project)
            .field("access_token", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportSettings {
    pub mode: ExportMode,
    pub folder: String,
    pub poll_interval: Duration,
    pub max_wait: Option<Duration>,
    pub crs: Option<String>,
    pub max_pixels: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Sled,
    Postgres,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sled" => Ok(StoreBackend::Sled),
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            other => Err(format!("Unknown state backend: {other}")),
        }
    }
}

#[derive(Clone, Serialize)]
pub struct PostgresSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    #[serde(skip)]
    pub password: Option<String>,
}

impl fmt::Debug for PostgresSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreSettings {
    Sled { path: PathBuf },
    Postgres(PostgresSettings),
}

impl StoreSettings {
    pub fn backend(&self) -> StoreBackend {
        match self {
            StoreSettings::Sled { .. } => StoreBackend::Sled,
            StoreSettings::Postgres(_) => StoreBackend::Postgres,
        }
    }

    /// Only the state store section, for commands that never reach the provider.
    pub fn from_env(env: &HashMap<String, String>) -> Result<Self, SettingsError> {
        let mut reader = EnvReader::new(env);
        let store = Settings::store_settings(&mut reader);
        reader.finish()?;
        store.ok_or_else(|| {
            SettingsError::ValidationFailed(vec!["state store settings are incomplete".to_string()])
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookSettings {
    pub url: String,
    pub timeout: Duration,
}

#[derive(Clone, Serialize)]
pub struct EmailSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    #[serde(skip)]
    pub password: Option<String>,
    pub from: String,
    pub to: Vec<String>,
}

impl fmt::Debug for EmailSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("from", &self.from)
            .field("to", &self.to)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    pub provider: ProviderSettings,
    pub sensor: SensorKind,
    pub lookback_days: u32,
    pub run_interval: Duration,
    pub export: ExportSettings,
    pub zone_path: Option<PathBuf>,
    pub exports_dir: PathBuf,
    pub watermark_policy: WatermarkPolicy,
    pub store: StoreSettings,
    pub webhook: Option<WebhookSettings>,
    pub email: Option<EmailSettings>,
}

fn default_state_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".soilwatch")
        .join("state")
}

impl Settings {
    pub fn from_env(env: &HashMap<String, String>) -> Result<Self, SettingsError> {
        let mut reader = EnvReader::new(env);

        let project = reader.required(keys::EE_PROJECT);
        let access_token = reader.required(keys::EE_ACCESS_TOKEN);
        let api_url = reader
            .url(keys::EE_API_URL)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let provider_timeout = Duration::from_secs(
            reader.positive(keys::EE_TIMEOUT_SECS, DEFAULT_PROVIDER_TIMEOUT_SECS),
        );

        let sensor: SensorKind = reader.parse_or(keys::SENSOR, SensorKind::Smap);
        let lookback_days = reader.parse_or(keys::LOOKBACK_DAYS, sensor.default_lookback_days());
        if lookback_days == 0 {
            reader.invalid(keys::LOOKBACK_DAYS, "0", "must be at least one day");
        } else if lookback_days > MAX_LOOKBACK_DAYS {
            reader.invalid(
                keys::LOOKBACK_DAYS,
                &lookback_days.to_string(),
                format!("must be at most {MAX_LOOKBACK_DAYS} days"),
            );
        }
        let run_interval =
            Duration::from_secs(reader.positive(keys::RUN_INTERVAL_SECS, DEFAULT_RUN_INTERVAL_SECS));

        let export = Self::export_settings(&mut reader);
        let zone_path = reader.optional(keys::ZOI_PATH).map(PathBuf::from);
        let exports_dir = reader
            .optional(keys::EXPORTS_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORTS_DIR));
        let watermark_policy = reader.parse_or(keys::WATERMARK_POLICY, WatermarkPolicy::default());

        let store = Self::store_settings(&mut reader);
        let webhook = Self::webhook_settings(&mut reader);
        let email = Self::email_settings(&mut reader);

        reader.finish()?;

        let (Some(project), Some(access_token), Some(store)) = (project, access_token, store) else {
            // `finish` already reported the missing keys.
            return Err(SettingsError::ValidationFailed(vec![
                "required settings are missing".to_string(),
            ]));
        };

        let settings = Settings {
            provider: ProviderSettings {
                api_url,
                project,
                access_token,
                timeout: provider_timeout,
            },
            sensor,
            lookback_days,
            run_interval,
            export,
            zone_path,
            exports_dir,
            watermark_policy,
            store,
            webhook,
            email,
        };
        settings.log_summary();
        Ok(settings)
    }

    fn export_settings(reader: &mut EnvReader<'_>) -> ExportSettings {
        let enabled = reader.flag(keys::EXPORT_ENABLED, true);
        let mode = reader.parse_or(keys::EXPORT_MODE, ExportMode::Trigger);
        let max_pixels: f64 = reader.parse_or(keys::EXPORT_MAX_PIXELS, DEFAULT_MAX_PIXELS);
        if !max_pixels.is_finite() || max_pixels < 1.0 {
            reader.invalid(keys::EXPORT_MAX_PIXELS, &max_pixels.to_string(), "must be a positive number");
        }

        ExportSettings {
            mode: if enabled { mode } else { ExportMode::Disabled },
            folder: reader
                .optional(keys::GDRIVE_FOLDER)
                .unwrap_or_else(|| DEFAULT_FOLDER.to_string()),
            poll_interval: Duration::from_secs(
                reader.positive(keys::EXPORT_POLL_INTERVAL_SECS, DEFAULT_POLL_INTERVAL_SECS),
            ),
            max_wait: reader
                .parse_optional::<u64>(keys::EXPORT_MAX_WAIT_SECS)
                .map(Duration::from_secs),
            crs: reader.optional(keys::EXPORT_CRS),
            max_pixels,
        }
    }

    fn store_settings(reader: &mut EnvReader<'_>) -> Option<StoreSettings> {
        match reader.parse_or(keys::STATE_BACKEND, StoreBackend::Sled) {
            StoreBackend::Sled => Some(StoreSettings::Sled {
                path: reader
                    .optional(keys::STATE_PATH)
                    .map(PathBuf::from)
                    .unwrap_or_else(default_state_path),
            }),
            StoreBackend::Postgres => {
                let host = reader.required(keys::DB_HOST);
                let database = reader.required(keys::DB_NAME);
                let user = reader.required(keys::DB_USER);
                let port = reader.parse_or(keys::DB_PORT, DEFAULT_DB_PORT);
                let password = reader.optional(keys::DB_PASS);
                Some(StoreSettings::Postgres(PostgresSettings {
                    host: host?,
                    port,
                    database: database?,
                    user: user?,
                    password,
                }))
            }
        }
    }

    fn webhook_settings(reader: &mut EnvReader<'_>) -> Option<WebhookSettings> {
        let timeout = reader.positive(keys::WEBHOOK_TIMEOUT_SECS, DEFAULT_WEBHOOK_TIMEOUT_SECS);
        reader.url(keys::WEBHOOK_URL).map(|url| WebhookSettings {
            url,
            timeout: Duration::from_secs(timeout),
        })
    }

    fn email_settings(reader: &mut EnvReader<'_>) -> Option<EmailSettings> {
        let port = reader.parse_or(keys::SMTP_PORT, DEFAULT_SMTP_PORT);
        let host = reader.optional(keys::SMTP_HOST);
        let from = reader.mailboxes(keys::EMAIL_FROM);
        let to = reader.mailboxes(keys::EMAIL_TO);

        let (host, from, to) = (host?, from?, to?);
        let from = match <[String; 1]>::try_from(from) {
            Ok([from]) => from,
            Err(many) => {
                reader.invalid(keys::EMAIL_FROM, &many.join(","), "expected a single sender");
                return None;
            }
        };

        Some(EmailSettings {
            host,
            port,
            username: reader.optional(keys::SMTP_USER),
            password: reader.optional(keys::SMTP_PASS),
            from,
            to,
        })
    }

    /// The configured zone file, or the built-in Moulouya polygon.
    pub fn load_zone(&self) -> Result<ZoneOfInterest, SettingsError> {
        let Some(path) = &self.zone_path else {
            return Ok(ZoneOfInterest::moulouya());
        };
        let zone_error = |reason: String| SettingsError::Zone {
            path: path.display().to_string(),
            reason,
        };

        let raw = std::fs::read_to_string(path).map_err(|e| zone_error(e.to_string()))?;
        let geojson: serde_json::Value =
            serde_json::from_str(&raw).map_err(|e| zone_error(e.to_string()))?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "zone".to_string());
        ZoneOfInterest::from_geojson(name, &geojson).map_err(|e| zone_error(e.to_string()))
    }

    fn log_summary(&self) {
        info!(
            sensor = %self.sensor,
            lookback_days = self.lookback_days,
            export_mode = %self.export.mode,
            policy = %self.watermark_policy,
            backend = ?self.store.backend(),
            webhook = self.webhook.is_some(),
            email = self.email.is_some(),
            "Settings loaded"
        );
    }
}
