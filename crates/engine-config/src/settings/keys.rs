pub const EE_PROJECT: &str = "EE_PROJECT";
pub const EE_ACCESS_TOKEN: &str = "EE_ACCESS_TOKEN";
pub const EE_API_URL: &str = "EE_API_URL";
pub const EE_TIMEOUT_SECS: &str = "EE_TIMEOUT_SECS";
pub const SENSOR: &str = "SENSOR";
pub const LOOKBACK_DAYS: &str = "LOOKBACK_DAYS";
pub const RUN_INTERVAL_SECS: &str = "RUN_INTERVAL_SECS";
pub const GDRIVE_FOLDER: &str = "GDRIVE_FOLDER";
pub const EXPORT_ENABLED: &str = "EXPORT_ENABLED";
pub const EXPORT_MODE: &str = "EXPORT_MODE";
pub const EXPORT_POLL_INTERVAL_SECS: &str = "EXPORT_POLL_INTERVAL_SECS";
pub const EXPORT_MAX_WAIT_SECS: &str = "EXPORT_MAX_WAIT_SECS";
pub const EXPORT_CRS: &str = "EXPORT_CRS";
pub const EXPORT_MAX_PIXELS: &str = "EXPORT_MAX_PIXELS";
pub const ZOI_PATH: &str = "ZOI_PATH";
pub const EXPORTS_DIR: &str = "EXPORTS_DIR";
pub const WATERMARK_POLICY: &str = "WATERMARK_POLICY";
pub const STATE_BACKEND: &str = "STATE_BACKEND";
pub const STATE_PATH: &str = "STATE_PATH";
pub const DB_HOST: &str = "DB_HOST";
pub const DB_PORT: &str = "DB_PORT";
pub const DB_NAME: &str = "DB_NAME";
pub const DB_USER: &str = "DB_USER";
pub const DB_PASS: &str = "DB_PASS";
pub const WEBHOOK_URL: &str = "WEBHOOK_URL";
pub const WEBHOOK_TIMEOUT_SECS: &str = "WEBHOOK_TIMEOUT_SECS";
pub const SMTP_HOST: &str = "SMTP_HOST";
pub const SMTP_PORT: &str = "SMTP_PORT";
pub const SMTP_USER: &str = "SMTP_USER";
pub const SMTP_PASS: &str = "SMTP_PASS";
pub const EMAIL_FROM: &str = "EMAIL_FROM";
pub const EMAIL_TO: &str = "EMAIL_TO";

/// Keys whose values never appear in logs.
pub const SECRETS: &[&str] = &[EE_ACCESS_TOKEN, DB_PASS, SMTP_PASS];
