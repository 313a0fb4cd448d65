use super::utils::connect_client;
use crate::error::ConnectorError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use engine_core::{
    error::StateStoreError,
    state::{
        JOURNAL_RETENTION, WatermarkStore,
        models::{JournalEntry, StoredRecord, WatermarkCommit},
    },
};
use model::records::record::ProcessedRecord;
use tokio::sync::RwLock;
use tokio_postgres::{Client, Config, Row, config::SslMode, types::Json};
use tracing::{debug, info};

const SCHEMA_SQL: &str = include_str!("sql/schema.sql");
const RECORD_UPSERT_SQL: &str = include_str!("sql/record_upsert.sql");
const WATERMARK_ADVANCE_SQL: &str = include_str!("sql/watermark_advance.sql");
const JOURNAL_RECENT_SQL: &str = include_str!("sql/journal_recent.sql");
const JOURNAL_TRIM_SQL: &str = include_str!("sql/journal_trim.sql");

const WATERMARK_SELECT_SQL: &str = "SELECT last_date FROM soil_watermark WHERE id = 1";
const RECORD_SELECT_SQL: &str =
    "SELECT date, vv_db, description, created_at, updated_at FROM vv_data WHERE date = $1";
const HISTORY_SELECT_SQL: &str = "SELECT date, vv_db, description, created_at, updated_at \
     FROM vv_data ORDER BY date DESC LIMIT $1";
const JOURNAL_INSERT_SQL: &str = "INSERT INTO run_journal (run_id, entry) VALUES ($1, $2)";

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: Option<String>,
    pub require_tls: bool,
}

impl PostgresConfig {
    fn to_pg_config(&self) -> Config {
        let mut config = Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .dbname(&self.database)
            .user(&self.user)
            .application_name("soilwatch")
            .ssl_mode(if self.require_tls {
                SslMode::Require
            } else {
                SslMode::Prefer
            });
        if let Some(password) = &self.password {
            config.password(password);
        }
        config
    }
}

fn backend(err: tokio_postgres::Error) -> StateStoreError {
    StateStoreError::Backend(err.to_string())
}

fn stored_record(row: &Row) -> Result<StoredRecord, StateStoreError> {
    let date: NaiveDate = row.try_get("date").map_err(backend)?;
    let value: Option<f64> = row.try_get("vv_db").map_err(backend)?;
    // Legacy rows may have no description.
    let label: Option<String> = row.try_get("description").map_err(backend)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(backend)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(backend)?;

    Ok(StoredRecord {
        record: ProcessedRecord {
            date,
            value,
            label: label.unwrap_or_default(),
        },
        created_at,
        updated_at,
    })
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Watermark store on a Postgres database.
///
/// Records live in `vv_data` and the watermark is the single row of
/// `soil_watermark`. The run journal in `run_journal` is trimmed to
/// [`JOURNAL_RETENTION`] entries whenever a run finishes.
pub struct PostgresWatermarkStore {
    client: RwLock<Client>,
}

impl PostgresWatermarkStore {
    pub async fn connect(config: &PostgresConfig) -> Result<Self, ConnectorError> {
        let client = connect_client(config.to_pg_config()).await?;
        client.batch_execute(SCHEMA_SQL).await?;
        info!(
            host = %config.host,
            database = %config.database,
            "Connected to Postgres state store"
        );
        Ok(Self {
            client: RwLock::new(client),
        })
    }
}

#[async_trait]
impl WatermarkStore for PostgresWatermarkStore {
    async fn last_processed(&self) -> Result<Option<NaiveDate>, StateStoreError> {
        let client = self.client.read().await;
        let row = client
            .query_opt(WATERMARK_SELECT_SQL, &[])
            .await
            .map_err(backend)?;
        row.map(|row| row.try_get::<_, NaiveDate>("last_date"))
            .transpose()
            .map_err(backend)
    }

    async fn commit_processed(
        &self,
        commit: &WatermarkCommit,
    ) -> Result<Option<NaiveDate>, StateStoreError> {
        let mut client = self.client.write().await;
        let tx = client.transaction().await.map_err(backend)?;

        let upsert = tx.prepare(RECORD_UPSERT_SQL).await.map_err(backend)?;
        for record in &commit.records {
            tx.execute(&upsert, &[&record.date, &record.value, &record.label])
                .await
                .map_err(backend)?;
        }

        if let Some(watermark) = commit.watermark {
            tx.execute(WATERMARK_ADVANCE_SQL, &[&watermark])
                .await
                .map_err(backend)?;
        }

        let effective = tx
            .query_opt(WATERMARK_SELECT_SQL, &[])
            .await
            .map_err(backend)?
            .map(|row| row.try_get::<_, NaiveDate>("last_date"))
            .transpose()
            .map_err(backend)?;

        tx.commit().await.map_err(backend)?;
        debug!(
            records = commit.records.len(),
            watermark = ?effective,
            "Committed batch to Postgres"
        );
        Ok(effective)
    }

    async fn load_record(&self, date: NaiveDate) -> Result<Option<StoredRecord>, StateStoreError> {
        let client = self.client.read().await;
        let row = client
            .query_opt(RECORD_SELECT_SQL, &[&date])
            .await
            .map_err(backend)?;
        row.as_ref().map(stored_record).transpose()
    }

    async fn history(&self, limit: usize) -> Result<Vec<StoredRecord>, StateStoreError> {
        let client = self.client.read().await;
        let rows = client
            .query(HISTORY_SELECT_SQL, &[&sql_limit(limit)])
            .await
            .map_err(backend)?;
        rows.iter().map(stored_record).collect()
    }

    async fn append_journal(&self, entry: &JournalEntry) -> Result<(), StateStoreError> {
        let client = self.client.read().await;
        client
            .execute(JOURNAL_INSERT_SQL, &[&entry.run_id(), &Json(entry)])
            .await
            .map_err(backend)?;
        if matches!(entry, JournalEntry::RunFinished { .. }) {
            let dropped = client
                .execute(JOURNAL_TRIM_SQL, &[&sql_limit(JOURNAL_RETENTION)])
                .await
                .map_err(backend)?;
            if dropped > 0 {
                debug!(dropped, "Trimmed run journal");
            }
        }
        Ok(())
    }

    async fn recent_journal(&self, limit: usize) -> Result<Vec<JournalEntry>, StateStoreError> {
        let client = self.client.read().await;
        let rows = client
            .query(JOURNAL_RECENT_SQL, &[&sql_limit(limit)])
            .await
            .map_err(backend)?;
        rows.iter()
            .map(|row| {
                row.try_get::<_, Json<JournalEntry>>("entry")
                    .map(|Json(entry)| entry)
                    .map_err(|e| StateStoreError::Codec(e.to_string()))
            })
            .collect()
    }
}
