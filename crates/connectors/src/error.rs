use thiserror::Error;

/// Errors raised while constructing a connector from configuration.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("TLS configuration error: {0}")]
    TlsConfig(#[from] native_tls::Error),
}
