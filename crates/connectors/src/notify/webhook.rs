use super::error::NotifyError;
use crate::error::ConnectorError;
use model::records::record::ProcessedRecord;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use url::Url;

pub const STATUS_NEW_DATA: &str = "new_data_available";

/// Body POSTed for every committed batch. `date` always carries the full
/// batch of records.
#[derive(Debug, Serialize)]
pub struct WebhookPayload<'a> {
    pub status: &'static str,
    pub batch_id: &'a str,
    pub date: &'a [ProcessedRecord],
}

impl<'a> WebhookPayload<'a> {
    pub fn new(batch_id: &'a str, records: &'a [ProcessedRecord]) -> Self {
        Self {
            status: STATUS_NEW_DATA,
            batch_id,
            date: records,
        }
    }
}

pub struct WebhookNotifier {
    client: Client,
    url: Url,
}

impl WebhookNotifier {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, ConnectorError> {
        let url = Url::parse(url).map_err(|e| ConnectorError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub async fn send(&self, batch_id: &str, records: &[ProcessedRecord]) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&WebhookPayload::new(batch_id, records))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
