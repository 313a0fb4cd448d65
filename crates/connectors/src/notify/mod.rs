pub mod email;
pub mod error;
pub mod webhook;

use async_trait::async_trait;
use email::EmailNotifier;
use engine_core::connectors::notify::Notifier;
use model::records::record::ProcessedRecord;
use std::path::Path;
use tracing::{info, warn};
use webhook::WebhookNotifier;

/// Fans a committed batch out to whichever channels are configured.
///
/// Channels are independent: a failing webhook never prevents the email and
/// neither failure reaches the caller.
#[derive(Default)]
pub struct ChannelNotifier {
    webhook: Option<WebhookNotifier>,
    email: Option<EmailNotifier>,
}

impl ChannelNotifier {
    pub fn new(webhook: Option<WebhookNotifier>, email: Option<EmailNotifier>) -> Self {
        Self { webhook, email }
    }

    pub fn has_webhook(&self) -> bool {
        self.webhook.is_some()
    }

    pub fn has_email(&self) -> bool {
        self.email.is_some()
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify_webhook(&self, batch_id: &str, records: &[ProcessedRecord]) {
        let Some(webhook) = &self.webhook else {
            info!("Webhook URL not configured, skipping notification");
            return;
        };

        match webhook.send(batch_id, records).await {
            Ok(()) => info!(batch_id, records = records.len(), "Webhook notified"),
            Err(e) => warn!(batch_id, "Webhook notification failed: {e}"),
        }
    }

    async fn notify_email(&self, batch_id: &str, artifact: Option<&Path>) {
        let Some(email) = &self.email else {
            info!("Email not configured, skipping notification");
            return;
        };

        match email.send(batch_id, artifact).await {
            Ok(()) => info!(batch_id, "Email sent"),
            Err(e) => warn!(batch_id, "Email notification failed: {e}"),
        }
    }
}
