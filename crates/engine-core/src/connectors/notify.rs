use async_trait::async_trait;
use model::records::record::ProcessedRecord;
use std::path::Path;

/// Best-effort delivery of a committed batch. Implementations log delivery
/// problems and never report them back to the caller.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_webhook(&self, batch_id: &str, records: &[ProcessedRecord]);

    async fn notify_email(&self, batch_id: &str, artifact: Option<&Path>);
}
