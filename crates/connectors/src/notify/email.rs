use super::error::NotifyError;
use chrono::{DateTime, Utc};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Attachment, Mailbox, MultiPart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use std::path::Path;
use std::time::Duration;

const SMTP_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub to: Vec<String>,
    /// Sensor title used in the subject line, e.g. `Sentinel-1`.
    pub sensor_title: String,
}

pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
    sensor_title: String,
}

fn mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address.trim().parse().map_err(|e: lettre::address::AddressError| NotifyError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Result<Self, NotifyError> {
        let from = mailbox(&config.from)?;
        let to = config
            .to
            .iter()
            .map(|address| mailbox(address))
            .collect::<Result<Vec<_>, _>>()?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .timeout(Some(SMTP_TIMEOUT));
        if let (Some(user), Some(pass)) = (config.username, config.password) {
            builder = builder.credentials(Credentials::new(user, pass));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            to,
            sensor_title: config.sensor_title,
        })
    }

    pub fn subject(&self, processed_at: DateTime<Utc>, batch_id: &str) -> String {
        format!(
            "{} {} Soil Moisture Data - {}",
            processed_at.format("%Y-%m-%d %H:%M:%S"),
            self.sensor_title,
            batch_id
        )
    }

    /// Build the message. `attachment` is `(file name, CSV bytes)`.
    pub fn compose(
        &self,
        processed_at: DateTime<Utc>,
        batch_id: &str,
        attachment: Option<(String, Vec<u8>)>,
    ) -> Result<Message, NotifyError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(self.subject(processed_at, batch_id));
        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }

        let note = if attachment.is_some() {
            "The processed data is attached as a CSV file."
        } else {
            "No CSV file could be attached for this batch."
        };
        let plain = format!(
            "New {} soil moisture data is available for {batch_id}.\n{note}\n",
            self.sensor_title
        );
        let html = format!(
            "<html><body><p>New <strong>{}</strong> soil moisture data is available for \
             <code>{batch_id}</code>.</p><p>{note}</p></body></html>",
            self.sensor_title
        );
        let body = MultiPart::alternative_plain_html(plain, html);

        let message = match attachment {
            Some((name, bytes)) => {
                let csv = ContentType::parse("text/csv")
                    .map_err(|e| NotifyError::ContentType(e.to_string()))?;
                builder.multipart(
                    MultiPart::mixed()
                        .multipart(body)
                        .singlepart(Attachment::new(name).body(bytes, csv)),
                )?
            }
            None => builder.multipart(body)?,
        };
        Ok(message)
    }

    pub async fn send(&self, batch_id: &str, artifact: Option<&Path>) -> Result<(), NotifyError> {
        let attachment = match artifact {
            Some(path) => {
                let bytes = tokio::fs::read(path).await.map_err(|source| NotifyError::Attachment {
                    path: path.display().to_string(),
                    source,
                })?;
                let name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| format!("{batch_id}.csv"));
                Some((name, bytes))
            }
            None => None,
        };

        let message = self.compose(Utc::now(), batch_id, attachment)?;
        self.transport.send(message).await?;
        Ok(())
    }
}
