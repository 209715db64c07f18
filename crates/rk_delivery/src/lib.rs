//! Sends the rendered document to the e-reader address over SMTP.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials as SmtpCredentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use rk_core::config::DEFAULT_TIMEOUT_SECS;
use rk_core::{Credentials, DeliveryError, DocumentSender, RenderedDocument, SmtpSecurity, SmtpSettings};
use tracing::info;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(DEFAULT_TIMEOUT_SECS);

/// One SMTP session per [`Mailer::send_attachment`] call. Credentials live only
/// as long as the mailer.
#[derive(Debug, Clone)]
pub struct Mailer {
    host: String,
    port: u16,
    security: SmtpSecurity,
    credentials: Credentials,
    from: String,
    timeout: Duration,
}

impl Mailer {
    pub fn new(settings: &SmtpSettings, credentials: Credentials) -> Self {
        let from = settings
            .from
            .clone()
            .unwrap_or_else(|| credentials.username.clone());

        Self {
            host: settings.host.clone(),
            port: settings.port,
            security: settings.security,
            credentials,
            from,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn mailbox(address: &str) -> Result<Mailbox, DeliveryError> {
        address.parse().map_err(|e: lettre::address::AddressError| DeliveryError::Address {
            address: address.to_string(),
            reason: e.to_string(),
        })
    }

    /// A plain-text body plus the document as an attachment.
    pub async fn build_message(
        &self,
        document: &RenderedDocument,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<Message, DeliveryError> {
        let from = Self::mailbox(&self.from)?;
        let to = Self::mailbox(recipient)?;

        let bytes = tokio::fs::read(&document.path)
            .await
            .map_err(|source| DeliveryError::Attachment {
                path: document.path.clone(),
                source,
            })?;

        let content_type = ContentType::parse(document.format.mime_type())
            .map_err(|e| DeliveryError::Message(e.to_string()))?;
        let attachment = Attachment::new(document.file_name()).body(bytes, content_type);

        Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(body.to_string()))
                    .singlepart(attachment),
            )
            .map_err(|e| DeliveryError::Message(e.to_string()))
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, DeliveryError> {
        let builder = match self.security {
            SmtpSecurity::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host),
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&self.host),
        }
        .map_err(|e| self.transport_error(e))?;

        Ok(builder
            .port(self.port)
            .credentials(SmtpCredentials::new(
                self.credentials.username.clone(),
                self.credentials.password.clone(),
            ))
            .timeout(Some(self.timeout))
            .build())
    }

    fn transport_error(&self, e: impl std::fmt::Display) -> DeliveryError {
        DeliveryError::Transport {
            host: self.host.clone(),
            port: self.port,
            reason: e.to_string(),
        }
    }

    pub async fn send_attachment(
        &self,
        document: &RenderedDocument,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), DeliveryError> {
        let email = self.build_message(document, recipient, subject, body).await?;
        let mailer = self.transport()?;

        mailer.send(email).await.map_err(|e| self.transport_error(e))?;

        info!(
            to = %recipient,
            subject = subject,
            "📬 Sent {} via {}:{}",
            document.file_name(),
            self.host,
            self.port
        );
        Ok(())
    }
}

#[async_trait]
impl DocumentSender for Mailer {
    async fn send_document(
        &self,
        document: &RenderedDocument,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), DeliveryError> {
        self.send_attachment(document, recipient, subject, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rk_core::DocumentFormat;
    use std::path::PathBuf;

    fn settings(host: &str, port: u16) -> SmtpSettings {
        SmtpSettings {
            host: host.to_string(),
            port,
            security: SmtpSecurity::StartTls,
            credentials: None,
            from: None,
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            username: "sender@example.com".to_string(),
            password: "app-password".to_string(),
        }
    }

    fn document(path: PathBuf, format: DocumentFormat) -> RenderedDocument {
        RenderedDocument {
            path,
            format,
            sections: 1,
        }
    }

    #[test]
    fn test_timeout_defaults_to_shared_setting() {
        let mailer = Mailer::new(&settings("smtp.example.com", 587), credentials());
        assert_eq!(mailer.timeout, Duration::from_secs(rk_core::HttpSettings::default().timeout_secs));

        let mailer = mailer.with_timeout(Duration::from_secs(5));
        assert_eq!(mailer.timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_build_message_attaches_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("digest_20240309.epub");
        std::fs::write(&path, b"PK fake epub").unwrap();

        let mailer = Mailer::new(&settings("smtp.example.com", 587), credentials());
        let message = mailer
            .build_message(
                &document(path, DocumentFormat::Epub),
                "me@kindle.com",
                "Daily Digest - 2024-03-09",
                "Attached is your RSS feed content.",
            )
            .await
            .unwrap();

        let raw = String::from_utf8_lossy(&message.formatted()).into_owned();
        assert!(raw.contains("From: sender@example.com"));
        assert!(raw.contains("To: me@kindle.com"));
        assert!(raw.contains("Subject: Daily Digest - 2024-03-09"));
        assert!(raw.contains("application/epub+zip"));
        assert!(raw.contains("digest_20240309.epub"));
        assert!(raw.contains("Attached is your RSS feed content."));
    }

    #[tokio::test]
    async fn test_build_message_uses_explicit_sender() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("digest.pdf");
        std::fs::write(&path, b"%PDF-1.3").unwrap();

        let mut smtp = settings("smtp.example.com", 587);
        smtp.from = Some("digest@example.com".to_string());
        let mailer = Mailer::new(&smtp, credentials());
        let message = mailer
            .build_message(&document(path, DocumentFormat::Pdf), "me@kindle.com", "s", "b")
            .await
            .unwrap();

        let raw = String::from_utf8_lossy(&message.formatted()).into_owned();
        assert!(raw.contains("From: digest@example.com"));
        assert!(raw.contains("application/pdf"));
    }

    #[tokio::test]
    async fn test_invalid_recipient() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("digest.epub");
        std::fs::write(&path, b"PK").unwrap();

        let mailer = Mailer::new(&settings("smtp.example.com", 587), credentials());
        let result = mailer
            .send_attachment(&document(path, DocumentFormat::Epub), "not an address", "s", "b")
            .await;

        assert!(matches!(result, Err(DeliveryError::Address { .. })));
    }

    #[tokio::test]
    async fn test_missing_attachment() {
        let mailer = Mailer::new(&settings("smtp.example.com", 587), credentials());
        let result = mailer
            .send_attachment(
                &document(PathBuf::from("/nonexistent/digest.epub"), DocumentFormat::Epub),
                "me@kindle.com",
                "s",
                "b",
            )
            .await;

        assert!(matches!(result, Err(DeliveryError::Attachment { .. })));
    }

    #[tokio::test]
    async fn test_unreachable_host_keeps_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("digest.epub");
        std::fs::write(&path, b"PK").unwrap();

        let mailer = Mailer::new(&settings("localhost", 1), credentials()).with_timeout(Duration::from_secs(5));
        let result = mailer
            .send_attachment(&document(path.clone(), DocumentFormat::Epub), "me@kindle.com", "s", "b")
            .await;

        assert!(matches!(result, Err(DeliveryError::Transport { port: 1, .. })));
        assert!(path.exists());
    }
}
