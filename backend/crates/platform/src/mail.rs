//! Outbound mail
//!
//! [`MailSender`] is the delivery seam. [`SmtpMailSender`] delivers through
//! `lettre`; [`MockMailSender`] only logs and records, which is what local
//! development and tests use when no mail host is configured.

use std::sync::Mutex;

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl MailMessage {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid mail address: {0}")]
    InvalidAddress(String),

    #[error("Failed to build mail: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP delivery failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, message: MailMessage) -> Result<(), MailError>;
}

// ============================================================================
// Mock
// ============================================================================

/// Logs mails instead of sending them, and keeps them for inspection
#[derive(Debug, Default)]
pub struct MockMailSender {
    sent: Mutex<Vec<MailMessage>>,
}

impl MockMailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every mail "sent" so far, oldest first
    pub fn sent(&self) -> Vec<MailMessage> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// The most recent mail addressed to `to`
    pub fn last_to(&self, to: &str) -> Option<MailMessage> {
        self.sent().into_iter().rev().find(|m| m.to == to)
    }
}

#[async_trait]
impl MailSender for MockMailSender {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "Sending mail (mock)"
        );
        match self.sent.lock() {
            Ok(mut sent) => sent.push(message),
            Err(poisoned) => poisoned.into_inner().push(message),
        }
        Ok(())
    }
}

// ============================================================================
// SMTP
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Sender address, e.g. `Lemon <noreply@example.com>`
    pub from: String,
    /// STARTTLS on the relay; off only for local catch-all servers
    pub starttls: bool,
}

impl SmtpConfig {
    /// Plain-text SMTP against a local catcher such as MailHog
    pub fn development() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1025,
            username: None,
            password: None,
            from: "noreply@localhost".to_string(),
            starttls: false,
        }
    }
}

pub struct SmtpMailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailSender {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|_| MailError::InvalidAddress(config.from.clone()))?;

        let mut builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };
        builder = builder.port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl MailSender for SmtpMailSender {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|_| MailError::InvalidAddress(message.to.clone()))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body)?;

        self.transport.send(email).await?;
        tracing::debug!(to = %message.to, "Mail delivered");
        Ok(())
    }
}

impl std::fmt::Debug for SmtpMailSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailSender")
            .field("from", &self.from.to_string())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_messages() {
        let sender = MockMailSender::new();
        sender
            .send(MailMessage::new("a@example.com", "Hi", "first"))
            .await
            .unwrap();
        sender
            .send(MailMessage::new("a@example.com", "Hi", "second"))
            .await
            .unwrap();

        assert_eq!(sender.sent().len(), 2);
        assert_eq!(sender.last_to("a@example.com").unwrap().body, "second");
        assert!(sender.last_to("b@example.com").is_none());
    }

    #[test]
    fn test_smtp_rejects_bad_from() {
        let config = SmtpConfig {
            from: "not an address".to_string(),
            ..SmtpConfig::development()
        };
        assert!(matches!(
            SmtpMailSender::new(&config),
            Err(MailError::InvalidAddress(_))
        ));
    }

    #[tokio::test]
    async fn test_smtp_rejects_bad_recipient() {
        let sender = SmtpMailSender::new(&SmtpConfig::development()).unwrap();
        let result = sender
            .send(MailMessage::new("nobody", "Hi", "body"))
            .await;
        assert!(matches!(result, Err(MailError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn test_smtp_starttls_relay_builds() {
        let config = SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: Some("lemon".to_string()),
            password: Some("secret".to_string()),
            starttls: true,
            ..SmtpConfig::development()
        };
        assert!(SmtpMailSender::new(&config).is_ok());
    }
}
