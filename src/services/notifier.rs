//! Outgoing user notifications.
//!
//! Messages are wrapped in a fixed greeting and footer and delivered by
//! e-mail. Deployments without SMTP get [`LogNotifier`], which only records
//! the message in the log.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::SmtpConfig;

pub const SUBJECT: &str = "Notification from GC-Tracker";
const GREETING: &str = "Hello!";
const FOOTER: &str = "This is automated message. Please do not reply.";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("empty recipients list")]
    EmptyRecipient,

    #[error("empty message")]
    EmptyMessage,

    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("cannot build email: {0}")]
    Build(String),

    #[error("cannot send email to {to}: {reason}")]
    Transport { to: String, reason: String },
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, message: &str) -> Result<(), NotifyError>;
}

#[must_use]
pub fn compose_body(message: &str) -> String {
    format!("{GREETING}\n\n{message}\n\n{FOOTER}\n")
}

fn check_envelope(to: &str, message: &str) -> Result<(), NotifyError> {
    if to.trim().is_empty() {
        return Err(NotifyError::EmptyRecipient);
    }
    if message.trim().is_empty() {
        return Err(NotifyError::EmptyMessage);
    }
    Ok(())
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| NotifyError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    /// Builds a STARTTLS relay with PLAIN/LOGIN credentials.
    pub fn new(config: &SmtpConfig) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| anyhow::anyhow!("Invalid SMTP relay '{}': {e}", config.host))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        let from = parse_mailbox(config.sender())?;

        Ok(Self { transport, from })
    }

    fn build_message(&self, to: &str, message: &str) -> Result<Message, NotifyError> {
        Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(to)?)
            .subject(SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(compose_body(message))
            .map_err(|e| NotifyError::Build(e.to_string()))
    }
}

#[async_trait::async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, to: &str, message: &str) -> Result<(), NotifyError> {
        check_envelope(to, message)?;

        let email = self.build_message(to, message)?;
        self.transport.send(email).await.map_err(|e| {
            warn!(to, error = %e, "SMTP delivery failed");
            NotifyError::Transport {
                to: to.to_string(),
                reason: e.to_string(),
            }
        })?;

        metrics::counter!("notifications_sent_total").increment(1);
        Ok(())
    }
}

/// Sends a notification whose failure must not fail the caller. Failures
/// are logged and counted; returns whether the message went out.
pub async fn deliver(notifier: &dyn Notifier, to: &str, message: &str) -> bool {
    match notifier.send(to, message).await {
        Ok(()) => true,
        Err(e) => {
            metrics::counter!("notifications_failed_total").increment(1);
            warn!(to, error = %e, "Failed to send notification");
            false
        }
    }
}

/// Notifier used when SMTP is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &str, message: &str) -> Result<(), NotifyError> {
        check_envelope(to, message)?;
        info!(to, message, "Notification (SMTP disabled)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_body() {
        assert_eq!(
            compose_body("Your password has been changed."),
            "Hello!\n\nYour password has been changed.\n\nThis is automated message. Please do not reply.\n"
        );
    }

    #[tokio::test]
    async fn test_log_notifier_rejects_empty_envelope() {
        let notifier = LogNotifier;
        assert!(matches!(
            notifier.send("", "hi").await,
            Err(NotifyError::EmptyRecipient)
        ));
        assert!(matches!(
            notifier.send("user@example.com", " ").await,
            Err(NotifyError::EmptyMessage)
        ));
        assert!(notifier.send("user@example.com", "hi").await.is_ok());
    }

    #[test]
    fn test_smtp_message_has_subject_and_body() {
        let config = SmtpConfig {
            enabled: true,
            host: "smtp.example.com".to_string(),
            username: "robot@example.com".to_string(),
            password: "secret".to_string(),
            ..SmtpConfig::default()
        };
        let notifier = SmtpNotifier::new(&config).unwrap();

        let message = notifier
            .build_message("user@example.com", "Your case status has changed")
            .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("Subject: Notification from GC-Tracker"));
        assert!(raw.contains("From: robot@example.com"));
        assert!(raw.contains("To: user@example.com"));
        assert!(raw.contains("Your case status has changed"));
    }

    #[test]
    fn test_smtp_message_rejects_bad_recipient() {
        let config = SmtpConfig {
            enabled: true,
            host: "smtp.example.com".to_string(),
            username: "robot@example.com".to_string(),
            password: "secret".to_string(),
            ..SmtpConfig::default()
        };
        let notifier = SmtpNotifier::new(&config).unwrap();

        assert!(matches!(
            notifier.build_message("not an address", "hi"),
            Err(NotifyError::InvalidAddress { .. })
        ));
    }
}
