use async_trait::async_trait;
use thiserror::Error;

/// An outgoing email.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// A failed delivery attempt.
#[derive(Debug, Error)]
#[error("Mail delivery failed: {0}")]
pub struct MailError(pub String);

/// Sends email on behalf of the auth flows.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

/// A `Mailer` that writes each message to the log instead of delivering it.
#[derive(Clone, Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "📧 Outgoing email\n{}",
            email.body
        );
        Ok(())
    }
}
