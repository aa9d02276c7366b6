//! Outbound mail port.
//!
//! Completion notices are fire-and-forget: a send failure is logged by the
//! caller and never retried.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("mail delivery failed: {0}")]
pub struct MailError(pub String);

#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

#[async_trait]
impl<S> MailSender for Arc<S>
where
    S: MailSender + ?Sized,
{
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        (**self).send(to, subject, body).await
    }
}

/// Logs instead of delivering. Default sender for dev and tests.
#[derive(Debug, Default)]
pub struct LogMailSender;

#[async_trait]
impl MailSender for LogMailSender {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), MailError> {
        tracing::info!(to, subject, "mail send skipped (log sender)");
        Ok(())
    }
}
