//! Outbound e-mail. Delivery is opaque to the rest of the service: a message either
//! goes out or `send` returns an error the caller decides how to treat.

mod console;
mod smtp;
pub mod templates;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub use console::ConsoleMailer;
pub use smtp::SmtpMailer;

use crate::config::SmtpConfig;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("failed to send email: {0}")]
    SendFailed(String),
    #[error("invalid email configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;

    /// `true` when messages are only logged, never delivered.
    fn is_simulated(&self) -> bool {
        false
    }
}

/// SMTP when configured, otherwise the console simulation.
pub fn create_mailer(smtp: Option<&SmtpConfig>) -> Result<Arc<dyn Mailer>, EmailError> {
    match smtp {
        Some(cfg) => Ok(Arc::new(SmtpMailer::new(cfg)?)),
        None => {
            tracing::warn!("SMTP is not configured; e-mail delivery is simulated in the log");
            Ok(Arc::new(ConsoleMailer))
        }
    }
}
