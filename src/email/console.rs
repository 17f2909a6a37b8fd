use async_trait::async_trait;
use tracing::info;

use super::{EmailError, EmailMessage, Mailer};

/// Logs messages instead of delivering them.
pub struct ConsoleMailer;

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.text,
            "email simulated"
        );
        Ok(())
    }

    fn is_simulated(&self) -> bool {
        true
    }
}
