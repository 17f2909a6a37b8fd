use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::debug;

use super::{EmailError, EmailMessage, Mailer};
use crate::config::SmtpConfig;

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig) -> Result<Self, EmailError> {
        // Port 465 uses implicit TLS, other ports use STARTTLS
        let builder = if cfg.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)
        }
        .map_err(|e| EmailError::InvalidConfig(format!("SMTP relay error: {}", e)))?;

        let transport = builder
            .port(cfg.port)
            .credentials(Credentials::new(cfg.username.clone(), cfg.password.clone()))
            .build();

        Ok(Self {
            transport,
            from: cfg.from_email.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| EmailError::InvalidConfig(format!("invalid from address: {}", e)))?,
            )
            .to(message
                .to
                .parse()
                .map_err(|e| EmailError::SendFailed(format!("invalid to address: {}", e)))?)
            .subject(message.subject.clone())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(message.text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(message.html.clone()),
                    ),
            )
            .map_err(|e| EmailError::SendFailed(format!("failed to build email: {}", e)))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| EmailError::SendFailed(e.to_string()))?;
        debug!(to = %message.to, "email sent over smtp");
        Ok(())
    }
}
