use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error};

use super::dto::{GatewayPayment, PaymentRequest};
use crate::config::YookassaConfig;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("gateway answered {status}: {body}")]
    Api { status: u16, body: String },
    #[error("unexpected gateway response: {0}")]
    Decode(String),
}

/// Outbound payment operations. Answers are gateway facts; persisting them is the caller's job.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment(&self, request: &PaymentRequest) -> Result<GatewayPayment, GatewayError>;
    async fn get_payment(&self, payment_id: &str) -> Result<GatewayPayment, GatewayError>;
}

pub struct YookassaClient {
    http: reqwest::Client,
    api_url: String,
    shop_id: String,
    secret_key: String,
}

impl YookassaClient {
    pub fn new(cfg: &YookassaConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: cfg.api_url.trim_end_matches('/').to_string(),
            shop_id: cfg.shop_id.clone(),
            secret_key: cfg.secret_key.clone(),
        }
    }

    async fn read_payment(response: reqwest::Response) -> Result<GatewayPayment, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "yookassa request failed");
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<GatewayPayment>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

#[async_trait]
impl PaymentGateway for YookassaClient {
    async fn create_payment(&self, request: &PaymentRequest) -> Result<GatewayPayment, GatewayError> {
        let response = self
            .http
            .post(format!("{}/payments", self.api_url))
            .basic_auth(&self.shop_id, Some(&self.secret_key))
            .header("Idempotence-Key", request.idempotence_key.to_string())
            .json(request)
            .send()
            .await?;
        let payment = Self::read_payment(response).await?;
        debug!(payment_id = %payment.id, status = %payment.status, "yookassa payment created");
        Ok(payment)
    }

    async fn get_payment(&self, payment_id: &str) -> Result<GatewayPayment, GatewayError> {
        let response = self
            .http
            .get(format!("{}/payments/{}", self.api_url, payment_id))
            .basic_auth(&self.shop_id, Some(&self.secret_key))
            .send()
            .await?;
        Self::read_payment(response).await
    }
}
