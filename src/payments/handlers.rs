use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use super::{
    dto::{
        CreatePaymentRequest, CreatePaymentResponse, VerifyPaymentRequest, VerifyPaymentResponse,
        WebhookNotification,
    },
    services,
    signature::{verify_webhook_signature, SIGNATURE_HEADER},
};
use crate::{
    auth::extractors::Identity,
    error::{AppError, AppResult},
    state::AppState,
};

// --- routers ---

pub fn payer_routes() -> Router<AppState> {
    Router::new()
        .route("/api/payment/create", post(create_payment))
        .route("/api/payment/verify", post(verify_payment))
}

pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/api/payment/webhook", post(webhook))
}

// --- handlers ---

#[instrument(skip(state, payload), fields(user_id = %identity.user_id))]
pub async fn create_payment(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<CreatePaymentRequest>,
) -> AppResult<Json<CreatePaymentResponse>> {
    Ok(Json(services::create_payment(&state, &identity, payload).await?))
}

#[instrument(skip(state, payload), fields(user_id = %identity.user_id))]
pub async fn verify_payment(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<VerifyPaymentRequest>,
) -> AppResult<Json<VerifyPaymentResponse>> {
    Ok(Json(
        services::verify_payment(&state, &identity, payload.payment_id.trim()).await?,
    ))
}

/// Gateway notification. The signature covers the exact bytes received, so the body is
/// verified before it is parsed.
#[instrument(skip(state, headers, body))]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    if !verify_webhook_signature(&body, signature, &state.config.yookassa.webhook_secret) {
        return Err(AppError::forbidden("Invalid signature"));
    }

    let notification: WebhookNotification = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "webhook body rejected");
        AppError::validation("Invalid notification body")
    })?;
    info!(event = %notification.event, payment_id = %notification.object.id, "webhook received");

    let processed = services::handle_notification(&state, &notification).await?;
    Ok(Json(json!({ "success": true, "message": processed.message() })))
}
