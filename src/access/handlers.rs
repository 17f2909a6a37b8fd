use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};

use super::dto::{
    ActivateQuery, IssueTokenRequest, IssueTokenResponse, MessageResponse, RevokeTokenRequest,
    TokenListResponse,
};
use super::services::{self, IssueRequest};
use crate::{
    auth::extractors::Identity,
    error::{AppError, AppResult},
    state::AppState,
};

// --- routers ---

pub fn holder_routes() -> Router<AppState> {
    Router::new()
        .route("/api/access/activate", get(activate))
        .route("/api/access/tokens", get(list_tokens))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/access/issue", post(issue))
        .route("/api/access/revoke", post(revoke))
}

// --- handlers ---

#[instrument(skip(state, query), fields(user_id = %identity.user_id))]
pub async fn activate(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<ActivateQuery>,
) -> AppResult<Json<MessageResponse>> {
    let token = query
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::validation("Activation token is missing."))?;

    let granted = services::activate(state.store.as_ref(), &token, OffsetDateTime::now_utc()).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: granted.message().to_string(),
    }))
}

#[instrument(skip(state), fields(user_id = %identity.user_id))]
pub async fn list_tokens(
    State(state): State<AppState>,
    identity: Identity,
) -> AppResult<Json<TokenListResponse>> {
    let tokens = state.store.list_access_tokens_by_user(identity.user_id).await?;
    Ok(Json(TokenListResponse {
        success: true,
        tokens,
    }))
}

#[instrument(skip(state, payload), fields(admin_id = %identity.user_id))]
pub async fn issue(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<IssueTokenRequest>,
) -> AppResult<Json<IssueTokenResponse>> {
    let request = match (payload.course_id, payload.platform_access_tier) {
        (Some(course_id), None) => IssueRequest::Course { course_id },
        (None, Some(tier)) => IssueRequest::PlatformTier { tier },
        _ => {
            return Err(AppError::validation(
                "Exactly one of courseId or platformAccessTier is required",
            ))
        }
    };
    if payload
        .expires_at
        .is_some_and(|at| at <= OffsetDateTime::now_utc())
    {
        return Err(AppError::validation("expiresAt must be in the future"));
    }

    let token = services::issue(state.store.as_ref(), payload.user_id, request, payload.expires_at)
        .await?;
    info!(token_id = %token.id, "activation link issued");
    Ok(Json(IssueTokenResponse {
        success: true,
        activation_url: services::activation_url(&state.config.app_url, &token.token),
        access_token: token,
    }))
}

#[instrument(skip(state, payload), fields(admin_id = %identity.user_id))]
pub async fn revoke(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<RevokeTokenRequest>,
) -> AppResult<Json<MessageResponse>> {
    services::revoke(state.store.as_ref(), &payload.token, OffsetDateTime::now_utc()).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Access token revoked.".into(),
    }))
}
