use axum::{extract::State, routing::post, Json, Router};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{extractors::Identity, services::is_valid_email},
    error::{AppError, AppResult},
    state::AppState,
    store::{Invite, Role, User},
};

const INVITE_TTL_DAYS: i64 = 7;

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users/roles", post(update_role))
        .route("/api/users/invite", post(invite))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleRequest {
    pub user_id: Uuid,
    pub new_role: Role,
}

#[derive(Debug, Serialize)]
pub struct UpdateRoleResponse {
    pub success: bool,
    pub message: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteResponse {
    pub success: bool,
    pub invite_code: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

fn invite_code() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();
    format!("INVITE_{suffix}")
}

#[instrument(skip(state, payload), fields(admin_id = %identity.user_id))]
pub async fn update_role(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<UpdateRoleRequest>,
) -> AppResult<Json<UpdateRoleResponse>> {
    let user = state
        .store
        .update_user_role(payload.user_id, payload.new_role)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    info!(user_id = %user.id, role = %user.role, "role updated");
    Ok(Json(UpdateRoleResponse {
        success: true,
        message: format!("Role of user {} updated to {}", user.id, user.role),
        user,
    }))
}

#[instrument(skip(state, payload), fields(admin_id = %identity.user_id))]
pub async fn invite(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<InviteRequest>,
) -> AppResult<Json<InviteResponse>> {
    let email = payload.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(AppError::validation("Invalid email"));
    }
    if payload.role == Role::Student {
        return Err(AppError::validation("Invites are for teacher or admin roles"));
    }

    let invite = Invite {
        email,
        role: payload.role,
        code: invite_code(),
        expires_at: OffsetDateTime::now_utc() + TimeDuration::days(INVITE_TTL_DAYS),
    };
    state.store.save_invite(invite.clone()).await?;
    info!(role = %invite.role, "invite created");
    Ok(Json(InviteResponse {
        success: true,
        invite_code: invite.code,
        expires_at: invite.expires_at,
    }))
}
