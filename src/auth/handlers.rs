use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use time::Duration as TimeDuration;
use tracing::{info, instrument, warn};

use super::{
    cookies::{clear_session_cookie, session_cookie},
    dto::{
        LogoutResponse, MeResponse, SendMagicLinkRequest, SendMagicLinkResponse, SessionResponse,
        VerifyMagicLinkQuery,
    },
    extractors::Identity,
    services,
};
use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

pub fn magic_link_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/send-magic-link", post(send_magic_link))
        .route("/api/auth/verify-magic-link", get(verify_magic_link))
}

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
}

#[instrument(skip(state, payload))]
pub async fn send_magic_link(
    State(state): State<AppState>,
    Json(payload): Json<SendMagicLinkRequest>,
) -> AppResult<Json<SendMagicLinkResponse>> {
    let sent = services::send_magic_link(&state, &payload.email).await?;
    let message = if sent.simulated {
        "Sign-in link generated. Email delivery is simulated; check the server log."
    } else {
        "Sign-in link sent. Check your inbox."
    };
    Ok(Json(SendMagicLinkResponse {
        success: true,
        message: message.to_string(),
        simulated: sent.simulated,
    }))
}

#[instrument(skip(state, jar, query))]
pub async fn verify_magic_link(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<VerifyMagicLinkQuery>,
) -> AppResult<(CookieJar, Json<SessionResponse>)> {
    let Some(token) = query.token.filter(|t| !t.is_empty()) else {
        warn!("verify-magic-link without token");
        return Err(AppError::validation("Token is missing"));
    };

    let (user, session) = services::verify_magic_link(&state, &token).await?;
    let max_age = TimeDuration::minutes(state.config.jwt.session_ttl_minutes);
    let jar = jar.add(session_cookie(session, state.config.production, max_age));

    Ok((
        jar,
        Json(SessionResponse {
            success: true,
            redirect_to: user.role.dashboard_path(),
            user,
        }),
    ))
}

#[instrument(skip(state, jar))]
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<LogoutResponse>) {
    let jar = jar.add(clear_session_cookie(state.config.production));
    (
        jar,
        Json(LogoutResponse {
            success: true,
            message: "Signed out",
        }),
    )
}

/// Current user, read fresh from the store rather than from the session claims.
#[instrument(skip(state), fields(user_id = %identity.user_id))]
pub async fn me(State(state): State<AppState>, identity: Identity) -> AppResult<Json<MeResponse>> {
    let user = state
        .store
        .get_user_by_id(identity.user_id)
        .await?
        .ok_or_else(|| {
            info!(user_id = %identity.user_id, "session for a deleted user");
            AppError::unauthorized("User not found")
        })?;
    Ok(Json(MeResponse {
        success: true,
        user,
    }))
}
