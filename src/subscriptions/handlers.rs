use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::Identity,
    error::{AppError, AppResult},
    state::AppState,
};

pub fn status_routes() -> Router<AppState> {
    Router::new().route("/api/subscription/status", get(status))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub success: bool,
    pub is_active: bool,
    #[serde(
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_date: Option<OffsetDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
}

/// Subscription validity for the caller, or for any user when an admin asks.
#[instrument(skip(state), fields(user_id = %identity.user_id))]
pub async fn status(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<StatusQuery>,
) -> AppResult<Json<StatusResponse>> {
    let target = match query.user_id {
        Some(id) if id != identity.user_id && !identity.is_admin() => {
            return Err(AppError::forbidden("Forbidden"));
        }
        Some(id) => id,
        None => identity.user_id,
    };

    let now = OffsetDateTime::now_utc();
    let response = match state.store.get_user_subscription(target).await? {
        Some(sub) if sub.is_valid_at(now) => StatusResponse {
            success: true,
            is_active: true,
            end_date: Some(sub.end_date),
            plan_id: Some(sub.plan_id),
        },
        _ => StatusResponse {
            success: true,
            is_active: false,
            end_date: None,
            plan_id: None,
        },
    };
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Role, Subscription, User};
    use crate::testing::TestHarness;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::Value;
    use time::Duration;
    use tower::ServiceExt;

    async fn get(h: &TestHarness, uri: &str, who: &User) -> (StatusCode, Value) {
        let res = h
            .app()
            .oneshot(
                Request::get(uri)
                    .header(header::COOKIE, h.cookie(who))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn reports_own_subscription() {
        let h = TestHarness::new();
        let student = h.user("s@example.com", Role::Student).await;
        let (status, body) = get(&h, "/api/subscription/status", &student).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isActive"], false);

        let now = OffsetDateTime::now_utc();
        h.store
            .insert_subscription(Subscription {
                id: Uuid::new_v4(),
                user_id: student.id,
                plan_id: "monthly".into(),
                start_date: now - Duration::days(1),
                end_date: now + Duration::days(29),
                is_active: true,
            })
            .await;
        let (_, body) = get(&h, "/api/subscription/status", &student).await;
        assert_eq!(body["isActive"], true);
        assert_eq!(body["planId"], "monthly");
        assert!(body["endDate"].is_string());
    }

    #[tokio::test]
    async fn other_users_require_admin() {
        let h = TestHarness::new();
        let student = h.user("s@example.com", Role::Student).await;
        let other = h.user("o@example.com", Role::Student).await;
        let admin = h.user("a@example.com", Role::Admin).await;
        let uri = format!("/api/subscription/status?userId={}", other.id);

        let (status, _) = get(&h, &uri, &student).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = get(&h, &uri, &admin).await;
        assert_eq!(status, StatusCode::OK);
    }
}
