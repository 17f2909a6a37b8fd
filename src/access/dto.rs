use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::store::{AccessToken, PlatformTier};

#[derive(Debug, Deserialize)]
pub struct ActivateQuery {
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// Body of `POST /api/access/issue`. Exactly one of `courseId` / `platformAccessTier`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTokenRequest {
    pub user_id: Uuid,
    pub course_id: Option<Uuid>,
    pub platform_access_tier: Option<PlatformTier>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTokenResponse {
    pub success: bool,
    pub activation_url: String,
    pub access_token: AccessToken,
}

#[derive(Debug, Deserialize)]
pub struct RevokeTokenRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenListResponse {
    pub success: bool,
    pub tokens: Vec<AccessToken>,
}
