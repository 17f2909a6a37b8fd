use serde::{Deserialize, Serialize};

use crate::store::User;

#[derive(Debug, Deserialize)]
pub struct SendMagicLinkRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SendMagicLinkResponse {
    pub success: bool,
    pub message: String,
    /// Set when delivery is only simulated in the server log.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub simulated: bool,
}

#[derive(Debug, Deserialize)]
pub struct VerifyMagicLinkQuery {
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub success: bool,
    pub user: User,
    pub redirect_to: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub success: bool,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: &'static str,
}
