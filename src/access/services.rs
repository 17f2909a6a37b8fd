//! Access-token state machine and payment-driven grants.
//!
//! A token is created `pending` (or directly `active` when a payment grants access inline)
//! and leaves `pending` exactly once, to `active`, `expired` or `revoked`. The store performs
//! that transition as a compare-and-set, so concurrent activations cannot both apply.

use rand::RngCore;
use serde_json::json;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    payments::dto::Scenario,
    store::{
        AccessToken, EntityType, NewAccessToken, PlatformTier, Role, Store, TokenStatus, User,
    },
};

/// 32 random bytes, hex encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn activation_url(app_url: &str, token: &str) -> String {
    format!("{}/api/access/activate?token={}", app_url, token)
}

fn not_pending_message(status: TokenStatus) -> &'static str {
    match status {
        TokenStatus::Active => "This link has already been activated.",
        TokenStatus::Expired => "This link has expired.",
        TokenStatus::Revoked => "This link has been revoked.",
        TokenStatus::Pending => "This activation link has already been used or is expired.",
    }
}

/// What an activation or payment actually granted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Granted {
    Course { course_id: Uuid },
    StudentSlots { slots: u32, balance: i32 },
}

impl Granted {
    pub fn message(&self) -> &'static str {
        match self {
            Granted::Course { .. } => "Course access granted successfully!",
            Granted::StudentSlots { .. } => "Platform access granted successfully!",
        }
    }
}

async fn apply(store: &dyn Store, token: &AccessToken) -> AppResult<Granted> {
    match token.entity_type {
        EntityType::CourseAccess => {
            let course_id: Uuid = token.entity_id.parse().map_err(|_| {
                AppError::Internal(anyhow::anyhow!(
                    "access token {} has a non-uuid course id",
                    token.id
                ))
            })?;
            let inserted = store.add_course_to_student(token.user_id, course_id).await?;
            if !inserted {
                info!(user_id = %token.user_id, %course_id, "student already enrolled");
            }
            Ok(Granted::Course { course_id })
        }
        EntityType::PlatformTierAccess => {
            let slots = token.student_slots();
            let balance = store
                .add_student_slots_to_teacher(token.user_id, slots)
                .await?
                .ok_or_else(|| {
                    AppError::conflict("Platform access can only be granted to a teacher account.")
                })?;
            Ok(Granted::StudentSlots { slots, balance })
        }
    }
}

/// Redeems an activation link.
pub async fn activate(store: &dyn Store, token: &str, now: OffsetDateTime) -> AppResult<Granted> {
    let Some(access) = store.get_access_token_by_token(token).await? else {
        return Err(AppError::not_found("Invalid or expired activation link."));
    };

    if access.status != TokenStatus::Pending {
        return Err(AppError::conflict(not_pending_message(access.status)));
    }

    if access.is_expired_at(now) {
        store
            .transition_access_token(access.id, TokenStatus::Expired, now)
            .await?;
        info!(token_id = %access.id, "access token expired on activation attempt");
        return Err(AppError::conflict("This activation link has expired."));
    }

    if !store
        .transition_access_token(access.id, TokenStatus::Active, now)
        .await?
    {
        // Another request won the race; report where the token ended up.
        let current = store
            .get_access_token_by_token(token)
            .await?
            .map(|t| t.status)
            .unwrap_or(TokenStatus::Revoked);
        warn!(token_id = %access.id, status = %current, "access token activated concurrently");
        return Err(AppError::conflict(not_pending_message(current)));
    }

    let granted = apply(store, &access).await?;
    info!(token_id = %access.id, user_id = %access.user_id, ?granted, "access token activated");
    Ok(granted)
}

/// Administrative revocation of a still-pending token.
pub async fn revoke(store: &dyn Store, token: &str, now: OffsetDateTime) -> AppResult<AccessToken> {
    let Some(access) = store.get_access_token_by_token(token).await? else {
        return Err(AppError::not_found("Access token not found."));
    };
    if access.status != TokenStatus::Pending {
        return Err(AppError::conflict(not_pending_message(access.status)));
    }
    if !store
        .transition_access_token(access.id, TokenStatus::Revoked, now)
        .await?
    {
        let current = store
            .get_access_token_by_token(token)
            .await?
            .map(|t| t.status)
            .unwrap_or(TokenStatus::Revoked);
        return Err(AppError::conflict(not_pending_message(current)));
    }
    info!(token_id = %access.id, "access token revoked");
    Ok(AccessToken {
        status: TokenStatus::Revoked,
        ..access
    })
}

/// What an administrator may hand out through an activation link.
#[derive(Debug, Clone)]
pub enum IssueRequest {
    Course { course_id: Uuid },
    PlatformTier { tier: PlatformTier },
}

/// Creates a pending token for `user_id`.
pub async fn issue(
    store: &dyn Store,
    user_id: Uuid,
    request: IssueRequest,
    expires_at: Option<OffsetDateTime>,
) -> AppResult<AccessToken> {
    let user = store
        .get_user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let (entity_type, entity_id, access_details) = match request {
        IssueRequest::Course { course_id } => {
            store
                .get_course_by_id(course_id)
                .await?
                .ok_or_else(|| AppError::not_found("Course not found"))?;
            (EntityType::CourseAccess, course_id.to_string(), json!({ "type": "lifetime" }))
        }
        IssueRequest::PlatformTier { tier } => {
            if user.role != Role::Teacher {
                return Err(AppError::validation("Platform access can only be issued to teachers"));
            }
            (
                EntityType::PlatformTierAccess,
                tier.as_str().to_string(),
                json!({ "studentSlots": tier.student_slots() }),
            )
        }
    };

    let token = store
        .create_access_token(NewAccessToken {
            token: generate_token(),
            user_id,
            entity_type,
            entity_id,
            access_details,
            status: TokenStatus::Pending,
            payment_id: None,
            expires_at,
        })
        .await?;
    info!(token_id = %token.id, %user_id, entity_type = %token.entity_type, "access token issued");
    Ok(token)
}

/// Applies a paid scenario to `user` immediately and records an already-active token
/// linked to the payment, so the grant is never redeemable a second time.
pub async fn grant_for_payment(
    store: &dyn Store,
    user: &User,
    scenario: &Scenario,
    payment_id: &str,
) -> AppResult<(AccessToken, Granted)> {
    let (entity_type, entity_id, access_details, granted) = match scenario {
        Scenario::StudentBuysMyCourse { course_id }
        | Scenario::StudentBuysTeacherCourseSplit { course_id, .. } => {
            store.add_course_to_student(user.id, *course_id).await?;
            (
                EntityType::CourseAccess,
                course_id.to_string(),
                json!({ "type": "lifetime" }),
                Granted::Course { course_id: *course_id },
            )
        }
        Scenario::TeacherBuysPlatformAccess { platform_access_tier } => {
            let slots = platform_access_tier.student_slots();
            let balance = store
                .add_student_slots_to_teacher(user.id, slots)
                .await?
                .ok_or_else(|| {
                    AppError::conflict("Platform access can only be granted to a teacher account.")
                })?;
            store.set_platform_tier(user.id, *platform_access_tier).await?;
            (
                EntityType::PlatformTierAccess,
                platform_access_tier.as_str().to_string(),
                json!({ "studentSlots": slots }),
                Granted::StudentSlots { slots, balance },
            )
        }
    };

    let token = store
        .create_access_token(NewAccessToken {
            token: generate_token(),
            user_id: user.id,
            entity_type,
            entity_id,
            access_details,
            status: TokenStatus::Active,
            payment_id: Some(payment_id.to_string()),
            expires_at: None,
        })
        .await?;
    info!(user_id = %user.id, %payment_id, ?granted, "access granted for payment");
    Ok((token, granted))
}
