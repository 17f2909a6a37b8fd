use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::StoreError;

/// Single-valued user role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }

    /// Landing page under `/dashboard` for this role.
    pub fn dashboard_path(self) -> &'static str {
        match self {
            Role::Student => "/dashboard/student",
            Role::Teacher => "/dashboard/teacher",
            Role::Admin => "/dashboard/admin",
        }
    }
}

/// Teacher-facing platform subscription level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PlatformTier {
    Free,
    Basic,
    Pro,
    Enterprise,
}

impl PlatformTier {
    pub fn as_str(self) -> &'static str {
        match self {
            PlatformTier::Free => "free",
            PlatformTier::Basic => "basic",
            PlatformTier::Pro => "pro",
            PlatformTier::Enterprise => "enterprise",
        }
    }

    /// Student slots granted when a teacher buys this tier.
    pub fn student_slots(self) -> u32 {
        match self {
            PlatformTier::Free => 0,
            PlatformTier::Basic => 10,
            PlatformTier::Pro => 50,
            PlatformTier::Enterprise => 1000,
        }
    }

    /// List price of the tier in the platform currency. The free tier is never sold.
    pub fn price(self) -> Option<Decimal> {
        match self {
            PlatformTier::Free => None,
            PlatformTier::Basic => Some(Decimal::new(50_000, 2)),
            PlatformTier::Pro => Some(Decimal::new(99_000, 2)),
            PlatformTier::Enterprise => Some(Decimal::new(499_000, 2)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    CourseAccess,
    PlatformTierAccess,
}

impl EntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::CourseAccess => "course_access",
            EntityType::PlatformTierAccess => "platform_tier_access",
        }
    }
}

/// Lifecycle of an access token. Everything but `Pending` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenStatus {
    Pending,
    Active,
    Expired,
    Revoked,
}

impl TokenStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenStatus::Pending => "pending",
            TokenStatus::Active => "active",
            TokenStatus::Expired => "expired",
            TokenStatus::Revoked => "revoked",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Failed,
    Canceled,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Canceled => "canceled",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

macro_rules! text_enum {
    ($ty:ty, $name:literal, [$($variant:expr),+ $(,)?]) => {
        impl FromStr for $ty {
            type Err = StoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                [$($variant),+]
                    .into_iter()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| StoreError::Invalid(format!("unknown {} '{}'", $name, s)))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum!(Role, "role", [Role::Student, Role::Teacher, Role::Admin]);
text_enum!(
    PlatformTier,
    "platform tier",
    [PlatformTier::Free, PlatformTier::Basic, PlatformTier::Pro, PlatformTier::Enterprise]
);
text_enum!(EntityType, "entity type", [EntityType::CourseAccess, EntityType::PlatformTierAccess]);
text_enum!(
    TokenStatus,
    "token status",
    [TokenStatus::Pending, TokenStatus::Active, TokenStatus::Expired, TokenStatus::Revoked]
);
text_enum!(
    PaymentStatus,
    "payment status",
    [
        PaymentStatus::Pending,
        PaymentStatus::Succeeded,
        PaymentStatus::Failed,
        PaymentStatus::Canceled,
        PaymentStatus::Refunded,
    ]
);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub email_verified: bool,
    pub role: Role,
    pub platform_access_tier: Option<PlatformTier>,
    pub student_slots_available: i32,
    #[serde(skip_serializing)]
    pub payout_account_id: Option<String>,
    #[serde(skip_serializing)]
    pub payout_gateway_id: Option<String>,
    pub purchased_course_ids: Vec<Uuid>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub role: Role,
    pub email_verified: bool,
    pub platform_access_tier: Option<PlatformTier>,
    pub student_slots_available: i32,
}

impl NewUser {
    /// Fresh self-registered account: unverified student on the free tier.
    pub fn student(email: &str) -> Self {
        let username = email.split('@').next().unwrap_or(email).to_string();
        Self {
            username,
            email: email.to_string(),
            role: Role::Student,
            email_verified: false,
            platform_access_tier: Some(PlatformTier::Free),
            student_slots_available: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub currency: String,
    pub instructor_id: Uuid,
    pub is_published: bool,
    pub is_archived: bool,
    pub students_enrolled: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewCourse {
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub currency: String,
    pub instructor_id: Uuid,
    pub is_published: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub token: String,
    pub user_id: Uuid,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub access_details: serde_json::Value,
    pub status: TokenStatus,
    pub payment_id: Option<String>,
    pub generated_at: OffsetDateTime,
    pub activated_at: Option<OffsetDateTime>,
    pub expires_at: Option<OffsetDateTime>,
}

impl AccessToken {
    /// Slots recorded in `access_details.studentSlots`; absent or malformed counts as zero.
    pub fn student_slots(&self) -> u32 {
        self.access_details
            .get("studentSlots")
            .and_then(|v| v.as_u64())
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(0)
    }

    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|exp| now > exp)
    }
}

#[derive(Debug, Clone)]
pub struct NewAccessToken {
    pub token: String,
    pub user_id: Uuid,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub access_details: serde_json::Value,
    pub status: TokenStatus,
    pub payment_id: Option<String>,
    pub expires_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone)]
pub struct MagicLinkToken {
    pub id: Uuid,
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: OffsetDateTime,
    pub used_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub payment_system_id: String,
    pub status: PaymentStatus,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub user_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub payment_system_id: String,
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: String,
    pub start_date: OffsetDateTime,
    pub end_date: OffsetDateTime,
    pub is_active: bool,
}

impl Subscription {
    pub fn is_valid_at(&self, now: OffsetDateTime) -> bool {
        self.is_active && now < self.end_date
    }
}

#[derive(Debug, Clone)]
pub struct Invite {
    pub email: String,
    pub role: Role,
    pub code: String,
    pub expires_at: OffsetDateTime,
}
