pub mod memory;
pub mod models;
pub mod postgres;

use axum::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use models::*;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("invalid stored value: {0}")]
    Invalid(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for every entity the service owns.
///
/// Implementations must make the compare-and-set operations
/// (`transition_access_token`, `mark_magic_link_used`, `update_payment_status`)
/// and `add_student_slots_to_teacher` atomic with respect to concurrent callers.
#[async_trait]
pub trait Store: Send + Sync {
    // users
    async fn get_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn create_user(&self, new: NewUser) -> StoreResult<User>;
    /// Replaces the mutable columns of an existing row.
    async fn update_user(&self, user: &User) -> StoreResult<User>;
    async fn update_user_role(&self, id: Uuid, role: Role) -> StoreResult<Option<User>>;
    /// Sets only `email_verified`, leaving balances written by other callers intact.
    async fn mark_email_verified(&self, id: Uuid) -> StoreResult<Option<User>>;
    /// Idempotent. Returns `true` when the enrolment row was newly written.
    async fn add_course_to_student(&self, user_id: Uuid, course_id: Uuid) -> StoreResult<bool>;
    /// Adds `slots` to a teacher's balance. `None` when the user is missing or not a teacher.
    async fn add_student_slots_to_teacher(&self, user_id: Uuid, slots: u32)
        -> StoreResult<Option<i32>>;
    async fn set_platform_tier(&self, user_id: Uuid, tier: PlatformTier) -> StoreResult<bool>;

    // courses
    async fn get_course_by_id(&self, id: Uuid) -> StoreResult<Option<Course>>;
    async fn list_courses(&self, published_only: bool) -> StoreResult<Vec<Course>>;
    async fn list_courses_by_instructor(&self, instructor_id: Uuid) -> StoreResult<Vec<Course>>;
    async fn create_course(&self, new: NewCourse) -> StoreResult<Course>;
    async fn set_course_published(&self, id: Uuid, published: bool) -> StoreResult<Option<Course>>;

    // access tokens
    async fn create_access_token(&self, new: NewAccessToken) -> StoreResult<AccessToken>;
    async fn get_access_token_by_token(&self, token: &str) -> StoreResult<Option<AccessToken>>;
    async fn list_access_tokens_by_user(&self, user_id: Uuid) -> StoreResult<Vec<AccessToken>>;
    /// The earliest token recorded against a gateway payment, if any.
    async fn get_access_token_by_payment_id(
        &self,
        payment_id: &str,
    ) -> StoreResult<Option<AccessToken>>;
    /// Moves a token out of `pending`. Returns `false` if it was no longer pending.
    async fn transition_access_token(
        &self,
        id: Uuid,
        to: TokenStatus,
        at: OffsetDateTime,
    ) -> StoreResult<bool>;

    // magic links
    async fn create_magic_link_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> StoreResult<MagicLinkToken>;
    async fn get_magic_link_token(&self, token: &str) -> StoreResult<Option<MagicLinkToken>>;
    /// Sets `used_at` once. Returns `false` if it was already set.
    async fn mark_magic_link_used(&self, id: Uuid, at: OffsetDateTime) -> StoreResult<bool>;

    // payments
    async fn create_payment(&self, new: NewPayment) -> StoreResult<Payment>;
    async fn get_payment_by_system_id(&self, system_id: &str) -> StoreResult<Option<Payment>>;
    /// Returns the status held before the update, or `None` if no such payment exists.
    async fn update_payment_status(
        &self,
        system_id: &str,
        status: PaymentStatus,
    ) -> StoreResult<Option<PaymentStatus>>;
    async fn list_payments_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Payment>>;

    // subscriptions
    async fn get_user_subscription(&self, user_id: Uuid) -> StoreResult<Option<Subscription>>;

    // invites
    async fn save_invite(&self, invite: Invite) -> StoreResult<()>;
}
