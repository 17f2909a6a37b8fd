use axum::async_trait;
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use super::{
    AccessToken, Course, Invite, MagicLinkToken, NewAccessToken, NewCourse, NewPayment, NewUser,
    Payment, PaymentStatus, PlatformTier, Role, Store, StoreError, StoreResult, Subscription,
    TokenStatus, User,
};

/// Postgres-backed store. Every call checks one connection out of the pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

const USER_COLUMNS: &str = r#"
    u.id, u.username, u.email, u.email_verified, u.role, u.platform_access_tier,
    u.student_slots_available, u.payout_account_id, u.payout_gateway_id,
    ARRAY(
        SELECT pc.course_id FROM user_purchased_courses pc
        WHERE pc.user_id = u.id ORDER BY pc.created_at
    ) AS purchased_course_ids,
    u.created_at, u.updated_at
"#;

const COURSE_COLUMNS: &str = r#"
    id, title, description, price, currency, instructor_id, is_published, is_archived,
    students_enrolled, created_at, updated_at
"#;

const TOKEN_COLUMNS: &str = r#"
    id, token, user_id, entity_type, entity_id, access_details, status, payment_id,
    generated_at, activated_at, expires_at
"#;

const PAYMENT_COLUMNS: &str = r#"
    id, user_id, amount, currency, payment_system_id, status, created_at, updated_at
"#;

// Rows carry enum columns as TEXT and are checked on the way out.

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    email_verified: bool,
    role: String,
    platform_access_tier: Option<String>,
    student_slots_available: i32,
    payout_account_id: Option<String>,
    payout_gateway_id: Option<String>,
    purchased_course_ids: Vec<Uuid>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: r.id,
            username: r.username,
            email: r.email,
            email_verified: r.email_verified,
            role: r.role.parse()?,
            platform_access_tier: r
                .platform_access_tier
                .map(|t| t.parse::<PlatformTier>())
                .transpose()?,
            student_slots_available: r.student_slots_available,
            payout_account_id: r.payout_account_id,
            payout_gateway_id: r.payout_gateway_id,
            purchased_course_ids: r.purchased_course_ids,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(FromRow)]
struct CourseRow {
    id: Uuid,
    title: String,
    description: String,
    price: Decimal,
    currency: String,
    instructor_id: Uuid,
    is_published: bool,
    is_archived: bool,
    students_enrolled: i32,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<CourseRow> for Course {
    fn from(r: CourseRow) -> Self {
        Course {
            id: r.id,
            title: r.title,
            description: r.description,
            price: r.price,
            currency: r.currency,
            instructor_id: r.instructor_id,
            is_published: r.is_published,
            is_archived: r.is_archived,
            students_enrolled: r.students_enrolled,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(FromRow)]
struct AccessTokenRow {
    id: Uuid,
    token: String,
    user_id: Uuid,
    entity_type: String,
    entity_id: String,
    access_details: serde_json::Value,
    status: String,
    payment_id: Option<String>,
    generated_at: OffsetDateTime,
    activated_at: Option<OffsetDateTime>,
    expires_at: Option<OffsetDateTime>,
}

impl TryFrom<AccessTokenRow> for AccessToken {
    type Error = StoreError;

    fn try_from(r: AccessTokenRow) -> Result<Self, Self::Error> {
        Ok(AccessToken {
            id: r.id,
            token: r.token,
            user_id: r.user_id,
            entity_type: r.entity_type.parse()?,
            entity_id: r.entity_id,
            access_details: r.access_details,
            status: r.status.parse()?,
            payment_id: r.payment_id,
            generated_at: r.generated_at,
            activated_at: r.activated_at,
            expires_at: r.expires_at,
        })
    }
}

#[derive(FromRow)]
struct MagicLinkRow {
    id: Uuid,
    token: String,
    user_id: Uuid,
    expires_at: OffsetDateTime,
    used_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
}

impl From<MagicLinkRow> for MagicLinkToken {
    fn from(r: MagicLinkRow) -> Self {
        MagicLinkToken {
            id: r.id,
            token: r.token,
            user_id: r.user_id,
            expires_at: r.expires_at,
            used_at: r.used_at,
            created_at: r.created_at,
        }
    }
}

#[derive(FromRow)]
struct PaymentRow {
    id: Uuid,
    user_id: Uuid,
    amount: Decimal,
    currency: String,
    payment_system_id: String,
    status: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = StoreError;

    fn try_from(r: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: r.id,
            user_id: r.user_id,
            amount: r.amount,
            currency: r.currency,
            payment_system_id: r.payment_system_id,
            status: r.status.parse()?,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: Uuid,
    plan_id: String,
    start_date: OffsetDateTime,
    end_date: OffsetDateTime,
    is_active: bool,
}

impl From<SubscriptionRow> for Subscription {
    fn from(r: SubscriptionRow) -> Self {
        Subscription {
            id: r.id,
            user_id: r.user_id,
            plan_id: r.plan_id,
            start_date: r.start_date,
            end_date: r.end_date,
            is_active: r.is_active,
        }
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

impl PgStore {
    async fn fetch_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }
}

#[async_trait]
impl Store for PgStore {
    async fn get_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.fetch_user(id).await
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.email = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, email_verified, role,
                               platform_access_tier, student_slots_available)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(id)
        .bind(&new.username)
        .bind(&new.email)
        .bind(new.email_verified)
        .bind(new.role.as_str())
        .bind(new.platform_access_tier.map(|t| t.as_str()))
        .bind(new.student_slots_available.max(0))
        .execute(&self.pool)
        .await?;
        debug!(user_id = %id, role = %new.role, "user row inserted");
        self.fetch_user(id).await?.ok_or(StoreError::NotFound)
    }

    async fn update_user(&self, user: &User) -> StoreResult<User> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = $2, email = $3, email_verified = $4, role = $5,
                platform_access_tier = $6, student_slots_available = $7,
                payout_account_id = $8, payout_gateway_id = $9, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.email_verified)
        .bind(user.role.as_str())
        .bind(user.platform_access_tier.map(|t| t.as_str()))
        .bind(user.student_slots_available)
        .bind(&user.payout_account_id)
        .bind(&user.payout_gateway_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        self.fetch_user(user.id).await?.ok_or(StoreError::NotFound)
    }

    async fn update_user_role(&self, id: Uuid, role: Role) -> StoreResult<Option<User>> {
        let result = sqlx::query("UPDATE users SET role = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(role.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.fetch_user(id).await
    }

    async fn mark_email_verified(&self, id: Uuid) -> StoreResult<Option<User>> {
        let result = sqlx::query(
            "UPDATE users SET email_verified = true, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.fetch_user(id).await
    }

    async fn add_course_to_student(&self, user_id: Uuid, course_id: Uuid) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        let inserted = sqlx::query(
            r#"
            INSERT INTO user_purchased_courses (user_id, course_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, course_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;
        if inserted {
            sqlx::query(
                "UPDATE courses SET students_enrolled = students_enrolled + 1, updated_at = now() WHERE id = $1",
            )
            .bind(course_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(inserted)
    }

    async fn add_student_slots_to_teacher(
        &self,
        user_id: Uuid,
        slots: u32,
    ) -> StoreResult<Option<i32>> {
        let add = i32::try_from(slots)
            .map_err(|_| StoreError::Invalid(format!("slot increment {} too large", slots)))?;
        let balance: Option<(i32,)> = sqlx::query_as(
            r#"
            UPDATE users
            SET student_slots_available = student_slots_available + $2, updated_at = now()
            WHERE id = $1 AND role = 'teacher'
            RETURNING student_slots_available
            "#,
        )
        .bind(user_id)
        .bind(add)
        .fetch_optional(&self.pool)
        .await?;
        Ok(balance.map(|(b,)| b))
    }

    async fn set_platform_tier(&self, user_id: Uuid, tier: PlatformTier) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET platform_access_tier = $2, updated_at = now() WHERE id = $1",
        )
        .bind(user_id)
        .bind(tier.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_course_by_id(&self, id: Uuid) -> StoreResult<Option<Course>> {
        let sql = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1");
        let row = sqlx::query_as::<_, CourseRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Course::from))
    }

    async fn list_courses(&self, published_only: bool) -> StoreResult<Vec<Course>> {
        let sql = format!(
            "SELECT {COURSE_COLUMNS} FROM courses
             WHERE is_archived = FALSE AND ($1 = FALSE OR is_published = TRUE)
             ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, CourseRow>(&sql)
            .bind(published_only)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Course::from).collect())
    }

    async fn list_courses_by_instructor(&self, instructor_id: Uuid) -> StoreResult<Vec<Course>> {
        let sql = format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE instructor_id = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, CourseRow>(&sql)
            .bind(instructor_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Course::from).collect())
    }

    async fn create_course(&self, new: NewCourse) -> StoreResult<Course> {
        let sql = format!(
            "INSERT INTO courses (id, title, description, price, currency, instructor_id, is_published)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COURSE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CourseRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new.title)
            .bind(&new.description)
            .bind(new.price)
            .bind(&new.currency)
            .bind(new.instructor_id)
            .bind(new.is_published)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn set_course_published(&self, id: Uuid, published: bool) -> StoreResult<Option<Course>> {
        let sql = format!(
            "UPDATE courses SET is_published = $2, updated_at = now() WHERE id = $1
             RETURNING {COURSE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CourseRow>(&sql)
            .bind(id)
            .bind(published)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Course::from))
    }

    async fn create_access_token(&self, new: NewAccessToken) -> StoreResult<AccessToken> {
        let sql = format!(
            "INSERT INTO access_tokens (id, token, user_id, entity_type, entity_id, access_details,
                                        status, payment_id, expires_at, activated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9,
                     CASE WHEN $7 = 'active' THEN now() ELSE NULL END)
             RETURNING {TOKEN_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AccessTokenRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new.token)
            .bind(new.user_id)
            .bind(new.entity_type.as_str())
            .bind(&new.entity_id)
            .bind(&new.access_details)
            .bind(new.status.as_str())
            .bind(&new.payment_id)
            .bind(new.expires_at)
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    async fn get_access_token_by_token(&self, token: &str) -> StoreResult<Option<AccessToken>> {
        let sql = format!("SELECT {TOKEN_COLUMNS} FROM access_tokens WHERE token = $1");
        sqlx::query_as::<_, AccessTokenRow>(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?
            .map(AccessToken::try_from)
            .transpose()
    }

    async fn list_access_tokens_by_user(&self, user_id: Uuid) -> StoreResult<Vec<AccessToken>> {
        let sql = format!(
            "SELECT {TOKEN_COLUMNS} FROM access_tokens WHERE user_id = $1 ORDER BY generated_at DESC"
        );
        let rows = sqlx::query_as::<_, AccessTokenRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    async fn get_access_token_by_payment_id(
        &self,
        payment_id: &str,
    ) -> StoreResult<Option<AccessToken>> {
        let sql = format!(
            "SELECT {TOKEN_COLUMNS} FROM access_tokens WHERE payment_id = $1
             ORDER BY generated_at LIMIT 1"
        );
        sqlx::query_as::<_, AccessTokenRow>(&sql)
            .bind(payment_id)
            .fetch_optional(&self.pool)
            .await?
            .map(AccessToken::try_from)
            .transpose()
    }

    async fn transition_access_token(
        &self,
        id: Uuid,
        to: TokenStatus,
        at: OffsetDateTime,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE access_tokens
            SET status = $2,
                activated_at = CASE WHEN $2 = 'active' THEN $3 ELSE activated_at END,
                updated_at = $3
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(to.as_str())
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn create_magic_link_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> StoreResult<MagicLinkToken> {
        let row = sqlx::query_as::<_, MagicLinkRow>(
            r#"
            INSERT INTO magic_link_tokens (id, token, user_id, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, token, user_id, expires_at, used_at, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn get_magic_link_token(&self, token: &str) -> StoreResult<Option<MagicLinkToken>> {
        let row = sqlx::query_as::<_, MagicLinkRow>(
            r#"
            SELECT id, token, user_id, expires_at, used_at, created_at
            FROM magic_link_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(MagicLinkToken::from))
    }

    async fn mark_magic_link_used(&self, id: Uuid, at: OffsetDateTime) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE magic_link_tokens SET used_at = $2 WHERE id = $1 AND used_at IS NULL",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn create_payment(&self, new: NewPayment) -> StoreResult<Payment> {
        let sql = format!(
            "INSERT INTO payments (id, user_id, amount, currency, payment_system_id, status)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {PAYMENT_COLUMNS}"
        );
        sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(new.user_id)
            .bind(new.amount)
            .bind(&new.currency)
            .bind(&new.payment_system_id)
            .bind(new.status.as_str())
            .fetch_one(&self.pool)
            .await?
            .try_into()
    }

    async fn get_payment_by_system_id(&self, system_id: &str) -> StoreResult<Option<Payment>> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE payment_system_id = $1");
        sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(system_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Payment::try_from)
            .transpose()
    }

    async fn update_payment_status(
        &self,
        system_id: &str,
        status: PaymentStatus,
    ) -> StoreResult<Option<PaymentStatus>> {
        // The row lock taken by FOR UPDATE serialises concurrent webhook deliveries.
        let previous: Option<(String,)> = sqlx::query_as(
            r#"
            UPDATE payments p
            SET status = $2, updated_at = now()
            FROM (SELECT id, status FROM payments WHERE payment_system_id = $1 FOR UPDATE) old
            WHERE p.id = old.id
            RETURNING old.status
            "#,
        )
        .bind(system_id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;
        previous.map(|(s,)| s.parse()).transpose()
    }

    async fn list_payments_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Payment>> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    async fn get_user_subscription(&self, user_id: Uuid) -> StoreResult<Option<Subscription>> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, user_id, plan_id, start_date, end_date, is_active
            FROM subscriptions
            WHERE user_id = $1
            ORDER BY end_date DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Subscription::from))
    }

    async fn save_invite(&self, invite: Invite) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO invites (id, email, role, code, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&invite.email)
        .bind(invite.role.as_str())
        .bind(&invite.code)
        .bind(invite.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
