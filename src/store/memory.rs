//! In-process store used by tests and `STORE_BACKEND=memory` runs.

use std::collections::{HashMap, HashSet};

use axum::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    AccessToken, Course, Invite, MagicLinkToken, NewAccessToken, NewCourse, NewPayment, NewUser,
    Payment, PaymentStatus, PlatformTier, Role, Store, StoreError, StoreResult, Subscription,
    TokenStatus, User,
};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    courses: HashMap<Uuid, Course>,
    enrolments: HashSet<(Uuid, Uuid)>,
    access_tokens: HashMap<Uuid, AccessToken>,
    magic_links: HashMap<Uuid, MagicLinkToken>,
    payments: HashMap<Uuid, Payment>,
    subscriptions: Vec<Subscription>,
    invites: Vec<Invite>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a subscription row. Subscriptions are created outside this service.
    pub async fn insert_subscription(&self, sub: Subscription) {
        self.inner.write().await.subscriptions.push(sub);
    }

    pub async fn invites(&self) -> Vec<Invite> {
        self.inner.read().await.invites.clone()
    }
}

fn sorted_by_created<T, F>(mut items: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> OffsetDateTime,
{
    items.sort_by_key(|i| std::cmp::Reverse(key(i)));
    items
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.email == new.email) {
            return Err(StoreError::Invalid(format!("email '{}' already registered", new.email)));
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            email_verified: new.email_verified,
            role: new.role,
            platform_access_tier: new.platform_access_tier,
            student_slots_available: new.student_slots_available.max(0),
            payout_account_id: None,
            payout_gateway_id: None,
            purchased_course_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: &User) -> StoreResult<User> {
        let mut inner = self.inner.write().await;
        let stored = inner.users.get_mut(&user.id).ok_or(StoreError::NotFound)?;
        if user.student_slots_available < 0 {
            return Err(StoreError::Invalid("student slots cannot be negative".into()));
        }
        let purchased = std::mem::take(&mut stored.purchased_course_ids);
        *stored = user.clone();
        stored.purchased_course_ids = purchased;
        stored.updated_at = OffsetDateTime::now_utc();
        Ok(stored.clone())
    }

    async fn update_user_role(&self, id: Uuid, role: Role) -> StoreResult<Option<User>> {
        let mut inner = self.inner.write().await;
        Ok(inner.users.get_mut(&id).map(|u| {
            u.role = role;
            u.updated_at = OffsetDateTime::now_utc();
            u.clone()
        }))
    }

    async fn mark_email_verified(&self, id: Uuid) -> StoreResult<Option<User>> {
        let mut inner = self.inner.write().await;
        Ok(inner.users.get_mut(&id).map(|u| {
            u.email_verified = true;
            u.updated_at = OffsetDateTime::now_utc();
            u.clone()
        }))
    }

    async fn add_course_to_student(&self, user_id: Uuid, course_id: Uuid) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&user_id) || !inner.courses.contains_key(&course_id) {
            return Err(StoreError::NotFound);
        }
        if !inner.enrolments.insert((user_id, course_id)) {
            return Ok(false);
        }
        if let Some(user) = inner.users.get_mut(&user_id) {
            user.purchased_course_ids.push(course_id);
        }
        if let Some(course) = inner.courses.get_mut(&course_id) {
            course.students_enrolled += 1;
        }
        Ok(true)
    }

    async fn add_student_slots_to_teacher(
        &self,
        user_id: Uuid,
        slots: u32,
    ) -> StoreResult<Option<i32>> {
        let mut inner = self.inner.write().await;
        let Some(user) = inner.users.get_mut(&user_id).filter(|u| u.role == Role::Teacher) else {
            return Ok(None);
        };
        let add = i32::try_from(slots)
            .map_err(|_| StoreError::Invalid(format!("slot increment {} too large", slots)))?;
        user.student_slots_available = user
            .student_slots_available
            .checked_add(add)
            .ok_or_else(|| StoreError::Invalid("student slot balance overflow".into()))?;
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.student_slots_available))
    }

    async fn set_platform_tier(&self, user_id: Uuid, tier: PlatformTier) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        Ok(match inner.users.get_mut(&user_id) {
            Some(u) => {
                u.platform_access_tier = Some(tier);
                u.updated_at = OffsetDateTime::now_utc();
                true
            }
            None => false,
        })
    }

    async fn get_course_by_id(&self, id: Uuid) -> StoreResult<Option<Course>> {
        Ok(self.inner.read().await.courses.get(&id).cloned())
    }

    async fn list_courses(&self, published_only: bool) -> StoreResult<Vec<Course>> {
        let inner = self.inner.read().await;
        let items = inner
            .courses
            .values()
            .filter(|c| !c.is_archived && (!published_only || c.is_published))
            .cloned()
            .collect();
        Ok(sorted_by_created(items, |c: &Course| c.created_at))
    }

    async fn list_courses_by_instructor(&self, instructor_id: Uuid) -> StoreResult<Vec<Course>> {
        let inner = self.inner.read().await;
        let items = inner
            .courses
            .values()
            .filter(|c| c.instructor_id == instructor_id)
            .cloned()
            .collect();
        Ok(sorted_by_created(items, |c: &Course| c.created_at))
    }

    async fn create_course(&self, new: NewCourse) -> StoreResult<Course> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&new.instructor_id) {
            return Err(StoreError::NotFound);
        }
        let now = OffsetDateTime::now_utc();
        let course = Course {
            id: Uuid::new_v4(),
            title: new.title,
            description: new.description,
            price: new.price,
            currency: new.currency,
            instructor_id: new.instructor_id,
            is_published: new.is_published,
            is_archived: false,
            students_enrolled: 0,
            created_at: now,
            updated_at: now,
        };
        inner.courses.insert(course.id, course.clone());
        Ok(course)
    }

    async fn set_course_published(&self, id: Uuid, published: bool) -> StoreResult<Option<Course>> {
        let mut inner = self.inner.write().await;
        Ok(inner.courses.get_mut(&id).map(|c| {
            c.is_published = published;
            c.updated_at = OffsetDateTime::now_utc();
            c.clone()
        }))
    }

    async fn create_access_token(&self, new: NewAccessToken) -> StoreResult<AccessToken> {
        let mut inner = self.inner.write().await;
        let now = OffsetDateTime::now_utc();
        let token = AccessToken {
            id: Uuid::new_v4(),
            token: new.token,
            user_id: new.user_id,
            entity_type: new.entity_type,
            entity_id: new.entity_id,
            access_details: new.access_details,
            status: new.status,
            payment_id: new.payment_id,
            generated_at: now,
            activated_at: (new.status == TokenStatus::Active).then_some(now),
            expires_at: new.expires_at,
        };
        inner.access_tokens.insert(token.id, token.clone());
        Ok(token)
    }

    async fn get_access_token_by_token(&self, token: &str) -> StoreResult<Option<AccessToken>> {
        let inner = self.inner.read().await;
        Ok(inner.access_tokens.values().find(|t| t.token == token).cloned())
    }

    async fn list_access_tokens_by_user(&self, user_id: Uuid) -> StoreResult<Vec<AccessToken>> {
        let inner = self.inner.read().await;
        let items = inner
            .access_tokens
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        Ok(sorted_by_created(items, |t: &AccessToken| t.generated_at))
    }

    async fn get_access_token_by_payment_id(
        &self,
        payment_id: &str,
    ) -> StoreResult<Option<AccessToken>> {
        let inner = self.inner.read().await;
        Ok(inner
            .access_tokens
            .values()
            .filter(|t| t.payment_id.as_deref() == Some(payment_id))
            .min_by_key(|t| t.generated_at)
            .cloned())
    }

    async fn transition_access_token(
        &self,
        id: Uuid,
        to: TokenStatus,
        at: OffsetDateTime,
    ) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let Some(token) = inner.access_tokens.get_mut(&id) else {
            return Ok(false);
        };
        if token.status != TokenStatus::Pending {
            return Ok(false);
        }
        token.status = to;
        if to == TokenStatus::Active {
            token.activated_at = Some(at);
        }
        Ok(true)
    }

    async fn create_magic_link_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> StoreResult<MagicLinkToken> {
        let mut inner = self.inner.write().await;
        let link = MagicLinkToken {
            id: Uuid::new_v4(),
            token: token.to_string(),
            user_id,
            expires_at,
            used_at: None,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.magic_links.insert(link.id, link.clone());
        Ok(link)
    }

    async fn get_magic_link_token(&self, token: &str) -> StoreResult<Option<MagicLinkToken>> {
        let inner = self.inner.read().await;
        Ok(inner.magic_links.values().find(|l| l.token == token).cloned())
    }

    async fn mark_magic_link_used(&self, id: Uuid, at: OffsetDateTime) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        Ok(match inner.magic_links.get_mut(&id) {
            Some(link) if link.used_at.is_none() => {
                link.used_at = Some(at);
                true
            }
            _ => false,
        })
    }

    async fn create_payment(&self, new: NewPayment) -> StoreResult<Payment> {
        let mut inner = self.inner.write().await;
        if inner.payments.values().any(|p| p.payment_system_id == new.payment_system_id) {
            return Err(StoreError::Invalid(format!(
                "payment '{}' already recorded",
                new.payment_system_id
            )));
        }
        let now = OffsetDateTime::now_utc();
        let payment = Payment {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            amount: new.amount,
            currency: new.currency,
            payment_system_id: new.payment_system_id,
            status: new.status,
            created_at: now,
            updated_at: now,
        };
        inner.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn get_payment_by_system_id(&self, system_id: &str) -> StoreResult<Option<Payment>> {
        let inner = self.inner.read().await;
        Ok(inner.payments.values().find(|p| p.payment_system_id == system_id).cloned())
    }

    async fn update_payment_status(
        &self,
        system_id: &str,
        status: PaymentStatus,
    ) -> StoreResult<Option<PaymentStatus>> {
        let mut inner = self.inner.write().await;
        Ok(inner
            .payments
            .values_mut()
            .find(|p| p.payment_system_id == system_id)
            .map(|p| {
                let previous = p.status;
                p.status = status;
                p.updated_at = OffsetDateTime::now_utc();
                previous
            }))
    }

    async fn list_payments_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Payment>> {
        let inner = self.inner.read().await;
        let items = inner.payments.values().filter(|p| p.user_id == user_id).cloned().collect();
        Ok(sorted_by_created(items, |p: &Payment| p.created_at))
    }

    async fn get_user_subscription(&self, user_id: Uuid) -> StoreResult<Option<Subscription>> {
        let inner = self.inner.read().await;
        Ok(inner
            .subscriptions
            .iter()
            .filter(|s| s.user_id == user_id)
            .max_by_key(|s| s.end_date)
            .cloned())
    }

    async fn save_invite(&self, invite: Invite) -> StoreResult<()> {
        self.inner.write().await.invites.push(invite);
        Ok(())
    }
}
