//! In-process doubles for the store, gateway and mailer, wired into a ready `AppState`.

use std::{collections::HashMap, str::FromStr, sync::Arc};

use async_trait::async_trait;
use axum::Router;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use crate::{
    auth::{cookies::SESSION_COOKIE, jwt::JwtKeys},
    config::AppConfig,
    email::{EmailError, EmailMessage, Mailer},
    payments::{
        dto::{ConfirmationResponse, GatewayPayment, PaymentRequest},
        gateway::{GatewayError, PaymentGateway},
    },
    state::AppState,
    store::{Course, MemoryStore, NewCourse, NewUser, Role, Store, User},
};

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    fail_next: Mutex<bool>,
}

impl RecordingMailer {
    pub async fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn fail_next(&self, fail: bool) {
        *self.fail_next.lock().await = fail;
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        let mut fail = self.fail_next.lock().await;
        if *fail {
            *fail = false;
            return Err(EmailError::SendFailed("smtp unavailable".into()));
        }
        self.sent.lock().await.push(message.clone());
        Ok(())
    }
}

/// Accepts every payment as `pending` and remembers it for later lookups.
#[derive(Default)]
pub struct FakeGateway {
    requests: Mutex<Vec<PaymentRequest>>,
    payments: Mutex<HashMap<String, GatewayPayment>>,
    fail_create: Mutex<bool>,
}

impl FakeGateway {
    pub async fn requests(&self) -> Vec<PaymentRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn fail_create(&self, fail: bool) {
        *self.fail_create.lock().await = fail;
    }

    /// Overrides what the gateway reports for `id`, as if the payer moved it along.
    pub async fn set_status(&self, id: &str, status: &str) {
        if let Some(p) = self.payments.lock().await.get_mut(id) {
            p.status = status.to_string();
        }
    }

    pub async fn payment(&self, id: &str) -> Option<GatewayPayment> {
        self.payments.lock().await.get(id).cloned()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_payment(&self, request: &PaymentRequest) -> Result<GatewayPayment, GatewayError> {
        if *self.fail_create.lock().await {
            return Err(GatewayError::Api {
                status: 400,
                body: r#"{"type":"error","code":"invalid_request"}"#.into(),
            });
        }
        let mut requests = self.requests.lock().await;
        requests.push(request.clone());
        let id = format!("pay_{}", requests.len());
        let payment = GatewayPayment {
            id: id.clone(),
            status: "pending".into(),
            amount: Some(request.amount.clone()),
            confirmation: Some(ConfirmationResponse {
                kind: "redirect".into(),
                confirmation_url: Some(format!("https://gateway.test/confirm/{id}")),
            }),
            metadata: serde_json::to_value(&request.metadata).ok(),
            payment_id: None,
        };
        self.payments.lock().await.insert(id, payment.clone());
        Ok(payment)
    }

    async fn get_payment(&self, payment_id: &str) -> Result<GatewayPayment, GatewayError> {
        self.payments
            .lock()
            .await
            .get(payment_id)
            .cloned()
            .ok_or_else(|| GatewayError::Api {
                status: 404,
                body: r#"{"type":"error","code":"not_found"}"#.into(),
            })
    }
}

pub struct TestHarness {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<FakeGateway>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestHarness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(FakeGateway::default());
        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::from_parts(
            store.clone(),
            Arc::new(AppConfig::for_tests()),
            gateway.clone(),
            mailer.clone(),
        );
        Self {
            state,
            store,
            gateway,
            mailer,
        }
    }

    pub fn app(&self) -> Router {
        crate::app::build_app(self.state.clone())
    }

    pub async fn user(&self, email: &str, role: Role) -> User {
        self.store
            .create_user(NewUser {
                role,
                email_verified: true,
                ..NewUser::student(email)
            })
            .await
            .unwrap()
    }

    /// Teacher with payout identifiers, eligible for split payments.
    pub async fn payout_teacher(&self, email: &str) -> User {
        let mut teacher = self.user(email, Role::Teacher).await;
        teacher.payout_account_id = Some("acct-teacher".into());
        teacher.payout_gateway_id = Some("gw-teacher".into());
        self.store.update_user(&teacher).await.unwrap()
    }

    pub async fn course(&self, instructor: &User, price: &str) -> Course {
        self.store
            .create_course(NewCourse {
                title: "Ownership in Practice".into(),
                description: "Borrowing without tears".into(),
                price: Decimal::from_str(price).unwrap(),
                currency: "RUB".into(),
                instructor_id: instructor.id,
                is_published: true,
            })
            .await
            .unwrap()
    }

    /// `Cookie` header value carrying a valid session for `user`.
    pub fn cookie(&self, user: &User) -> String {
        let token = JwtKeys::new(&self.state.config.jwt).sign_session(user).unwrap();
        format!("{SESSION_COOKIE}={token}")
    }
}
