//! Payment creation, status sync and webhook processing.

use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{
        round_money, Amount, ConfirmationRequest, CreatePaymentRequest, CreatePaymentResponse,
        GatewayPayment, PaymentMetadata, PaymentRequest, Receipt, ReceiptCustomer, ReceiptItem,
        Recipient, Scenario, VerifyPaymentResponse, WebhookNotification,
    },
    gateway::GatewayError,
    split::split_shares,
};
use crate::{
    access::services::{grant_for_payment, Granted},
    auth::extractors::Identity,
    email::templates,
    error::{AppError, AppResult},
    state::AppState,
    store::{NewPayment, PaymentStatus, Role, User},
};

/// YooKassa caps receipt item descriptions at 128 characters.
const RECEIPT_DESCRIPTION_MAX: usize = 128;
/// "Full VAT-exempt" receipt code.
const RECEIPT_VAT_CODE: u8 = 1;

pub(crate) fn is_valid_payment_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn receipt(email: &str, description: &str, amount: &Amount) -> Receipt {
    Receipt {
        customer: ReceiptCustomer {
            email: email.to_string(),
        },
        items: vec![ReceiptItem {
            description: description.chars().take(RECEIPT_DESCRIPTION_MAX).collect(),
            quantity: "1.00".into(),
            amount: amount.clone(),
            vat_code: RECEIPT_VAT_CODE,
        }],
    }
}

struct Priced {
    amount: Decimal,
    currency: String,
    description: String,
    course_title: Option<String>,
    recipients: Vec<Recipient>,
}

/// Resolves what is being bought and who gets paid. Rejects anything the caller may not buy.
async fn price(state: &AppState, payer: &User, req: &CreatePaymentRequest) -> AppResult<Priced> {
    let store = state.store.as_ref();
    let cfg = &state.config.yookassa;
    let amount = round_money(req.amount);
    if amount <= Decimal::ZERO {
        return Err(AppError::validation("Amount must be positive"));
    }
    let platform_recipient = |value: Decimal, currency: &str| Recipient {
        account_id: cfg.shop_id.clone(),
        gateway_id: cfg.platform_gateway_id.clone(),
        amount: Amount::new(value, currency),
    };

    match &req.scenario {
        Scenario::StudentBuysMyCourse { course_id }
        | Scenario::StudentBuysTeacherCourseSplit { course_id, .. } => {
            let course = store
                .get_course_by_id(*course_id)
                .await?
                .filter(|c| c.is_published && !c.is_archived)
                .ok_or_else(|| AppError::not_found("Course not found"))?;
            if round_money(course.price) != amount {
                return Err(AppError::validation("Amount does not match the course price"));
            }
            if payer.purchased_course_ids.contains(&course.id) {
                return Err(AppError::conflict("Course already purchased"));
            }
            let currency = if course.currency.is_empty() {
                cfg.currency.clone()
            } else {
                course.currency.clone()
            };

            let recipients = match &req.scenario {
                Scenario::StudentBuysTeacherCourseSplit { teacher_id, .. } => {
                    if *teacher_id != course.instructor_id {
                        return Err(AppError::validation("teacherId does not match the course instructor"));
                    }
                    let teacher = store
                        .get_user_by_id(*teacher_id)
                        .await?
                        .ok_or_else(|| AppError::not_found("Teacher not found"))?;
                    let (Some(account_id), Some(gateway_id)) =
                        (teacher.payout_account_id, teacher.payout_gateway_id)
                    else {
                        return Err(AppError::not_found("Teacher payout account is not configured"));
                    };
                    let shares = split_shares(amount);
                    vec![
                        platform_recipient(shares.platform, &currency),
                        Recipient {
                            account_id,
                            gateway_id,
                            amount: Amount::new(shares.instructor, &currency),
                        },
                    ]
                }
                _ => vec![platform_recipient(amount, &currency)],
            };

            Ok(Priced {
                amount,
                description: req
                    .description
                    .clone()
                    .unwrap_or_else(|| format!("Course purchase: {}", course.title)),
                course_title: Some(course.title),
                currency,
                recipients,
            })
        }
        Scenario::TeacherBuysPlatformAccess { platform_access_tier } => {
            if payer.role != Role::Teacher {
                return Err(AppError::forbidden("Only teachers can buy platform access"));
            }
            let Some(list_price) = platform_access_tier.price() else {
                return Err(AppError::validation("The free tier cannot be purchased"));
            };
            if list_price != amount {
                return Err(AppError::validation("Amount does not match the tier price"));
            }
            let currency = cfg.currency.clone();
            Ok(Priced {
                amount,
                description: req
                    .description
                    .clone()
                    .unwrap_or_else(|| format!("Platform access: {}", platform_access_tier)),
                course_title: None,
                recipients: vec![platform_recipient(amount, &currency)],
                currency,
            })
        }
    }
}

/// Creates a gateway payment for the caller and records it locally as pending.
pub async fn create_payment(
    state: &AppState,
    identity: &Identity,
    req: CreatePaymentRequest,
) -> AppResult<CreatePaymentResponse> {
    let payer = state
        .store
        .get_user_by_id(identity.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    let priced = price(state, &payer, &req).await?;

    let amount = Amount::new(priced.amount, &priced.currency);
    let request = PaymentRequest {
        idempotence_key: Uuid::new_v4(),
        receipt: Some(receipt(&payer.email, &priced.description, &amount)),
        amount,
        confirmation: ConfirmationRequest::redirect(format!("{}/payment/success", state.config.app_url)),
        capture: true,
        description: priced.description,
        metadata: PaymentMetadata {
            user_id: payer.id,
            scenario: req.scenario,
            course_title: priced.course_title,
            student_email: Some(payer.email.clone()),
        },
        recipients: Some(priced.recipients),
    };

    let created = state.gateway.create_payment(&request).await?;
    let confirmation_url = created
        .confirmation_url()
        .ok_or_else(|| GatewayError::Decode("payment has no confirmation url".into()))?
        .to_string();

    state
        .store
        .create_payment(NewPayment {
            user_id: payer.id,
            amount: priced.amount,
            currency: priced.currency,
            payment_system_id: created.id.clone(),
            status: created.local_status(),
        })
        .await?;

    info!(user_id = %payer.id, payment_id = %created.id, "payment created");
    Ok(CreatePaymentResponse {
        success: true,
        confirmation_url,
        payment_id: created.id,
    })
}

/// Syncs a payment's status from the gateway. A newly succeeded payment is granted here
/// exactly as the webhook would grant it.
pub async fn verify_payment(
    state: &AppState,
    identity: &Identity,
    payment_id: &str,
) -> AppResult<VerifyPaymentResponse> {
    if !is_valid_payment_id(payment_id) {
        return Err(AppError::validation("Invalid payment id"));
    }

    let local = state.store.get_payment_by_system_id(payment_id).await?;
    match &local {
        Some(p) if p.user_id != identity.user_id && !identity.is_admin() => {
            warn!(payment_id = %payment_id, user_id = %identity.user_id, "payment belongs to another user");
            return Err(AppError::forbidden("Forbidden"));
        }
        None if !identity.is_admin() => return Err(AppError::not_found("Payment not found")),
        Some(p) if p.status == PaymentStatus::Succeeded => {
            return Ok(VerifyPaymentResponse {
                success: true,
                is_paid: true,
                status: PaymentStatus::Succeeded,
            });
        }
        _ => {}
    }

    let remote = state.gateway.get_payment(payment_id).await?;
    let status = remote.local_status();
    if status == PaymentStatus::Succeeded {
        process_success(state, &remote).await?;
    } else if local.as_ref().map(|p| p.status) != Some(status) {
        state.store.update_payment_status(payment_id, status).await?;
    }

    let paid = status == PaymentStatus::Succeeded;
    Ok(VerifyPaymentResponse {
        success: paid,
        is_paid: paid,
        status,
    })
}

#[derive(Debug, PartialEq, Eq)]
pub enum Processed {
    Granted(Granted),
    AlreadyProcessed,
    StatusSynced(PaymentStatus),
    Ignored,
}

impl Processed {
    pub fn message(&self) -> &'static str {
        match self {
            Processed::Granted(_) => "Payment processed and access granted",
            Processed::AlreadyProcessed => "Payment already processed",
            Processed::StatusSynced(_) => "Payment status updated",
            Processed::Ignored => "Webhook processed",
        }
    }
}

/// Applies a verified gateway notification.
pub async fn handle_notification(
    state: &AppState,
    notification: &WebhookNotification,
) -> AppResult<Processed> {
    let object = &notification.object;
    match (notification.event.as_str(), object.status.as_str()) {
        ("payment.succeeded", "succeeded") => process_success(state, object).await,
        ("payment.canceled", _) | (_, "canceled") => {
            sync_status(state, &object.id, PaymentStatus::Canceled).await
        }
        ("refund.succeeded", _) => {
            let Some(payment_id) = object.payment_id.as_deref() else {
                return Err(AppError::validation("Refund notification without payment_id"));
            };
            sync_status(state, payment_id, PaymentStatus::Refunded).await
        }
        (event, status) => {
            info!(event = %event, status = %status, payment_id = %object.id, "webhook event ignored");
            Ok(Processed::Ignored)
        }
    }
}

async fn sync_status(state: &AppState, payment_id: &str, status: PaymentStatus) -> AppResult<Processed> {
    match state.store.update_payment_status(payment_id, status).await? {
        Some(previous) => info!(payment_id = %payment_id, from = %previous, to = %status, "payment status synced"),
        None => warn!(payment_id = %payment_id, "status update for unknown payment"),
    }
    Ok(Processed::StatusSynced(status))
}

/// Marks the payment succeeded and grants the paid entitlement once.
///
/// The previous local status is the dedup key: a payment already `succeeded` is a redelivery
/// and grants nothing. Without a local row the access token linked to the payment plays that role. If the grant fails the status is put back so a retry can apply it.
async fn process_success(state: &AppState, payment: &GatewayPayment) -> AppResult<Processed> {
    let store = state.store.as_ref();
    let meta = payment.parse_metadata().map_err(|e| {
        warn!(payment_id = %payment.id, error = %e, "payment metadata rejected");
        AppError::validation("Missing or invalid payment metadata")
    })?;

    let user = store
        .get_user_by_id(meta.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let previous = store
        .update_payment_status(&payment.id, PaymentStatus::Succeeded)
        .await?;
    if previous == Some(PaymentStatus::Succeeded) {
        info!(payment_id = %payment.id, "duplicate success notification acknowledged");
        return Ok(Processed::AlreadyProcessed);
    }
    // Payments with no local row leave only the grant record behind.
    if previous.is_none() {
        if let Some(token) = store.get_access_token_by_payment_id(&payment.id).await? {
            info!(payment_id = %payment.id, token_id = %token.id, "payment already granted");
            return Ok(Processed::AlreadyProcessed);
        }
    }

    let granted = match grant_for_payment(store, &user, &meta.scenario, &payment.id).await {
        Ok((_, granted)) => granted,
        Err(e) => {
            if let Some(previous) = previous {
                if let Err(revert) = store.update_payment_status(&payment.id, previous).await {
                    warn!(payment_id = %payment.id, error = %revert, "could not restore payment status");
                }
            }
            return Err(e);
        }
    };

    notify_buyer(state, &user, &meta, &granted).await;
    Ok(Processed::Granted(granted))
}

async fn notify_buyer(state: &AppState, user: &User, meta: &PaymentMetadata, granted: &Granted) {
    let to = meta.student_email.as_deref().unwrap_or(&user.email);
    let dashboard_url = format!("{}{}", state.config.app_url, user.role.dashboard_path());
    let message = match (granted, &meta.scenario) {
        (Granted::StudentSlots { slots, .. }, Scenario::TeacherBuysPlatformAccess { platform_access_tier }) => {
            templates::platform_access_granted(
                to,
                &user.username,
                platform_access_tier.as_str(),
                *slots,
                &dashboard_url,
            )
        }
        _ => {
            let title = meta.course_title.as_deref().unwrap_or("your course");
            templates::course_purchased(to, &user.username, title, &dashboard_url)
        }
    };
    if let Err(e) = state.mailer.send(&message).await {
        warn!(user_id = %user.id, error = %e, "purchase notification not sent");
    } else {
        info!(user_id = %user.id, "purchase notification sent");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{PlatformTier, Store};
    use crate::testing::TestHarness;
    use serde_json::json;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn identity(user: &User) -> Identity {
        Identity {
            user_id: user.id,
            role: user.role,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }

    fn succeeded(id: &str, metadata: serde_json::Value) -> WebhookNotification {
        serde_json::from_value(json!({
            "type": "notification",
            "event": "payment.succeeded",
            "object": { "id": id, "status": "succeeded", "metadata": metadata }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn split_payment_sends_both_recipients() {
        let h = TestHarness::new();
        let teacher = h.payout_teacher("t@example.com").await;
        let student = h.user("s@example.com", Role::Student).await;
        let course = h.course(&teacher, "10.05").await;

        let res = create_payment(
            &h.state,
            &identity(&student),
            CreatePaymentRequest {
                amount: d("10.05"),
                description: None,
                scenario: Scenario::StudentBuysTeacherCourseSplit {
                    course_id: course.id,
                    teacher_id: teacher.id,
                },
            },
        )
        .await
        .unwrap();
        assert_eq!(res.payment_id, "pay_1");
        assert_eq!(res.confirmation_url, "https://gateway.test/confirm/pay_1");

        let sent = &h.gateway.requests().await[0];
        assert_eq!(sent.amount.value, "10.05");
        assert_eq!(sent.confirmation.return_url, "http://app.test/payment/success");
        let recipients = sent.recipients.as_ref().unwrap();
        assert_eq!(recipients[0].gateway_id, "gw-platform");
        assert_eq!(recipients[0].amount.value, "1.00");
        assert_eq!(recipients[1].gateway_id, "gw-teacher");
        assert_eq!(recipients[1].amount.value, "9.05");
        assert_eq!(sent.receipt.as_ref().unwrap().customer.email, "s@example.com");

        let local = h.store.get_payment_by_system_id("pay_1").await.unwrap().unwrap();
        assert_eq!(local.status, PaymentStatus::Pending);
        assert_eq!(local.user_id, student.id);
    }

    #[tokio::test]
    async fn creation_rejects_bad_requests() {
        let h = TestHarness::new();
        let teacher = h.user("t@example.com", Role::Teacher).await;
        let other = h.payout_teacher("o@example.com").await;
        let student = h.user("s@example.com", Role::Student).await;
        let course = h.course(&teacher, "100.00").await;

        let wrong_amount = create_payment(
            &h.state,
            &identity(&student),
            CreatePaymentRequest {
                amount: d("1.00"),
                description: None,
                scenario: Scenario::StudentBuysMyCourse { course_id: course.id },
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(wrong_amount, AppError::Validation(_)));

        let wrong_teacher = create_payment(
            &h.state,
            &identity(&student),
            CreatePaymentRequest {
                amount: d("100.00"),
                description: None,
                scenario: Scenario::StudentBuysTeacherCourseSplit {
                    course_id: course.id,
                    teacher_id: other.id,
                },
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(wrong_teacher, AppError::Validation(_)));

        let no_payout = create_payment(
            &h.state,
            &identity(&student),
            CreatePaymentRequest {
                amount: d("100.00"),
                description: None,
                scenario: Scenario::StudentBuysTeacherCourseSplit {
                    course_id: course.id,
                    teacher_id: teacher.id,
                },
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(no_payout, AppError::NotFound(_)));

        let student_tier = create_payment(
            &h.state,
            &identity(&student),
            CreatePaymentRequest {
                amount: d("990.00"),
                description: None,
                scenario: Scenario::TeacherBuysPlatformAccess {
                    platform_access_tier: PlatformTier::Pro,
                },
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(student_tier, AppError::Forbidden(_)));

        assert!(h.gateway.requests().await.is_empty());
    }

    #[tokio::test]
    async fn platform_tier_must_be_paid_at_list_price() {
        let h = TestHarness::new();
        let teacher = h.user("t@example.com", Role::Teacher).await;
        let tier_request = |amount: &str, tier| CreatePaymentRequest {
            amount: d(amount),
            description: None,
            scenario: Scenario::TeacherBuysPlatformAccess {
                platform_access_tier: tier,
            },
        };

        let cheap = create_payment(&h.state, &identity(&teacher), tier_request("0.01", PlatformTier::Enterprise))
            .await
            .unwrap_err();
        assert!(matches!(cheap, AppError::Validation(_)));
        let free = create_payment(&h.state, &identity(&teacher), tier_request("0.00", PlatformTier::Free))
            .await
            .unwrap_err();
        assert!(matches!(free, AppError::Validation(_)));
        assert!(h.gateway.requests().await.is_empty());

        create_payment(&h.state, &identity(&teacher), tier_request("4990.00", PlatformTier::Enterprise))
            .await
            .unwrap();
        let sent = h.gateway.requests().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].amount.value, "4990.00");
    }

    #[tokio::test]
    async fn gateway_failure_is_upstream_and_records_nothing() {
        let h = TestHarness::new();
        let teacher = h.user("t@example.com", Role::Teacher).await;
        h.gateway.fail_create(true).await;

        let err = create_payment(
            &h.state,
            &identity(&teacher),
            CreatePaymentRequest {
                amount: d("990.00"),
                description: Some("Pro plan".into()),
                scenario: Scenario::TeacherBuysPlatformAccess {
                    platform_access_tier: PlatformTier::Pro,
                },
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
        assert!(h.store.list_payments_by_user(teacher.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_success_grants_slots_once() {
        let h = TestHarness::new();
        let teacher = h.user("t@example.com", Role::Teacher).await;
        let res = create_payment(
            &h.state,
            &identity(&teacher),
            CreatePaymentRequest {
                amount: d("500.00"),
                description: None,
                scenario: Scenario::TeacherBuysPlatformAccess {
                    platform_access_tier: PlatformTier::Basic,
                },
            },
        )
        .await
        .unwrap();

        let note = succeeded(
            &res.payment_id,
            json!({ "userId": teacher.id, "scenario": "teacher_buys_platform_access", "platformAccessTier": "basic" }),
        );
        let (a, b) = tokio::join!(
            handle_notification(&h.state, &note),
            handle_notification(&h.state, &note)
        );
        let outcomes = [a.unwrap(), b.unwrap()];
        assert!(outcomes.contains(&Processed::AlreadyProcessed));
        assert!(outcomes.contains(&Processed::Granted(Granted::StudentSlots { slots: 10, balance: 10 })));

        let stored = h.store.get_user_by_id(teacher.id).await.unwrap().unwrap();
        assert_eq!(stored.student_slots_available, 10);
        assert_eq!(stored.platform_access_tier, Some(PlatformTier::Basic));
        assert_eq!(h.mailer.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn course_success_enrols_and_mail_failure_is_tolerated() {
        let h = TestHarness::new();
        let teacher = h.user("t@example.com", Role::Teacher).await;
        let student = h.user("s@example.com", Role::Student).await;
        let course = h.course(&teacher, "100.00").await;
        h.mailer.fail_next(true).await;

        let out = handle_notification(
            &h.state,
            &succeeded(
                "ext-1",
                json!({ "userId": student.id, "scenario": "student_buys_my_course", "courseId": course.id }),
            ),
        )
        .await
        .unwrap();
        assert_eq!(out, Processed::Granted(Granted::Course { course_id: course.id }));

        let stored = h.store.get_user_by_id(student.id).await.unwrap().unwrap();
        assert_eq!(stored.purchased_course_ids, vec![course.id]);
        let tokens = h.store.list_access_tokens_by_user(student.id).await.unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].payment_id.as_deref(), Some("ext-1"));
    }

    #[tokio::test]
    async fn bad_metadata_and_unknown_user() {
        let h = TestHarness::new();
        let err = handle_notification(&h.state, &succeeded("p", json!({ "scenario": "student_buys_my_course" })))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = handle_notification(
            &h.state,
            &succeeded(
                "p",
                json!({ "userId": Uuid::new_v4(), "scenario": "student_buys_my_course", "courseId": Uuid::new_v4() }),
            ),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn failed_grant_restores_pending_status() {
        let h = TestHarness::new();
        let student = h.user("s@example.com", Role::Student).await;
        h.store
            .create_payment(NewPayment {
                user_id: student.id,
                amount: d("990.00"),
                currency: "RUB".into(),
                payment_system_id: "p-1".into(),
                status: PaymentStatus::Pending,
            })
            .await
            .unwrap();

        // A student cannot hold student slots, so the grant conflicts.
        let err = handle_notification(
            &h.state,
            &succeeded(
                "p-1",
                json!({ "userId": student.id, "scenario": "teacher_buys_platform_access", "platformAccessTier": "pro" }),
            ),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        let local = h.store.get_payment_by_system_id("p-1").await.unwrap().unwrap();
        assert_eq!(local.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn cancel_and_refund_sync_status() {
        let h = TestHarness::new();
        let student = h.user("s@example.com", Role::Student).await;
        h.store
            .create_payment(NewPayment {
                user_id: student.id,
                amount: d("100.00"),
                currency: "RUB".into(),
                payment_system_id: "p-2".into(),
                status: PaymentStatus::Succeeded,
            })
            .await
            .unwrap();

        let refund: WebhookNotification = serde_json::from_value(json!({
            "type": "notification",
            "event": "refund.succeeded",
            "object": { "id": "rf-1", "status": "succeeded", "payment_id": "p-2" }
        }))
        .unwrap();
        assert_eq!(
            handle_notification(&h.state, &refund).await.unwrap(),
            Processed::StatusSynced(PaymentStatus::Refunded)
        );
        let local = h.store.get_payment_by_system_id("p-2").await.unwrap().unwrap();
        assert_eq!(local.status, PaymentStatus::Refunded);
    }

    #[tokio::test]
    async fn verify_grants_when_gateway_reports_success() {
        let h = TestHarness::new();
        let teacher = h.user("t@example.com", Role::Teacher).await;
        let student = h.user("s@example.com", Role::Student).await;
        let course = h.course(&teacher, "100.00").await;
        let res = create_payment(
            &h.state,
            &identity(&student),
            CreatePaymentRequest {
                amount: d("100.00"),
                description: None,
                scenario: Scenario::StudentBuysMyCourse { course_id: course.id },
            },
        )
        .await
        .unwrap();

        let pending = verify_payment(&h.state, &identity(&student), &res.payment_id).await.unwrap();
        assert!(!pending.is_paid);
        assert_eq!(pending.status, PaymentStatus::Pending);

        h.gateway.set_status(&res.payment_id, "succeeded").await;
        let paid = verify_payment(&h.state, &identity(&student), &res.payment_id).await.unwrap();
        assert!(paid.is_paid);
        let stored = h.store.get_user_by_id(student.id).await.unwrap().unwrap();
        assert_eq!(stored.purchased_course_ids, vec![course.id]);

        // Another user may not poke at it.
        let err = verify_payment(&h.state, &identity(&teacher), &res.payment_id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn payment_id_charset() {
        assert!(is_valid_payment_id("2d9b7c1e-000f-5000-8000-1a2b3c4d5e6f"));
        assert!(!is_valid_payment_id(""));
        assert!(!is_valid_payment_id("../payments"));
        assert!(!is_valid_payment_id("a b"));
    }
}
