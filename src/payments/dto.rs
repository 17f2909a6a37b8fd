//! Gateway wire types (YooKassa snake_case) and the service's own payment DTOs (camelCase).

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{PaymentStatus, PlatformTier};

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Amount {
    pub value: String,
    pub currency: String,
}

impl Amount {
    /// Renders with exactly two decimals.
    pub fn new(value: Decimal, currency: &str) -> Self {
        Self {
            value: format!("{:.2}", round_money(value)),
            currency: currency.to_string(),
        }
    }

    pub fn to_decimal(&self) -> Option<Decimal> {
        self.value.parse().ok()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmationRequest {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub return_url: String,
}

impl ConfirmationRequest {
    pub fn redirect(return_url: String) -> Self {
        Self {
            kind: "redirect",
            return_url,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Recipient {
    pub account_id: String,
    pub gateway_id: String,
    pub amount: Amount,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReceiptCustomer {
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReceiptItem {
    pub description: String,
    pub quantity: String,
    pub amount: Amount,
    pub vat_code: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub customer: ReceiptCustomer,
    pub items: Vec<ReceiptItem>,
}

/// Body of `POST /payments`. The idempotence key travels as a header, not in the body.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentRequest {
    #[serde(skip)]
    pub idempotence_key: Uuid,
    pub amount: Amount,
    pub confirmation: ConfirmationRequest,
    pub capture: bool,
    pub description: String,
    pub metadata: PaymentMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<Receipt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipients: Option<Vec<Recipient>>,
}

/// What the payer is buying. Carried to the gateway and back in payment metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scenario", rename_all = "snake_case")]
pub enum Scenario {
    #[serde(rename_all = "camelCase")]
    StudentBuysMyCourse { course_id: Uuid },
    #[serde(rename_all = "camelCase")]
    TeacherBuysPlatformAccess { platform_access_tier: PlatformTier },
    #[serde(rename_all = "camelCase")]
    StudentBuysTeacherCourseSplit { course_id: Uuid, teacher_id: Uuid },
}

impl Scenario {
    pub fn course_id(&self) -> Option<Uuid> {
        match self {
            Scenario::StudentBuysMyCourse { course_id }
            | Scenario::StudentBuysTeacherCourseSplit { course_id, .. } => Some(*course_id),
            Scenario::TeacherBuysPlatformAccess { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMetadata {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub scenario: Scenario,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmationResponse {
    #[serde(rename = "type")]
    pub kind: String,
    pub confirmation_url: Option<String>,
}

/// Payment (or refund) object as the gateway reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayPayment {
    pub id: String,
    pub status: String,
    pub amount: Option<Amount>,
    pub confirmation: Option<ConfirmationResponse>,
    pub metadata: Option<serde_json::Value>,
    /// Set on refund objects; points at the refunded payment.
    pub payment_id: Option<String>,
}

impl GatewayPayment {
    /// Gateway status mapped onto the local lifecycle.
    pub fn local_status(&self) -> PaymentStatus {
        match self.status.as_str() {
            "succeeded" => PaymentStatus::Succeeded,
            "canceled" => PaymentStatus::Canceled,
            "pending" | "waiting_for_capture" => PaymentStatus::Pending,
            _ => PaymentStatus::Failed,
        }
    }

    pub fn confirmation_url(&self) -> Option<&str> {
        self.confirmation.as_ref()?.confirmation_url.as_deref()
    }

    pub fn parse_metadata(&self) -> Result<PaymentMetadata, serde_json::Error> {
        let raw = self.metadata.clone().unwrap_or(serde_json::Value::Null);
        serde_json::from_value(raw)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookNotification {
    #[serde(rename = "type")]
    pub kind: String,
    pub event: String,
    pub object: GatewayPayment,
}

// --- service API ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub amount: Decimal,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub scenario: Scenario,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentResponse {
    pub success: bool,
    pub confirmation_url: String,
    pub payment_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    pub payment_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub is_paid: bool,
    pub status: PaymentStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn amount_always_has_two_decimals() {
        assert_eq!(Amount::new(Decimal::new(100, 0), "RUB").value, "100.00");
        assert_eq!(Amount::new(Decimal::new(1005, 3), "RUB").value, "1.01");
        assert_eq!(Amount::new(Decimal::new(95, 1), "RUB").value, "9.50");
    }

    #[test]
    fn metadata_parses_each_scenario() {
        let course = Uuid::new_v4();
        let teacher = Uuid::new_v4();
        let user = Uuid::new_v4();

        let m: PaymentMetadata = serde_json::from_value(json!({
            "userId": user, "scenario": "student_buys_teacher_course_split",
            "courseId": course, "teacherId": teacher, "courseTitle": "Rust"
        }))
        .unwrap();
        assert_eq!(m.user_id, user);
        assert_eq!(
            m.scenario,
            Scenario::StudentBuysTeacherCourseSplit { course_id: course, teacher_id: teacher }
        );
        assert_eq!(m.course_title.as_deref(), Some("Rust"));

        let m: PaymentMetadata = serde_json::from_value(json!({
            "userId": user, "scenario": "teacher_buys_platform_access", "platformAccessTier": "pro"
        }))
        .unwrap();
        assert_eq!(
            m.scenario,
            Scenario::TeacherBuysPlatformAccess { platform_access_tier: PlatformTier::Pro }
        );
    }

    #[test]
    fn metadata_rejects_missing_or_unknown_fields() {
        let user = Uuid::new_v4();
        for bad in [
            json!({ "userId": user, "scenario": "student_buys_my_course" }),
            json!({ "userId": user, "scenario": "buy_everything", "courseId": Uuid::new_v4() }),
            json!({ "userId": user, "courseId": Uuid::new_v4() }),
            json!({ "scenario": "student_buys_my_course", "courseId": Uuid::new_v4() }),
            json!({ "userId": user, "scenario": "teacher_buys_platform_access", "platformAccessTier": "gold" }),
        ] {
            assert!(serde_json::from_value::<PaymentMetadata>(bad.clone()).is_err(), "{bad}");
        }
    }

    #[test]
    fn request_serialises_in_gateway_shape() {
        let course = Uuid::new_v4();
        let req = PaymentRequest {
            idempotence_key: Uuid::new_v4(),
            amount: Amount::new(Decimal::new(10000, 2), "RUB"),
            confirmation: ConfirmationRequest::redirect("http://app.test/payment/success".into()),
            capture: true,
            description: "Rust".into(),
            metadata: PaymentMetadata {
                user_id: Uuid::new_v4(),
                scenario: Scenario::StudentBuysMyCourse { course_id: course },
                course_title: None,
                student_email: None,
            },
            receipt: None,
            recipients: None,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["amount"]["value"], "100.00");
        assert_eq!(v["confirmation"]["type"], "redirect");
        assert_eq!(v["confirmation"]["return_url"], "http://app.test/payment/success");
        assert_eq!(v["capture"], true);
        assert_eq!(v["metadata"]["scenario"], "student_buys_my_course");
        assert_eq!(v["metadata"]["courseId"], course.to_string());
        assert!(v.get("idempotence_key").is_none());
        assert!(v.get("recipients").is_none());
    }

    #[test]
    fn gateway_statuses_map_to_local() {
        let p = |status: &str| GatewayPayment {
            id: "p".into(),
            status: status.into(),
            amount: None,
            confirmation: None,
            metadata: None,
            payment_id: None,
        };
        assert_eq!(p("succeeded").local_status(), PaymentStatus::Succeeded);
        assert_eq!(p("waiting_for_capture").local_status(), PaymentStatus::Pending);
        assert_eq!(p("canceled").local_status(), PaymentStatus::Canceled);
        assert_eq!(p("weird").local_status(), PaymentStatus::Failed);
    }
}
