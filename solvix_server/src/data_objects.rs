use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solvix_common::Cents;
use solvix_engine::db_types::{OrderStatusType, PaymentStatus, RequirementsDocument, User};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderRequest {
    pub service_id: i64,
    /// In cents
    pub total_price: Cents,
    #[serde(default)]
    pub requirements: Option<RequirementsDocument>,
}

/// Either field may be omitted. When both are present, the requirements are saved before the status changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateOrderRequest {
    #[serde(default)]
    pub status: Option<OrderStatusType>,
    #[serde(default)]
    pub requirements: Option<RequirementsDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentItem {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIntentRequest {
    /// In cents
    pub amount: Cents,
    pub items: Vec<IntentItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentResponse {
    pub client_secret: String,
    pub order_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusResponse {
    pub status: PaymentStatus,
    pub order_id: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResponse {
    pub message: String,
    pub status: PaymentStatus,
}

impl VerificationResponse {
    pub fn submitted() -> Self {
        Self { message: "Payment verification submitted".into(), status: PaymentStatus::Pending }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StripeConfigResponse {
    pub publishable_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookReceipt {
    pub received: bool,
}

impl WebhookReceipt {
    pub fn received() -> Self {
        Self { received: true }
    }
}
