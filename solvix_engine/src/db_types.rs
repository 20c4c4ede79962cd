use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
pub use solvix_common::Cents;
use sqlx::{FromRow, Type};
use thiserror::Error;

use crate::helpers::{is_valid_email, ValidationError};

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
/// The administrative lifecycle status of an order.
///
/// Status changes are only legal along the edges returned by [`OrderStatusType::allowed_transitions`]:
/// ```text
/// pending     -> in-progress, cancelled
/// in-progress -> completed, on-hold
/// on-hold     -> in-progress, cancelled
/// completed   -> (terminal)
/// cancelled   -> (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatusType {
    /// Newly created. Every order starts here.
    Pending,
    /// An admin has started work on the order.
    InProgress,
    /// Work has been delivered.
    Completed,
    /// Work is paused, usually waiting on the customer.
    OnHold,
    /// The order was abandoned by the customer or an admin.
    Cancelled,
}

impl OrderStatusType {
    pub const ALL: [OrderStatusType; 5] =
        [Self::Pending, Self::InProgress, Self::Completed, Self::OnHold, Self::Cancelled];

    pub fn allowed_transitions(&self) -> &'static [OrderStatusType] {
        use OrderStatusType::*;
        match self {
            Pending => &[InProgress, Cancelled],
            InProgress => &[Completed, OnHold],
            OnHold => &[InProgress, Cancelled],
            Completed | Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, target: OrderStatusType) -> bool {
        self.allowed_transitions().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatusType::Pending => "pending",
            OrderStatusType::InProgress => "in-progress",
            OrderStatusType::Completed => "completed",
            OrderStatusType::OnHold => "on-hold",
            OrderStatusType::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in-progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "on-hold" => Ok(Self::OnHold),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------     PaymentState      ---------------------------------------------------------
/// Payment progress of an order, tracked separately from [`OrderStatusType`]. Only the payment outcome path writes
/// this field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentState {
    #[default]
    Unverified,
    Confirmed,
    Failed,
}

impl Display for PaymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentState::Unverified => f.write_str("unverified"),
            PaymentState::Confirmed => f.write_str("confirmed"),
            PaymentState::Failed => f.write_str("failed"),
        }
    }
}

//--------------------------------------     PaymentStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Confirmed,
    Failed,
}

/// The final result of a payment attempt, as reported by a payment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentOutcome {
    Succeeded,
    Failed,
}

impl PaymentStatus {
    /// Works out the payment status after applying `outcome`. Returns `None` when nothing should change.
    ///
    /// * `pending` moves to whatever the provider reports.
    /// * `failed` can still become `confirmed` (the customer retried the charge and it went through).
    /// * `confirmed` is final. A late failure report for a confirmed payment is ignored.
    /// * Reporting the current state again is a no-op, which makes provider replays harmless.
    pub fn apply_outcome(&self, outcome: PaymentOutcome) -> Option<PaymentStatus> {
        use PaymentStatus::*;
        match (self, outcome) {
            (Pending, PaymentOutcome::Succeeded) | (Failed, PaymentOutcome::Succeeded) => Some(Confirmed),
            (Pending, PaymentOutcome::Failed) => Some(Failed),
            (Confirmed, _) | (Failed, PaymentOutcome::Failed) => None,
        }
    }

    pub fn payment_state(&self) -> PaymentState {
        match self {
            PaymentStatus::Pending => PaymentState::Unverified,
            PaymentStatus::Confirmed => PaymentState::Confirmed,
            PaymentStatus::Failed => PaymentState::Failed,
        }
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => f.write_str("pending"),
            PaymentStatus::Confirmed => f.write_str("confirmed"),
            PaymentStatus::Failed => f.write_str("failed"),
        }
    }
}

//--------------------------------------  RequirementsDocument ---------------------------------------------------------
/// The project brief a customer attaches to an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RequirementsDocument {
    pub project_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_colors: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_requirements: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosting_preference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical_contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technologies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scalability_requirements: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_requirements: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_features: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_requirements: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_control: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub containerization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_timeline: Option<String>,
}

impl RequirementsDocument {
    pub fn new<S: Into<String>>(project_name: S) -> Self {
        Self { project_name: project_name.into(), ..Default::default() }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.project_name.trim().is_empty() {
            return Err(ValidationError::new("projectName is required"));
        }
        if let Some(email) = self.contact_email.as_deref().filter(|e| !e.is_empty()) {
            if !is_valid_email(email) {
                return Err(ValidationError::new(format!("contactEmail is not a valid email address: {email}")));
            }
        }
        Ok(())
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub service_id: i64,
    pub status: OrderStatusType,
    pub payment_state: PaymentState,
    pub total_price: Cents,
    pub requirements: Option<RequirementsDocument>,
    /// Incremented on every status write.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: i64,
    pub service_id: i64,
    pub total_price: Cents,
    pub requirements: Option<RequirementsDocument>,
}

impl NewOrder {
    pub fn new(user_id: i64, service_id: i64, total_price: Cents) -> Self {
        Self { user_id, service_id, total_price, requirements: None }
    }

    pub fn with_requirements(mut self, requirements: RequirementsDocument) -> Self {
        self.requirements = Some(requirements);
        self
    }
}

//--------------------------------------        Payment        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: i64,
    /// The order this payment pays for. Crypto claims are not linked to an order.
    pub order_id: Option<i64>,
    /// The key that clients use to poll the payment status.
    pub correlation_id: String,
    pub amount: Cents,
    pub status: PaymentStatus,
    pub payment_provider: String,
    pub provider_order_id: String,
    pub customer_email: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const CARD_PROVIDER: &str = "stripe";

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_id: Option<i64>,
    pub correlation_id: String,
    pub amount: Cents,
    pub status: PaymentStatus,
    pub payment_provider: String,
    pub provider_order_id: String,
    pub customer_email: Option<String>,
    pub metadata: serde_json::Value,
}

impl NewPayment {
    /// A pending card payment for `order`, identified by the provider's payment intent id.
    pub fn card(order: &Order, intent_id: &str, metadata: serde_json::Value) -> Self {
        Self {
            order_id: Some(order.id),
            correlation_id: order.id.to_string(),
            amount: order.total_price,
            status: PaymentStatus::Pending,
            payment_provider: CARD_PROVIDER.to_string(),
            provider_order_id: intent_id.to_string(),
            customer_email: None,
            metadata,
        }
    }

    pub fn with_customer_email<S: Into<String>>(mut self, email: S) -> Self {
        self.customer_email = Some(email.into());
        self
    }
}

//--------------------------------------     CryptoMethod      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CryptoMethod {
    Btc,
    Eth,
    Usdt,
}

impl Display for CryptoMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CryptoMethod::Btc => f.write_str("BTC"),
            CryptoMethod::Eth => f.write_str("ETH"),
            CryptoMethod::Usdt => f.write_str("USDT"),
        }
    }
}

impl FromStr for CryptoMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BTC" => Ok(Self::Btc),
            "ETH" => Ok(Self::Eth),
            "USDT" => Ok(Self::Usdt),
            _ => Err(ConversionError(format!("Unsupported crypto payment method: {s}"))),
        }
    }
}

//--------------------------------------     Notification      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Unread,
    Read,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub message: String,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub user_id: i64,
    pub title: String,
    pub message: String,
}

impl NewNotification {
    /// The note sent to an order's owner whenever an admin moves the order to a new status.
    pub fn order_status_updated(order: &Order, status: OrderStatusType) -> Self {
        Self {
            user_id: order.user_id,
            title: "Order Status Updated".to_string(),
            message: format!("Your order #{} status has been updated to {status}", order.id),
        }
    }
}

/// Title and message of the note every admin receives when an order is placed.
pub fn new_order_notice(order_id: i64) -> (String, String) {
    ("New Order Received".to_string(), format!("New order #{order_id} has been created"))
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct OutboxEntry {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub message: String,
    pub attempts: i64,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------         User          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------        Service        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub base_price: Cents,
    #[serde(rename = "type")]
    pub service_type: String,
    pub features: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewService {
    pub name: String,
    pub description: String,
    pub base_price: Cents,
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub features: Option<String>,
}

//--------------------------------------         Actor         ---------------------------------------------------------
/// The authenticated caller of an engine operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
    pub is_admin: bool,
}

impl Actor {
    pub fn user(user_id: i64) -> Self {
        Self { user_id, is_admin: false }
    }

    pub fn admin(user_id: i64) -> Self {
        Self { user_id, is_admin: true }
    }

    /// Admins can act on any order. Everyone else only on their own.
    pub fn can_access(&self, order: &Order) -> bool {
        self.is_admin || order.user_id == self.user_id
    }
}

impl Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_admin {
            write!(f, "admin #{}", self.user_id)
        } else {
            write!(f, "user #{}", self.user_id)
        }
    }
}
