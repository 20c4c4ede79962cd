use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderStatusType, Payment, PaymentStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: Order,
}

impl OrderCreatedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub old_status: OrderStatusType,
    /// The order after the change.
    pub order: Order,
    /// User id of the admin who made the change.
    pub changed_by: i64,
}

impl OrderStatusChangedEvent {
    pub fn new(old_status: OrderStatusType, order: Order, changed_by: i64) -> Self {
        Self { old_status, order, changed_by }
    }
}

/// Emitted when a provider report actually changed a payment. Replays do not produce this event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentOutcomeEvent {
    pub order: Order,
    pub payment: Payment,
    pub previous_status: Option<PaymentStatus>,
}

impl PaymentOutcomeEvent {
    pub fn new(order: Order, payment: Payment, previous_status: Option<PaymentStatus>) -> Self {
        Self { order, payment, previous_status }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventType {
    OrderCreated(OrderCreatedEvent),
    OrderStatusChanged(OrderStatusChangedEvent),
    PaymentOutcome(PaymentOutcomeEvent),
}
