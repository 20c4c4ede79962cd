use thiserror::Error;

use crate::{
    api::payment_objects::PaymentReport,
    db_types::{NewNotification, NewOrder, NewPayment, Order, OrderStatusType, Payment, RequirementsDocument},
    helpers::ValidationError,
    traits::{data_objects::PaymentReportResult, CatalogManagement, NotificationManagement, OrderQueries},
};

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("Order #{0} does not exist")]
    OrderNotFound(i64),
    #[error("Payment {0} does not exist")]
    PaymentNotFound(String),
    #[error("Notification #{0} does not exist")]
    NotificationNotFound(i64),
    #[error("Service #{0} does not exist")]
    ServiceNotFound(i64),
    #[error("Not authorized. {0}")]
    NotAuthorized(String),
    #[error("Cannot change order status from {current} to {requested}")]
    TransitionNotAllowed { current: OrderStatusType, requested: OrderStatusType },
    #[error("Invalid request. {0}")]
    ValidationError(String),
    #[error("Order #{0} kept changing while the status update was being applied. Try again.")]
    ConcurrentModification(i64),
}

impl From<sqlx::Error> for OrderFlowError {
    fn from(e: sqlx::Error) -> Self {
        OrderFlowError::DatabaseError(e.to_string())
    }
}

impl From<ValidationError> for OrderFlowError {
    fn from(e: ValidationError) -> Self {
        OrderFlowError::ValidationError(e.to_string())
    }
}

/// The write side of the order lifecycle.
///
/// Every method here is a single atomic unit in the backend: either all of its writes land, or none do. Business rules
/// (the transition table, ownership, document validation) live in [`crate::OrderFlowApi`]; backends only need to
/// provide the conditional writes those rules depend on.
#[allow(async_fn_in_trait)]
pub trait OrderLifecycleDatabase: Clone + OrderQueries + CatalogManagement + NotificationManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores a new order in `pending` status, and in the same transaction appends a "new order" note to the
    /// notification outbox for every admin user.
    async fn insert_order_with_admin_notices(&self, order: NewOrder) -> Result<Order, OrderFlowError>;

    /// Moves the order from `expected` to `target` and stores `notification`, atomically.
    ///
    /// The write only happens if the order is still in `expected` status. If another writer got there first, nothing
    /// is written and `None` is returned.
    async fn compare_and_set_status(
        &self,
        order_id: i64,
        expected: OrderStatusType,
        target: OrderStatusType,
        notification: NewNotification,
    ) -> Result<Option<Order>, OrderFlowError>;

    /// Replaces the requirements document on the order. The order status is left alone.
    async fn update_requirements(
        &self,
        order_id: i64,
        requirements: &RequirementsDocument,
    ) -> Result<Order, OrderFlowError>;

    /// Applies a provider's payment report to the matching payment record and the order's payment state in one
    /// transaction. See [`crate::db_types::PaymentStatus::apply_outcome`] for the state rules.
    ///
    /// The order is found via the existing payment record for `(provider, provider_order_id)`, falling back to the
    /// order id carried in the report. If neither resolves to an order, nothing is written and
    /// [`OrderFlowError::OrderNotFound`] (or [`OrderFlowError::PaymentNotFound`] when there is no order id at all) is
    /// returned.
    async fn apply_payment_report(&self, report: &PaymentReport) -> Result<PaymentReportResult, OrderFlowError>;

    /// Stores a payment record, unless one already exists for the same `(payment_provider, provider_order_id)`.
    /// Returns the stored record and `true` if it was inserted by this call.
    async fn insert_payment(&self, payment: NewPayment) -> Result<(Payment, bool), OrderFlowError>;
}
