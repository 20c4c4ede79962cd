use crate::{
    db_types::{Order, Payment},
    traits::OrderFlowError,
};

/// Read access to orders and payment records. None of these methods apply access control; that is the job of
/// [`crate::OrderQueryApi`].
#[allow(async_fn_in_trait)]
pub trait OrderQueries {
    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, OrderFlowError>;

    /// All orders placed by `user_id`, newest first.
    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderFlowError>;

    /// Every order in the system, newest first.
    async fn fetch_all_orders(&self) -> Result<Vec<Order>, OrderFlowError>;

    /// The most recently updated payment record carrying the given correlation id.
    async fn fetch_latest_payment(&self, correlation_id: &str) -> Result<Option<Payment>, OrderFlowError>;

    async fn fetch_payments_for_order(&self, order_id: i64) -> Result<Vec<Payment>, OrderFlowError>;
}
