use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Actor, Order, Payment},
    traits::{OrderFlowError, OrderQueries},
};

/// Read access to orders and payments, scoped to the calling [`Actor`]. Admins see everything; customers see their
/// own orders.
pub struct OrderQueryApi<B> {
    db: B,
}

impl<B> Debug for OrderQueryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderQueryApi")
    }
}

impl<B> OrderQueryApi<B>
where B: OrderQueries
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn order_for_actor(&self, order_id: i64, actor: &Actor) -> Result<Order, OrderFlowError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        if !actor.can_access(&order) {
            debug!("🔎️ {actor} tried to read order #{order_id}, which belongs to user #{}", order.user_id);
            return Err(OrderFlowError::NotAuthorized(format!("{actor} cannot view order #{order_id}")));
        }
        Ok(order)
    }

    pub async fn orders_for_actor(&self, actor: &Actor) -> Result<Vec<Order>, OrderFlowError> {
        if actor.is_admin {
            self.db.fetch_all_orders().await
        } else {
            self.db.fetch_orders_for_user(actor.user_id).await
        }
    }

    pub async fn all_orders(&self) -> Result<Vec<Order>, OrderFlowError> {
        self.db.fetch_all_orders().await
    }

    /// The latest payment record for a correlation id: the order id for card payments, or the `CRYPTO-...` id handed
    /// out for a crypto claim.
    pub async fn payment_status(&self, correlation_id: &str) -> Result<Payment, OrderFlowError> {
        self.db
            .fetch_latest_payment(correlation_id)
            .await?
            .ok_or_else(|| OrderFlowError::PaymentNotFound(correlation_id.to_string()))
    }
}
