use std::fmt::Debug;

use chrono::Utc;
use log::*;
use serde_json::json;
use solvix_common::Cents;

use crate::{
    api::{
        notification_api::NotificationApi,
        payment_objects::{CryptoClaim, PaymentReport},
    },
    db_types::{
        Actor,
        CryptoMethod,
        NewNotification,
        NewOrder,
        NewPayment,
        Order,
        OrderStatusType,
        Payment,
        PaymentOutcome,
        PaymentStatus,
        RequirementsDocument,
    },
    events::{EventProducers, OrderCreatedEvent, OrderStatusChangedEvent, PaymentOutcomeEvent},
    traits::{OrderFlowError, OrderLifecycleDatabase, PaymentReportResult},
};

/// How many times a status change is re-validated when another writer changes the order underneath it.
const MAX_STATUS_CHANGE_ATTEMPTS: usize = 3;
/// Outbox entries delivered inline right after an order is created. The dispatcher picks up anything left over.
const INLINE_OUTBOX_BATCH: i64 = 50;

/// `OrderFlowApi` is the order lifecycle manager. It is the single authority for mutating orders: it enforces the
/// status transition table, fans out notifications and applies payment provider reports.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderFlowApi<B>
where B: OrderLifecycleDatabase
{
    /// Places a new order on behalf of `actor`.
    ///
    /// The order always starts in `pending` status. Every admin gets a "New Order Received" notification. Those are
    /// queued in the same transaction as the order and delivered best-effort straight after, so a delivery problem
    /// never fails the order. Undelivered notices stay in the outbox for the dispatcher.
    pub async fn create_order(&self, actor: &Actor, order: NewOrder) -> Result<Order, OrderFlowError> {
        if order.user_id != actor.user_id && !actor.is_admin {
            return Err(OrderFlowError::NotAuthorized(format!("{actor} cannot place orders for other users")));
        }
        if !order.total_price.is_positive() {
            return Err(OrderFlowError::ValidationError(format!(
                "Total price must be positive, but was {}",
                order.total_price
            )));
        }
        if let Some(doc) = &order.requirements {
            doc.validate()?;
        }
        if self.db.fetch_service(order.service_id).await?.is_none() {
            return Err(OrderFlowError::ServiceNotFound(order.service_id));
        }
        let order = self.db.insert_order_with_admin_notices(order).await?;
        info!("🔄️📦️ Order #{} for {} created by {actor}", order.id, order.total_price);
        let notifier = NotificationApi::new(self.db.clone());
        match notifier.drain_outbox(INLINE_OUTBOX_BATCH).await {
            Ok(result) => debug!("🔄️📦️ {} admin notifications delivered for order #{}", result.delivered, order.id),
            Err(e) => warn!("🔄️📦️ Admin notifications for order #{} are delayed. {e}", order.id),
        }
        self.call_order_created_hook(&order).await;
        Ok(order)
    }

    /// Moves an order to `target` status.
    ///
    /// Only the transitions in [`OrderStatusType::allowed_transitions`] are legal. Anything else, including any
    /// change out of a terminal status, fails with [`OrderFlowError::TransitionNotAllowed`] and writes nothing.
    ///
    /// On success the new status and a notification to the order's owner are stored together. The caller is expected
    /// to have checked that `actor` is an admin.
    ///
    /// The write is conditional on the status still being the one that was validated. If another writer changed it in
    /// the meantime, the request is re-validated against the fresh status.
    pub async fn request_status_change(
        &self,
        order_id: i64,
        target: OrderStatusType,
        actor: &Actor,
    ) -> Result<Order, OrderFlowError> {
        for attempt in 1..=MAX_STATUS_CHANGE_ATTEMPTS {
            let order = self.fetch_order(order_id).await?;
            let current = order.status;
            if !current.can_transition_to(target) {
                debug!("🔄️🚦️ {actor} cannot move order #{order_id} from {current} to {target}");
                return Err(OrderFlowError::TransitionNotAllowed { current, requested: target });
            }
            let notification = NewNotification::order_status_updated(&order, target);
            match self.db.compare_and_set_status(order_id, current, target, notification).await? {
                Some(updated) => {
                    info!("🔄️🚦️ Order #{order_id} moved from {current} to {target} by {actor}");
                    self.call_status_changed_hook(current, &updated, actor).await;
                    return Ok(updated);
                },
                None => {
                    debug!("🔄️🚦️ Order #{order_id} changed while moving it to {target} (attempt {attempt}). Retrying");
                },
            }
        }
        warn!("🔄️🚦️ Gave up moving order #{order_id} to {target} after {MAX_STATUS_CHANGE_ATTEMPTS} attempts");
        Err(OrderFlowError::ConcurrentModification(order_id))
    }

    /// Replaces the order's requirements document. The owner and admins may do this, as often as they like. The
    /// order status is not touched.
    pub async fn attach_requirements(
        &self,
        order_id: i64,
        requirements: RequirementsDocument,
        actor: &Actor,
    ) -> Result<Order, OrderFlowError> {
        let order = self.fetch_order(order_id).await?;
        if !actor.can_access(&order) {
            return Err(OrderFlowError::NotAuthorized(format!("{actor} does not own order #{order_id}")));
        }
        requirements.validate()?;
        let order = self.db.update_requirements(order_id, &requirements).await?;
        info!("🔄️📝️ Requirements for order #{order_id} updated by {actor}");
        Ok(order)
    }

    /// Applies an optional status change and an optional requirements replacement in one request.
    ///
    /// Everything that can reject the request (ownership, the document, the transition) is settled before the
    /// requirements are written, so a refused request leaves the order as it was.
    pub async fn update_order(
        &self,
        order_id: i64,
        status: Option<OrderStatusType>,
        requirements: Option<RequirementsDocument>,
        actor: &Actor,
    ) -> Result<Order, OrderFlowError> {
        let mut updated = None;
        if let Some(doc) = &requirements {
            let order = self.fetch_order(order_id).await?;
            if !actor.can_access(&order) {
                return Err(OrderFlowError::NotAuthorized(format!("{actor} does not own order #{order_id}")));
            }
            doc.validate()?;
        }
        if let Some(target) = status {
            updated = Some(self.request_status_change(order_id, target, actor).await?);
        }
        if let Some(doc) = requirements {
            updated = Some(self.attach_requirements(order_id, doc, actor).await?);
        }
        updated.ok_or_else(|| OrderFlowError::ValidationError("Nothing to update".into()))
    }

    /// Applies a provider's payment report.
    ///
    /// This only ever writes the payment record and the order's payment state. It does not consult the transition
    /// table and never changes the order's administrative status. Replaying a report is harmless: the second call
    /// reports `changed = false` and emits no events.
    pub async fn record_payment_outcome(&self, report: PaymentReport) -> Result<PaymentReportResult, OrderFlowError> {
        let result = self.db.apply_payment_report(&report).await?;
        let PaymentReportResult { order, payment, previous_status, changed } = &result;
        if !*changed {
            if payment.status == PaymentStatus::Confirmed && report.outcome == PaymentOutcome::Failed {
                warn!(
                    "🔄️💳️ Ignoring {:?} report for {}. Payment #{} is already confirmed",
                    report.outcome, report.provider_order_id, payment.id
                );
            } else {
                debug!("🔄️💳️ Payment #{} is already {}. Nothing to do", payment.id, payment.status);
            }
            return Ok(result);
        }
        info!("🔄️💳️ Payment #{} for order #{} is now {}", payment.id, order.id, payment.status);
        self.call_payment_outcome_hook(order, payment, *previous_status).await;
        Ok(result)
    }

    /// Records a customer's crypto payment claim as a `pending` payment.
    ///
    /// The claim is keyed by a fresh `CRYPTO-<millis>` correlation id and is not linked to any order; reconciliation
    /// happens outside the system. Submitting the same transaction hash twice returns the original record.
    pub async fn submit_crypto_claim(&self, actor: &Actor, claim: CryptoClaim) -> Result<Payment, OrderFlowError> {
        let method = claim.method.parse::<CryptoMethod>().map_err(|e| OrderFlowError::ValidationError(e.to_string()))?;
        let hash = claim.transaction_hash.trim();
        if hash.is_empty() {
            return Err(OrderFlowError::ValidationError("A transaction hash is required".into()));
        }
        let amount = Cents::from_major_units(claim.amount).map_err(|e| OrderFlowError::ValidationError(e.to_string()))?;
        if !amount.is_positive() {
            return Err(OrderFlowError::ValidationError(format!("Amount must be positive, but was {amount}")));
        }
        let now = Utc::now();
        let payment = NewPayment {
            order_id: None,
            correlation_id: format!("CRYPTO-{}", now.timestamp_millis()),
            amount,
            status: PaymentStatus::Pending,
            payment_provider: method.to_string(),
            provider_order_id: hash.to_string(),
            customer_email: claim.customer_email,
            metadata: json!({
                "cryptoMethod": method.to_string(),
                "transactionHash": hash,
                "verificationAttempt": now.to_rfc3339(),
            }),
        };
        let (payment, inserted) = self.db.insert_payment(payment).await?;
        if inserted {
            info!("🔄️🪙️ {actor} submitted a {method} claim for {amount} ({})", payment.correlation_id);
        } else {
            info!("🔄️🪙️ {actor} resubmitted {method} transaction {hash}. Keeping {}", payment.correlation_id);
        }
        Ok(payment)
    }

    /// Stores the `pending` card payment that belongs to a freshly created payment intent.
    pub async fn register_card_payment(&self, payment: NewPayment) -> Result<Payment, OrderFlowError> {
        let (payment, inserted) = self.db.insert_payment(payment).await?;
        if inserted {
            debug!("🔄️💳️ Card payment {} registered for order {}", payment.provider_order_id, payment.correlation_id);
        }
        Ok(payment)
    }

    async fn fetch_order(&self, order_id: i64) -> Result<Order, OrderFlowError> {
        self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))
    }

    async fn call_order_created_hook(&self, order: &Order) {
        for emitter in &self.producers.order_created_producer {
            debug!("🔄️📦️ Notifying order created hook subscribers");
            emitter.publish_event(OrderCreatedEvent::new(order.clone())).await;
        }
    }

    async fn call_status_changed_hook(&self, old_status: OrderStatusType, order: &Order, actor: &Actor) {
        for emitter in &self.producers.status_changed_producer {
            debug!("🔄️🚦️ Notifying status changed hook subscribers");
            let event = OrderStatusChangedEvent::new(old_status, order.clone(), actor.user_id);
            emitter.publish_event(event).await;
        }
    }

    async fn call_payment_outcome_hook(&self, order: &Order, payment: &Payment, previous: Option<PaymentStatus>) {
        for emitter in &self.producers.payment_outcome_producer {
            debug!("🔄️💳️ Notifying payment outcome hook subscribers");
            let event = PaymentOutcomeEvent::new(order.clone(), payment.clone(), previous);
            emitter.publish_event(event).await;
        }
    }
}
