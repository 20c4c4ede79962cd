//! Customer e-mail notifications.
//!
//! There is no mail transport yet. The handlers log the message that would be sent, so the hook wiring and the
//! message text can be exercised end to end.
use log::*;
use solvix_engine::{
    db_types::PaymentStatus,
    events::{EventHandlers, EventHooks, HookFuture, OrderStatusChangedEvent, PaymentOutcomeEvent},
};

pub const EMAIL_EVENT_BUFFER_SIZE: usize = 25;

/// A message for a single recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

pub fn status_changed_email(ev: &OrderStatusChangedEvent) -> EmailMessage {
    EmailMessage {
        to: format!("user #{}", ev.order.user_id),
        subject: "Order Status Updated".to_string(),
        body: format!("Your order #{} status has been updated to {}", ev.order.id, ev.order.status),
    }
}

/// Only card payments that name a receipt address produce a message.
pub fn payment_outcome_email(ev: &PaymentOutcomeEvent) -> Option<EmailMessage> {
    let to = ev.payment.customer_email.clone()?;
    let (subject, body) = match ev.payment.status {
        PaymentStatus::Confirmed => {
            ("Payment received", format!("We have received your payment of {} for order #{}", ev.payment.amount, ev.order.id))
        },
        PaymentStatus::Failed => (
            "Payment failed",
            format!("Your payment of {} for order #{} did not go through. Please try again.", ev.payment.amount, ev.order.id),
        ),
        PaymentStatus::Pending => return None,
    };
    Some(EmailMessage { to, subject: subject.to_string(), body })
}

/// Logs outgoing customer e-mails for status changes and payment outcomes.
pub fn create_email_event_handlers() -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks.on_status_changed(|ev| send_email(status_changed_email(&ev)));
    hooks.on_payment_outcome(|ev| match payment_outcome_email(&ev) {
        Some(message) => send_email(message),
        None => {
            debug!("📧️ Payment #{} has no receipt address. No e-mail sent.", ev.payment.id);
            no_op()
        },
    });
    EventHandlers::new(EMAIL_EVENT_BUFFER_SIZE, hooks)
}

fn send_email(message: EmailMessage) -> HookFuture {
    Box::pin(async move {
        info!("📧️ E-mail to {}: [{}] {}", message.to, message.subject, message.body);
    })
}

fn no_op() -> HookFuture {
    Box::pin(async {})
}
