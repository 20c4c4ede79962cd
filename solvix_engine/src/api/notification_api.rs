use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Actor, Notification},
    traits::{DrainResult, NotificationManagement, OrderFlowError},
};

pub struct NotificationApi<B> {
    db: B,
}

impl<B> Debug for NotificationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NotificationApi")
    }
}

impl<B> NotificationApi<B>
where B: NotificationManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// The actor's own notifications, newest first.
    pub async fn notifications_for(&self, actor: &Actor) -> Result<Vec<Notification>, OrderFlowError> {
        self.db.fetch_notifications_for_user(actor.user_id).await
    }

    /// Marks one of the actor's notifications as read. Notifications belonging to someone else are reported as
    /// missing.
    pub async fn mark_read(&self, notification_id: i64, actor: &Actor) -> Result<Notification, OrderFlowError> {
        let notification = self
            .db
            .mark_notification_read(notification_id, actor.user_id)
            .await?
            .ok_or(OrderFlowError::NotificationNotFound(notification_id))?;
        trace!("📨️ Notification #{notification_id} read by {actor}");
        Ok(notification)
    }

    /// Delivers up to `limit` queued notifications. A failure on one entry is logged and counted, and does not stop
    /// the others from being delivered.
    pub async fn drain_outbox(&self, limit: i64) -> Result<DrainResult, OrderFlowError> {
        let batch = self.db.fetch_outbox_batch(limit).await?;
        let mut result = DrainResult::default();
        for entry in batch {
            match self.db.deliver_outbox_entry(entry.id).await {
                Ok(Some(n)) => {
                    trace!("📨️ Outbox entry #{} delivered to user #{} as notification #{}", entry.id, n.user_id, n.id);
                    result.delivered += 1;
                },
                Ok(None) => trace!("📨️ Outbox entry #{} was already delivered", entry.id),
                Err(e) => {
                    warn!("📨️ Could not deliver outbox entry #{} to user #{}. {e}", entry.id, entry.user_id);
                    result.failed += 1;
                    if let Err(e) = self.db.record_outbox_failure(entry.id).await {
                        error!("📨️ Could not record delivery failure for outbox entry #{}. {e}", entry.id);
                    }
                },
            }
        }
        Ok(result)
    }
}
