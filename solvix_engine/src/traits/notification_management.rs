use crate::{
    db_types::{Notification, OutboxEntry},
    traits::OrderFlowError,
};

#[allow(async_fn_in_trait)]
pub trait NotificationManagement {
    /// The user's notifications, newest first.
    async fn fetch_notifications_for_user(&self, user_id: i64) -> Result<Vec<Notification>, OrderFlowError>;

    /// Marks the notification as read if it belongs to `user_id`. Returns `None` if there is no such notification
    /// for that user. Marking an already-read notification is not an error.
    async fn mark_notification_read(
        &self,
        notification_id: i64,
        user_id: i64,
    ) -> Result<Option<Notification>, OrderFlowError>;

    /// The oldest `limit` undelivered outbox entries that have not used up their delivery attempts.
    async fn fetch_outbox_batch(&self, limit: i64) -> Result<Vec<OutboxEntry>, OrderFlowError>;

    /// Moves an outbox entry into the recipient's mailbox. Returns `None` if the entry has already been delivered
    /// (e.g. by a concurrent dispatcher).
    async fn deliver_outbox_entry(&self, entry_id: i64) -> Result<Option<Notification>, OrderFlowError>;

    /// Counts a failed delivery. An entry that keeps failing is eventually left out of every batch.
    async fn record_outbox_failure(&self, entry_id: i64) -> Result<(), OrderFlowError>;
}
