use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{NewNotification, Notification, OutboxEntry};

pub async fn insert_notification(
    notification: NewNotification,
    conn: &mut SqliteConnection,
) -> Result<Notification, sqlx::Error> {
    let result: Notification =
        sqlx::query_as("INSERT INTO notifications (user_id, title, message) VALUES ($1, $2, $3) RETURNING *")
            .bind(notification.user_id)
            .bind(notification.title)
            .bind(notification.message)
            .fetch_one(conn)
            .await?;
    trace!("🗃️ Notification #{} created for user #{}", result.id, result.user_id);
    Ok(result)
}

pub async fn fetch_notifications_for_user(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Notification>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await
}

/// Read status only ever moves `unread -> read`, so this is safe to repeat.
pub async fn mark_read(id: i64, user_id: i64, conn: &mut SqliteConnection) -> Result<Option<Notification>, sqlx::Error> {
    sqlx::query_as("UPDATE notifications SET status = 'read' WHERE id = $1 AND user_id = $2 RETURNING *")
        .bind(id)
        .bind(user_id)
        .fetch_optional(conn)
        .await
}

/// Entries that failed this many times are parked in the outbox and no longer picked up by the dispatcher.
pub const MAX_OUTBOX_ATTEMPTS: i64 = 5;

pub async fn fetch_outbox_batch(limit: i64, conn: &mut SqliteConnection) -> Result<Vec<OutboxEntry>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM notification_outbox WHERE attempts < $1 ORDER BY id ASC LIMIT $2")
        .bind(MAX_OUTBOX_ATTEMPTS)
        .bind(limit)
        .fetch_all(conn)
        .await
}

/// Removes the outbox entry, returning it if it was still there.
pub async fn take_outbox_entry(id: i64, conn: &mut SqliteConnection) -> Result<Option<OutboxEntry>, sqlx::Error> {
    sqlx::query_as("DELETE FROM notification_outbox WHERE id = $1 RETURNING *").bind(id).fetch_optional(conn).await
}

/// Returns the new attempt count, or `None` if the entry is gone.
pub async fn increment_outbox_attempts(id: i64, conn: &mut SqliteConnection) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar("UPDATE notification_outbox SET attempts = attempts + 1 WHERE id = $1 RETURNING attempts")
        .bind(id)
        .fetch_optional(conn)
        .await
}
