use std::time::Duration;

use log::*;
use solvix_engine::{NotificationApi, SqliteDatabase};
use tokio::task::JoinHandle;

/// Upper bound on the notices delivered per tick. Anything beyond it waits for the next tick.
const OUTBOX_BATCH_SIZE: i64 = 100;

/// Starts the notification dispatcher. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Admin notices for new orders are queued in the outbox together with the order. Most are delivered straight away;
/// this worker picks up whatever was left behind.
pub fn start_outbox_worker(db: SqliteDatabase, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        let api = NotificationApi::new(db);
        info!("🕰️ Notification outbox worker started. Running every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            trace!("🕰️ Running notification outbox job");
            match api.drain_outbox(OUTBOX_BATCH_SIZE).await {
                Ok(result) if result.total() == 0 => trace!("🕰️ Outbox is empty"),
                Ok(result) => {
                    info!("🕰️ {} queued notifications delivered, {} failed", result.delivered, result.failed);
                },
                Err(e) => {
                    error!("🕰️ Error running notification outbox job: {e}");
                },
            }
        }
    })
}
