use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use farewatch_core::ports::{AlertQueue, AlertRepository, BoxError};
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

/// Hard platform ceiling on ids per enqueue call.
pub const QUEUE_BATCH_SIZE: usize = 100;

/// One fan-out pass: find every user with a qualifying active alert and push
/// them onto the queue in batches of at most `QUEUE_BATCH_SIZE`, one enqueue
/// call per batch, sequentially. A batch failure is surfaced to the caller
/// because it blocks that whole slice of users for the day.
pub async fn run_fanout(
    alerts: &dyn AlertRepository,
    queue: &dyn AlertQueue,
    now: chrono::DateTime<Utc>,
) -> Result<usize, BoxError> {
    let users = alerts.users_with_active_alerts(now).await?;
    if users.is_empty() {
        info!("fan-out pass found no users with qualifying alerts");
        return Ok(0);
    }

    let batches = users.chunks(QUEUE_BATCH_SIZE).count();
    for (i, chunk) in users.chunks(QUEUE_BATCH_SIZE).enumerate() {
        queue.enqueue_users(chunk).await.map_err(|err| {
            error!(batch = i + 1, batches, "fan-out batch enqueue failed: {err}");
            err
        })?;
    }

    info!(users = users.len(), batches, "fan-out pass complete");
    Ok(users.len())
}

/// Drives `run_fanout` on a fixed interval. The first pass runs immediately;
/// an overrunning pass delays the next tick instead of stacking.
pub fn start_fanout_scheduler(
    alerts: Arc<dyn AlertRepository>,
    queue: Arc<dyn AlertQueue>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval = ?every, "fan-out scheduler started");
        loop {
            ticker.tick().await;
            if let Err(err) = run_fanout(alerts.as_ref(), queue.as_ref(), Utc::now()).await {
                error!("fan-out pass failed: {err}");
            }
        }
    })
}
