use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use farewatch_core::ports::RunRegistry;
use farewatch_engine::processor::AlertProcessor;
use farewatch_engine::retry::{retry_with, PROCESSING_RETRY};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Message};
use rdkafka::Offset;
use tokio::time::sleep;
use tracing::{error, info, warn};
use uuid::Uuid;

/// How long to back off before re-reading a message we could not start
/// processing (registry unavailable etc.).
const NACK_RETRY_DELAY: Duration = Duration::from_secs(60);

/// What to do with a consumed message once we are done with it. Commit moves
/// past it; Retry seeks back so the same offset is delivered again after a
/// delay.
#[derive(Debug, PartialEq, Eq)]
enum Disposition {
    Commit,
    Retry,
}

fn parse_user_id(payload: &str) -> Option<Uuid> {
    let value: serde_json::Value = serde_json::from_str(payload).ok()?;
    value
        .get("userId")
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
}

/// One claim per user per UTC day. The registry key is what makes redelivered
/// messages harmless.
fn run_key(user_id: Uuid, now: DateTime<Utc>) -> String {
    format!("{}+{}", user_id, now.date_naive())
}

pub async fn start_alert_dispatcher(
    brokers: String,
    group_id: String,
    topic: String,
    processor: Arc<AlertProcessor>,
    runs: Arc<dyn RunRegistry>,
) {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", &brokers)
        .set("group.id", &group_id)
        .set("enable.auto.commit", "false")
        .set("auto.offset.reset", "earliest")
        .create()
        .expect("Consumer creation failed");

    consumer.subscribe(&[&topic]).expect("Can't subscribe");

    info!(topic, "alert dispatcher started");

    loop {
        match consumer.recv().await {
            Err(e) => error!("Kafka error: {}", e),
            Ok(m) => {
                let disposition = handle_message(&m, processor.as_ref(), runs.as_ref()).await;
                match disposition {
                    Disposition::Commit => {
                        if let Err(e) = consumer.commit_message(&m, CommitMode::Async) {
                            error!("Failed to commit offset: {}", e);
                        }
                    }
                    Disposition::Retry => {
                        sleep(NACK_RETRY_DELAY).await;
                        if let Err(e) = consumer.seek(
                            m.topic(),
                            m.partition(),
                            Offset::Offset(m.offset()),
                            Duration::from_secs(5),
                        ) {
                            error!("Failed to seek back for retry: {}", e);
                        }
                    }
                }
            }
        }
    }
}

async fn handle_message(
    m: &BorrowedMessage<'_>,
    processor: &AlertProcessor,
    runs: &dyn RunRegistry,
) -> Disposition {
    let payload = match m.payload_view::<str>() {
        Some(Ok(p)) => p,
        _ => {
            warn!("dropping message with unreadable payload");
            return Disposition::Commit;
        }
    };
    let Some(user_id) = parse_user_id(payload) else {
        warn!(payload, "dropping malformed alert message");
        return Disposition::Commit;
    };

    let now = Utc::now();
    let key = run_key(user_id, now);
    match runs.claim(&key, user_id).await {
        Ok(false) => {
            info!(%user_id, "user already processed today, skipping");
            return Disposition::Commit;
        }
        Err(e) => {
            // Could not even record the attempt, so redelivery is safe.
            error!(%user_id, "failed to claim run: {}", e);
            return Disposition::Retry;
        }
        Ok(true) => {}
    }

    // Once the claim is ours, the message is consumed either way. A failure
    // here means the user misses today's run rather than risking a double
    // send.
    let result = retry_with(&PROCESSING_RETRY, "process-user", || {
        processor.process_user(user_id, Utc::now())
    })
    .await;
    match result {
        Ok(outcome) => {
            info!(%user_id, success = outcome.success, reason = ?outcome.reason, "user processed");
        }
        Err(e) => {
            error!(%user_id, "giving up on user for today: {}", e);
        }
    }
    Disposition::Commit
}
