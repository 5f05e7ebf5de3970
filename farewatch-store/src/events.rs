use async_trait::async_trait;
use farewatch_core::ports::{AlertQueue, BoxError};
use futures_util::future::join_all;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

/// Kafka producer for the alert-users fan-out topic.
#[derive(Clone)]
pub struct EventProducer {
    producer: FutureProducer,
    topic: String,
}

impl EventProducer {
    pub fn new(brokers: &str, topic: &str) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(Self {
            producer,
            topic: topic.to_string(),
        })
    }

}

#[async_trait]
impl AlertQueue for EventProducer {
    /// One enqueue call per batch: every record in the batch is handed to the
    /// producer before any delivery is awaited, and the first delivery
    /// failure fails the whole batch.
    async fn enqueue_users(&self, user_ids: &[Uuid]) -> Result<(), BoxError> {
        let messages: Vec<(String, String)> = user_ids
            .iter()
            .map(|id| {
                (
                    id.to_string(),
                    serde_json::json!({ "userId": id }).to_string(),
                )
            })
            .collect();

        let deliveries = messages.iter().map(|(key, payload)| {
            let record = FutureRecord::to(&self.topic).key(key).payload(payload);
            self.producer
                .send(record, Timeout::After(Duration::from_secs(0)))
        });

        for result in join_all(deliveries).await {
            if let Err((e, _msg)) = result {
                error!("alert batch enqueue failed on {}: {}", self.topic, e);
                return Err(Box::new(e));
            }
        }

        info!(batch = user_ids.len(), topic = %self.topic, "alert batch enqueued");
        Ok(())
    }
}
