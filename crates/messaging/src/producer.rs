use domain::Order;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum PublisherError {
    #[error("failed to create kafka producer: {0}")]
    ProducerCreation(String),

    #[error("failed to serialize order: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to publish order: {0}")]
    PublishFailed(String),
}

/// Publishes JSON-encoded orders keyed by order uid. Used by the generator
/// service to feed the pipeline.
pub struct OrderPublisher {
    producer: FutureProducer,
    topic: String,
}

impl OrderPublisher {
    pub fn new(brokers: &str, topic: String) -> Result<Self, PublisherError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .set("acks", "all")
            .set("retries", "3")
            .create()
            .map_err(|e| PublisherError::ProducerCreation(e.to_string()))?;

        info!(%topic, "kafka producer created");
        Ok(Self { producer, topic })
    }

    pub async fn publish(&self, order: &Order) -> Result<(), PublisherError> {
        let payload = serde_json::to_string(order)?;
        self.publish_raw(&order.order_uid, payload.as_bytes()).await
    }

    /// Publish arbitrary bytes under a key. Lets the generator emit
    /// deliberately malformed payloads for poison-path testing.
    pub async fn publish_raw(&self, key: &str, payload: &[u8]) -> Result<(), PublisherError> {
        let record = FutureRecord::to(&self.topic).key(key).payload(payload);

        match self
            .producer
            .send(record, Timeout::After(Duration::from_secs(5)))
            .await
        {
            Ok((partition, offset)) => {
                info!(topic = %self.topic, partition, offset, key, "order published");
                Ok(())
            }
            Err((err, _)) => {
                warn!(%err, key, "failed to publish order");
                Err(PublisherError::PublishFailed(err.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::fixtures::test_order;

    #[test]
    fn test_publisher_creation_without_broker() {
        // Creation does not validate the connection.
        assert!(OrderPublisher::new("", "orders".to_string()).is_ok());
    }

    #[test]
    fn test_order_payload_is_wire_json() {
        let order = test_order("uid1");
        let payload = serde_json::to_string(&order).unwrap();
        assert!(payload.contains("\"order_uid\":\"uid1\""));
        assert!(payload.contains("\"payment_dt\""));
    }
}
