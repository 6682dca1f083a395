//! Kafka adapters: the consumer side of the ingestion pipeline and the
//! producer used by the order generator.

pub mod consumer;
pub mod producer;

pub use consumer::KafkaOrderStream;
pub use producer::OrderPublisher;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Broker-side failures. All of them are retryable: the pipeline never gives
/// up on the stream, it only slows down.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),
}

/// One record pulled from the stream. The key is the order uid, the payload
/// the JSON-encoded aggregate; partition and offset identify what to commit
/// once the record is durably persisted.
#[derive(Debug, Clone)]
pub struct StreamRecord {
    pub key: Vec<u8>,
    pub payload: Vec<u8>,
    pub partition: i32,
    pub offset: i64,
}

impl StreamRecord {
    pub fn key_str(&self) -> String {
        String::from_utf8_lossy(&self.key).into_owned()
    }
}

/// The three operations the pipeline needs from the message stream:
/// read-next, explicit commit, close. At-least-once: a record may be seen
/// again if the process dies between persist and commit.
#[async_trait]
pub trait OrderStream: Send + Sync {
    /// Pull the next record, waiting up to `timeout`. `Ok(None)` means the
    /// stream is idle, not broken.
    async fn read_next(&self, timeout: Duration) -> Result<Option<StreamRecord>, StreamError>;

    /// Acknowledge a record. Called only after the order is durably stored.
    fn commit(&self, record: &StreamRecord) -> Result<(), StreamError>;

    fn close(&self);
}
