//! The per-message state machine: receive, decode and validate, persist,
//! acknowledge. Offsets are committed only after the durable write, so a
//! crash never loses an order, only redelivers it.

use crate::retry::{sleep_or_shutdown, RetryPolicy};
use domain::Order;
use messaging::{OrderStream, StreamRecord};
use std::sync::Arc;
use std::time::Duration;
use storage::{OrderStorage, StorageError};
use tokio::sync::watch;
use tracing::{error, info, warn};

/// What became of one record.
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    /// Durably stored (or already present) and acknowledged.
    Stored,
    /// Malformed or invalid: acknowledged so it is never retried.
    Poison,
    /// Permanent storage failure: not acknowledged. The pipeline must halt
    /// here — offset commits are cumulative per partition, so acknowledging
    /// any later record would silently commit past this one and lose it.
    Failed,
    /// Shutdown fired mid-retry; not acknowledged, safe to redeliver.
    Interrupted,
}

pub struct IngestPipeline {
    stream: Arc<dyn OrderStream>,
    storage: Arc<OrderStorage>,
    policy: RetryPolicy,
    poll_timeout: Duration,
    shutdown: watch::Receiver<bool>,
}

impl IngestPipeline {
    pub fn new(
        stream: Arc<dyn OrderStream>,
        storage: Arc<OrderStorage>,
        policy: RetryPolicy,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            stream,
            storage,
            policy,
            poll_timeout: Duration::from_millis(100),
            shutdown,
        }
    }

    /// Consume until shutdown, or until a record fails permanently. An
    /// in-flight record finishes its current attempt; retry sleeps observe
    /// shutdown promptly.
    pub async fn run(mut self) {
        info!("ingestion pipeline started");

        while !*self.shutdown.borrow() {
            let record = match self.receive().await {
                Some(record) => record,
                None => break,
            };
            if self.process(record).await == Outcome::Failed {
                // Consuming further would eventually commit an offset past
                // the failed record and lose it for good. Stop and leave the
                // partition parked at the failure for operator intervention.
                error!("halting ingestion after permanent storage failure");
                break;
            }
        }

        self.stream.close();
        info!("ingestion pipeline stopped");
    }

    /// Stream-Retry state: transient read failures get bounded fast retries,
    /// then an indefinite slow cycle. Returns `None` only on shutdown.
    async fn receive(&mut self) -> Option<StreamRecord> {
        let mut failures = 0u32;
        loop {
            if *self.shutdown.borrow() {
                return None;
            }

            match self.stream.read_next(self.poll_timeout).await {
                Ok(Some(record)) => return Some(record),
                Ok(None) => {
                    // Idle stream; back off briefly without counting it as
                    // a failure.
                    if !sleep_or_shutdown(Duration::from_millis(10), &mut self.shutdown).await {
                        return None;
                    }
                }
                Err(err) => {
                    failures += 1;
                    let delay = self.policy.delay_after(failures);
                    warn!(%err, failures, ?delay, "stream read failed, retrying");
                    if !sleep_or_shutdown(delay, &mut self.shutdown).await {
                        return None;
                    }
                }
            }
        }
    }

    async fn process(&mut self, record: StreamRecord) -> Outcome {
        let key = record.key_str();

        // Decode & Validate. Failures are poison: acknowledge so the
        // message is never retried, and move on.
        let order: Order = match serde_json::from_slice(&record.payload) {
            Ok(order) => order,
            Err(err) => {
                warn!(%key, %err, "malformed payload, dropping message");
                self.acknowledge(&record);
                return Outcome::Poison;
            }
        };

        if let Err(err) = order.validate() {
            warn!(%key, %err, "invalid order, dropping message");
            self.acknowledge(&record);
            return Outcome::Poison;
        }

        // Persist with Storage-Retry: a validated order is never silently
        // dropped, so transient failures retry indefinitely (slowing down
        // after the bounded phase).
        let mut failures = 0u32;
        loop {
            match self.storage.add(&order).await {
                Ok(()) => {
                    info!(order_uid = %order.order_uid, "order ingested");
                    break;
                }
                Err(StorageError::Duplicate(_)) => {
                    // Redelivery of an already-persisted order: the write is
                    // a no-op, the ack still has to happen.
                    info!(order_uid = %order.order_uid, "order already persisted, acknowledging redelivery");
                    break;
                }
                Err(err) if err.is_transient() => {
                    failures += 1;
                    let delay = self.policy.delay_after(failures);
                    warn!(order_uid = %order.order_uid, %err, failures, ?delay, "storage unavailable, retrying");
                    if !sleep_or_shutdown(delay, &mut self.shutdown).await {
                        return Outcome::Interrupted;
                    }
                }
                Err(err) => {
                    error!(order_uid = %order.order_uid, %err, "permanent storage failure, refusing to acknowledge");
                    return Outcome::Failed;
                }
            }
        }

        // Acknowledge only after durability is assured.
        self.acknowledge(&record);
        Outcome::Stored
    }

    fn acknowledge(&self, record: &StreamRecord) {
        if let Err(err) = self.stream.commit(record) {
            // The worst case of a failed commit is redelivery, which the
            // storage layer already tolerates.
            error!(%err, offset = record.offset, "failed to commit offset");
        }
    }
}
