//! Durable storage for order aggregates and the cache-aside coordinator on
//! top of it.

pub mod coordinator;
pub mod postgres;

pub use coordinator::OrderStorage;
pub use postgres::PostgresOrderStore;

use async_trait::async_trait;
use domain::Order;
use thiserror::Error;

/// Failure taxonomy for the durable store. `Transient` drives the ingestion
/// retry state machine; everything else is final for the attempt.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Normal outcome for lookups, not a system failure. Must propagate
    /// cleanly so callers can tell "no such order" from "system broken".
    #[error("order not found")]
    NotFound,

    /// The order uid already exists. Benign under at-least-once redelivery.
    #[error("order {0} already exists")]
    Duplicate(String),

    /// Retryable availability failure (connection refused, pool timeout).
    #[error("transient storage error: {0}")]
    Transient(#[source] sqlx::Error),

    /// Structural failure retries will not fix.
    #[error("permanent storage error: {0}")]
    Permanent(#[source] sqlx::Error),

    /// A stored row could not be turned back into an aggregate.
    #[error("failed to decode stored order: {0}")]
    Decode(#[from] serde_json::Error),
}

impl StorageError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Transient(_))
    }

    /// Classify a database error. Unique-key violations become `Duplicate`
    /// (redelivery of an already-persisted order must be a no-op);
    /// availability problems become `Transient`; the rest is `Permanent`.
    fn from_sqlx(err: sqlx::Error, order_uid: &str) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StorageError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StorageError::Duplicate(order_uid.to_string())
            }
            sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Tls(_) => StorageError::Transient(err),
            _ => StorageError::Permanent(err),
        }
    }
}

/// Contract the coordinator needs from a durable backing store.
///
/// `add` must be atomic across every row one aggregate touches: a payment row
/// without its parent order row must never be observable.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn add(&self, order: &Order) -> Result<(), StorageError>;

    async fn find(&self, order_uid: &str) -> Result<Order, StorageError>;

    /// Most recently inserted aggregates, newest first. Used for warm-up.
    async fn get_recent(&self, limit: i64) -> Result<Vec<Order>, StorageError>;

    async fn close(&self);
}
