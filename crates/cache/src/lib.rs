//! Time-bounded eviction cache for order aggregates.
//!
//! The cache is a disposable projection of the durable store: every operation
//! is infallible from the caller's point of view, a backend problem degrades
//! to a miss or a dropped write, never an error.

pub mod memory;
pub mod redis_cache;

pub use memory::MemoryCache;
pub use redis_cache::RedisCache;

use async_trait::async_trait;
use domain::Order;

/// Key-value cache keyed by order uid, with sliding expiration.
#[async_trait]
pub trait OrderCache: Send + Sync {
    /// Insert if absent. A duplicate put for an existing key is a no-op,
    /// not an overwrite.
    async fn put(&self, order: Order);

    /// Look up by uid. A hit extends the entry's lifetime by one TTL.
    async fn get(&self, order_uid: &str) -> Option<Order>;

    /// Unconditional removal.
    async fn delete(&self, order_uid: &str);

    /// Bulk insert for startup warm-up. Entries that fail validation are
    /// skipped rather than failing the batch.
    async fn load_many(&self, orders: Vec<Order>);

    /// Stop background work. Safe to call at most once; later reads and
    /// writes are still allowed and must not panic.
    async fn shutdown(&self);
}
