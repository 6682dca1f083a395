//! Cache-aside coordinator.
//!
//! Callers see a single find/add surface; the durable store stays
//! authoritative and the cache is only an accelerator. Disabling the cache
//! changes latency, never results.

use crate::{OrderStore, StorageError};
use cache::OrderCache;
use domain::Order;
use std::sync::Arc;
use tracing::{debug, info};

pub struct OrderStorage {
    cache: Arc<dyn OrderCache>,
    store: Arc<dyn OrderStore>,
}

impl OrderStorage {
    pub fn new(cache: Arc<dyn OrderCache>, store: Arc<dyn OrderStore>) -> Self {
        Self { cache, store }
    }

    /// Look up one order. Cache hit returns immediately (the hit itself
    /// refreshes the TTL); on a miss the durable store is queried and a
    /// found order populates the cache on the way out. `NotFound` propagates
    /// without touching the cache — a real I/O failure is never hidden
    /// behind a miss.
    pub async fn find(&self, order_uid: &str) -> Result<Order, StorageError> {
        if let Some(order) = self.cache.get(order_uid).await {
            debug!(%order_uid, "served from cache");
            return Ok(order);
        }

        let order = self.store.find(order_uid).await?;
        self.cache.put(order.clone()).await;
        Ok(order)
    }

    /// Persist one order, write-around: the durable write is the point of
    /// truth and may still fail or be retried, so the cache is only
    /// populated lazily by a later find.
    pub async fn add(&self, order: &Order) -> Result<(), StorageError> {
        self.store.add(order).await
    }

    /// Warm the cache with the most recent `limit` durably-stored orders.
    /// A partially warmed cache is fine; an empty one is the safe fallback.
    pub async fn load_initial_data(&self, limit: i64) -> Result<(), StorageError> {
        let orders = self.store.get_recent(limit).await?;
        info!(count = orders.len(), "warming cache with recent orders");
        self.cache.load_many(orders).await;
        Ok(())
    }

    /// Shut down cache then store.
    pub async fn shutdown(&self) {
        self.cache.shutdown().await;
        self.store.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockOrderStore;
    use async_trait::async_trait;
    use cache::MemoryCache;
    use domain::fixtures::test_order;
    use std::time::Duration;

    const TTL: Duration = Duration::from_secs(10);
    const SWEEP: Duration = Duration::from_secs(60);

    fn memory_cache() -> Arc<MemoryCache> {
        Arc::new(MemoryCache::new(TTL, SWEEP))
    }

    /// A cache that never stores anything: find/add must behave identically
    /// with it, only slower.
    struct DisabledCache;

    #[async_trait]
    impl cache::OrderCache for DisabledCache {
        async fn put(&self, _order: Order) {}
        async fn get(&self, _order_uid: &str) -> Option<Order> {
            None
        }
        async fn delete(&self, _order_uid: &str) {}
        async fn load_many(&self, _orders: Vec<Order>) {}
        async fn shutdown(&self) {}
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_find_is_served_from_cache() {
        let order = test_order("uid1");
        let mut store = MockOrderStore::new();
        let returned = order.clone();
        store
            .expect_find()
            .times(1)
            .returning(move |_| Ok(returned.clone()));

        let storage = OrderStorage::new(memory_cache(), Arc::new(store));

        assert_eq!(storage.find("uid1").await.unwrap(), order);
        // Store expectation is times(1): this one must hit the cache.
        assert_eq!(storage.find("uid1").await.unwrap(), order);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_propagates_and_does_not_populate_cache() {
        let mut store = MockOrderStore::new();
        store
            .expect_find()
            .times(2)
            .returning(|_| Err(StorageError::NotFound));

        let cache = memory_cache();
        let storage = OrderStorage::new(cache.clone(), Arc::new(store));

        assert!(matches!(
            storage.find("missing").await,
            Err(StorageError::NotFound)
        ));
        // Second call goes to the store again: nothing was cached.
        assert!(matches!(
            storage.find("missing").await,
            Err(StorageError::NotFound)
        ));
        assert!(cache.get("missing").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_failure_is_not_a_cache_miss() {
        let mut store = MockOrderStore::new();
        store
            .expect_find()
            .returning(|_| Err(StorageError::Transient(sqlx::Error::PoolTimedOut)));

        let storage = OrderStorage::new(memory_cache(), Arc::new(store));
        assert!(matches!(
            storage.find("uid1").await,
            Err(StorageError::Transient(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_is_write_around() {
        let order = test_order("uid1");
        let mut store = MockOrderStore::new();
        store.expect_add().times(1).returning(|_| Ok(()));

        let cache = memory_cache();
        let storage = OrderStorage::new(cache.clone(), Arc::new(store));

        storage.add(&order).await.unwrap();
        // The cache learns about the order only on a later find.
        assert!(cache.get("uid1").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_find_equivalent_with_cache_disabled() {
        let order = test_order("uid1");

        let mut warm_store = MockOrderStore::new();
        let o = order.clone();
        warm_store.expect_find().returning(move |_| Ok(o.clone()));
        let warm = OrderStorage::new(memory_cache(), Arc::new(warm_store));

        let mut cold_store = MockOrderStore::new();
        let o = order.clone();
        cold_store.expect_find().returning(move |_| Ok(o.clone()));
        let cold = OrderStorage::new(Arc::new(DisabledCache), Arc::new(cold_store));

        // Same sequence of calls, same results, populated cache or not.
        for _ in 0..3 {
            assert_eq!(
                warm.find("uid1").await.unwrap(),
                cold.find("uid1").await.unwrap()
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_warm_up_populates_cache_without_store_reads() {
        let orders = vec![test_order("uid1"), test_order("uid2")];
        let mut store = MockOrderStore::new();
        let recent = orders.clone();
        store
            .expect_get_recent()
            .times(1)
            .returning(move |_| Ok(recent.clone()));
        store.expect_find().times(0);

        let cache = memory_cache();
        let storage = OrderStorage::new(cache.clone(), Arc::new(store));

        storage.load_initial_data(100).await.unwrap();
        assert!(cache.get("uid1").await.is_some());
        assert!(cache.get("uid2").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_closes_cache_then_store() {
        let mut store = MockOrderStore::new();
        store.expect_close().times(1).returning(|| ());

        let storage = OrderStorage::new(memory_cache(), Arc::new(store));
        storage.shutdown().await;
    }
}
