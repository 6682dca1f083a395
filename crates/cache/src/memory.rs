//! In-process TTL map.
//!
//! A single mutex guards the map for request traffic and for the background
//! sweep alike; the sweep never iterates the map while another task mutates
//! it. Entries expire after a sliding TTL and are reaped by the sweep task on
//! a fixed interval.

use crate::OrderCache;
use async_trait::async_trait;
use domain::Order;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

struct Entry {
    expires_at: Instant,
    order: Order,
}

pub struct MemoryCache {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    ttl: Duration,
    stop: Arc<Notify>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl MemoryCache {
    /// Create the cache and start its sweep task. Both the TTL and the sweep
    /// interval are configuration knobs, not constants.
    pub fn new(ttl: Duration, sweep_interval: Duration) -> Self {
        let entries: Arc<Mutex<HashMap<String, Entry>>> = Arc::new(Mutex::new(HashMap::new()));
        let stop = Arc::new(Notify::new());

        let sweep_entries = entries.clone();
        let sweep_stop = stop.clone();
        let sweeper = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick fires immediately; skip it so a fresh cache is
            // not swept before anything is inserted.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let now = Instant::now();
                        let mut map = sweep_entries.lock().await;
                        let before = map.len();
                        map.retain(|_, entry| entry.expires_at > now);
                        let evicted = before - map.len();
                        if evicted > 0 {
                            debug!(evicted, remaining = map.len(), "swept expired cache entries");
                        }
                    }
                    _ = sweep_stop.notified() => break,
                }
            }
        });

        Self {
            entries,
            ttl,
            stop,
            sweeper: Mutex::new(Some(sweeper)),
        }
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[async_trait]
impl OrderCache for MemoryCache {
    async fn put(&self, order: Order) {
        let mut map = self.entries.lock().await;
        map.entry(order.order_uid.clone()).or_insert(Entry {
            expires_at: Instant::now() + self.ttl,
            order,
        });
    }

    async fn get(&self, order_uid: &str) -> Option<Order> {
        let mut map = self.entries.lock().await;
        let entry = map.get_mut(order_uid)?;
        entry.expires_at = Instant::now() + self.ttl;
        Some(entry.order.clone())
    }

    async fn delete(&self, order_uid: &str) {
        self.entries.lock().await.remove(order_uid);
    }

    async fn load_many(&self, orders: Vec<Order>) {
        let mut loaded = 0usize;
        for order in orders {
            if let Err(err) = order.validate() {
                warn!(order_uid = %order.order_uid, %err, "skipping invalid order during cache warm-up");
                continue;
            }
            self.put(order).await;
            loaded += 1;
        }
        info!(loaded, "cache warm-up finished");
    }

    async fn shutdown(&self) {
        let handle = self.sweeper.lock().await.take();
        if let Some(handle) = handle {
            self.stop.notify_one();
            if handle.await.is_err() {
                warn!("cache sweep task panicked before shutdown");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::fixtures::test_order;

    const TTL: Duration = Duration::from_secs(10);
    const SWEEP: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn test_get_returns_inserted_order() {
        let cache = MemoryCache::new(TTL, SWEEP);
        let order = test_order("uid1");

        cache.put(order.clone()).await;
        assert_eq!(cache.get("uid1").await, Some(order));
        assert_eq!(cache.get("missing").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_is_first_writer_wins() {
        let cache = MemoryCache::new(TTL, SWEEP);
        let first = test_order("uid1");
        let mut second = test_order("uid1");
        second.customer_id = "someone-else".to_string();

        cache.put(first.clone()).await;
        cache.put(second).await;

        assert_eq!(cache.get("uid1").await, Some(first));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_expired_entries() {
        let cache = MemoryCache::new(TTL, SWEEP);
        cache.put(test_order("uid1")).await;

        // Past the TTL but before the sweep: still stored, just stale.
        tokio::time::advance(TTL + Duration::from_secs(1)).await;
        assert_eq!(cache.len().await, 1);

        // The sweep pass reaps it.
        tokio::time::advance(SWEEP).await;
        tokio::task::yield_now().await;
        assert_eq!(cache.len().await, 0);
        assert_eq!(cache.get("uid1").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_extends_lifetime() {
        let cache = MemoryCache::new(TTL, SWEEP);
        cache.put(test_order("uid1")).await;

        // Touch halfway through the TTL; the deadline moves forward.
        tokio::time::advance(TTL / 2).await;
        assert!(cache.get("uid1").await.is_some());

        // Past the original deadline but inside the refreshed window.
        tokio::time::advance(TTL * 3 / 4).await;
        assert!(cache.get("uid1").await.is_some());

        // Left untouched, the next sweep after expiry reaps it.
        tokio::time::advance(TTL + SWEEP).await;
        tokio::task::yield_now().await;
        assert_eq!(cache.get("uid1").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_is_unconditional() {
        let cache = MemoryCache::new(TTL, SWEEP);
        cache.put(test_order("uid1")).await;
        cache.delete("uid1").await;
        cache.delete("uid1").await;
        assert_eq!(cache.get("uid1").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_many_skips_invalid_orders() {
        let cache = MemoryCache::new(TTL, SWEEP);
        let mut broken = test_order("broken");
        broken.items.clear();

        cache
            .load_many(vec![test_order("uid1"), broken, test_order("uid2")])
            .await;

        assert!(cache.get("uid1").await.is_some());
        assert!(cache.get("uid2").await.is_some());
        assert!(cache.get("broken").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_sweep_and_is_idempotent() {
        let cache = MemoryCache::new(TTL, SWEEP);
        cache.put(test_order("uid1")).await;

        cache.shutdown().await;
        cache.shutdown().await;

        // The map outlives the sweeper: reads and writes still work.
        cache.put(test_order("uid2")).await;
        assert!(cache.get("uid1").await.is_some());
        assert!(cache.get("uid2").await.is_some());

        // With the sweeper gone, expired entries are no longer reaped.
        tokio::time::advance(TTL + SWEEP + SWEEP).await;
        tokio::task::yield_now().await;
        assert_eq!(cache.len().await, 2);
    }
}
