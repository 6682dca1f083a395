//! Redis-backed eviction cache.
//!
//! Values are stored in the binary codec format rather than JSON, which keeps
//! cached entries compact and guarantees bit-exact monetary amounts. Redis
//! owns expiry here: `SET NX EX` gives put-if-absent with a TTL, and a hit
//! refreshes the TTL via `GETEX`, matching the sliding expiration of the
//! in-process cache.

use crate::OrderCache;
use async_trait::async_trait;
use codec::{decode_order, encode_order};
use domain::Order;
use redis::aio::ConnectionManager;
use tracing::{debug, error, info, warn};

pub struct RedisCache {
    conn: ConnectionManager,
    ttl_seconds: u64,
}

impl RedisCache {
    pub async fn new(redis_url: &str, ttl_seconds: u64) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        info!(ttl_seconds, "redis cache initialized");
        Ok(Self { conn, ttl_seconds })
    }

    fn cache_key(order_uid: &str) -> String {
        format!("order:{order_uid}")
    }
}

#[async_trait]
impl OrderCache for RedisCache {
    async fn put(&self, order: Order) {
        let key = Self::cache_key(&order.order_uid);
        let value = encode_order(&order);

        // NX keeps the first writer's value, EX bounds staleness.
        let result: Result<(), redis::RedisError> = redis::cmd("SET")
            .arg(&key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(self.ttl_seconds)
            .query_async(&mut self.conn.clone())
            .await;

        if let Err(err) = result {
            error!(%key, %err, "failed to cache order");
        }
    }

    async fn get(&self, order_uid: &str) -> Option<Order> {
        let key = Self::cache_key(order_uid);

        let result: Result<Option<Vec<u8>>, redis::RedisError> = redis::cmd("GETEX")
            .arg(&key)
            .arg("EX")
            .arg(self.ttl_seconds)
            .query_async(&mut self.conn.clone())
            .await;

        match result {
            Ok(Some(bytes)) => match decode_order(&bytes) {
                Ok(order) => {
                    debug!(%key, "cache hit");
                    Some(order)
                }
                Err(err) => {
                    // A value we cannot decode is as good as absent.
                    error!(%key, %err, "failed to decode cached order");
                    None
                }
            },
            Ok(None) => {
                debug!(%key, "cache miss");
                None
            }
            Err(err) => {
                warn!(%key, %err, "redis error, treating as miss");
                None
            }
        }
    }

    async fn delete(&self, order_uid: &str) {
        let key = Self::cache_key(order_uid);
        let result: Result<(), redis::RedisError> = redis::cmd("DEL")
            .arg(&key)
            .query_async(&mut self.conn.clone())
            .await;
        if let Err(err) = result {
            error!(%key, %err, "failed to delete cached order");
        }
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
        info!(loaded, "redis cache warm-up finished");
    }

    async fn shutdown(&self) {
        // The connection manager has no explicit close; dropping the last
        // clone tears the connection down.
        info!("redis cache shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::fixtures::test_order;

    #[test]
    fn test_cache_key_format() {
        assert_eq!(RedisCache::cache_key("uid1"), "order:uid1");
    }

    #[tokio::test]
    #[ignore] // Requires Redis to be running
    async fn test_redis_round_trip() {
        let cache = RedisCache::new("redis://localhost:6379", 300)
            .await
            .expect("failed to connect to redis");
        let order = test_order("redis-test-uid");

        cache.delete(&order.order_uid).await;
        cache.put(order.clone()).await;
        assert_eq!(cache.get(&order.order_uid).await, Some(order.clone()));

        cache.delete(&order.order_uid).await;
        assert_eq!(cache.get(&order.order_uid).await, None);
    }
}
