use crate::cache::{CacheCounters, CacheStats, ResultCache};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info, warn};

/// Redis-backed result cache.
///
/// Connectivity is checked once in [`RedisCache::connect`]. If the server
/// cannot be reached the instance stays degraded for its whole lifetime and
/// every operation becomes a no-op; there is no reconnect.
pub struct RedisCache {
    connection: Option<MultiplexedConnection>,
    counters: CacheCounters,
}

impl RedisCache {
    /// Connect and `PING` within `timeout`. Never fails: an unreachable or
    /// misconfigured backend yields a degraded cache.
    pub async fn connect(url: &str, timeout: Duration) -> Self {
        let connection = match Self::try_connect(url, timeout).await {
            Ok(conn) => {
                info!("Redis connection established");
                Some(conn)
            }
            Err(reason) => {
                warn!("Redis not available, caching disabled: {}", reason);
                None
            }
        };

        Self {
            connection,
            counters: CacheCounters::default(),
        }
    }

    /// A cache that was never connected.
    pub fn degraded() -> Self {
        Self {
            connection: None,
            counters: CacheCounters::default(),
        }
    }

    async fn try_connect(url: &str, timeout: Duration) -> Result<MultiplexedConnection, String> {
        let client = redis::Client::open(url).map_err(|e| e.to_string())?;

        let probe = async {
            let mut conn = client.get_multiplexed_async_connection().await?;
            let _: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok::<_, redis::RedisError>(conn)
        };

        match tokio::time::timeout(timeout, probe).await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(_) => Err(format!("no response within {:?}", timeout)),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.connection.is_none()
    }
}

#[async_trait]
impl ResultCache for RedisCache {
    async fn get(&self, key: &str) -> Option<Value> {
        let mut conn = self.connection.clone()?;

        let payload: Option<String> = match conn.get(key).await {
            Ok(payload) => payload,
            Err(e) => {
                error!("Cache get error: {}", e);
                self.counters.record_error();
                return None;
            }
        };

        let Some(payload) = payload else {
            self.counters.record_miss();
            return None;
        };

        match serde_json::from_str(&payload) {
            Ok(value) => {
                self.counters.record_hit();
                Some(value)
            }
            Err(e) => {
                error!("Cache get error: {}", e);
                self.counters.record_error();
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> bool {
        let Some(mut conn) = self.connection.clone() else {
            return false;
        };

        let serialized = match serde_json::to_string(value) {
            Ok(serialized) => serialized,
            Err(e) => {
                error!("Cache set error: {}", e);
                self.counters.record_error();
                return false;
            }
        };

        // SETEX rejects a zero expiry.
        let seconds = ttl.as_secs().max(1);
        match conn.set_ex::<_, _, ()>(key, serialized, seconds).await {
            Ok(()) => {
                self.counters.record_write();
                true
            }
            Err(e) => {
                error!("Cache set error: {}", e);
                self.counters.record_error();
                false
            }
        }
    }

    async fn delete(&self, key: &str) -> bool {
        let Some(mut conn) = self.connection.clone() else {
            return false;
        };

        match conn.del::<_, u64>(key).await {
            Ok(_) => true,
            Err(e) => {
                error!("Cache delete error: {}", e);
                self.counters.record_error();
                false
            }
        }
    }

    async fn clear_pattern(&self, pattern: &str) -> usize {
        let Some(mut conn) = self.connection.clone() else {
            return 0;
        };

        let keys: Vec<String> = match conn.keys(pattern).await {
            Ok(keys) => keys,
            Err(e) => {
                error!("Cache clear error: {}", e);
                self.counters.record_error();
                return 0;
            }
        };

        if keys.is_empty() {
            return 0;
        }

        match conn.del::<_, u64>(keys).await {
            Ok(removed) => removed as usize,
            Err(e) => {
                error!("Cache clear error: {}", e);
                self.counters.record_error();
                0
            }
        }
    }

    fn is_available(&self) -> bool {
        !self.is_degraded()
    }

    fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_invalid_url_degrades() {
        let cache = RedisCache::connect("not a redis url", Duration::from_millis(100)).await;
        assert!(cache.is_degraded());
        assert!(!cache.is_available());
    }

    #[tokio::test]
    async fn test_degraded_operations_are_noops() {
        let cache = RedisCache::degraded();
        assert_eq!(cache.get("k").await, None);
        assert!(!cache.set("k", &json!({"a": 1}), Duration::from_secs(60)).await);
        assert!(!cache.delete("k").await);
        assert_eq!(cache.clear_pattern("*").await, 0);
        assert_eq!(cache.stats(), CacheStats::default());
    }
}
