use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Key/value store for execution results.
///
/// Every operation is fail-soft: backend errors are logged and reported as a
/// miss, `false` or `0`, never returned to the caller. Implementations must be
/// safe to share between concurrent requests; concurrent writes to one key
/// resolve as last-write-wins.
#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Stored value for `key`, if present and unexpired.
    async fn get(&self, key: &str) -> Option<Value>;

    /// Serialize and store `value` for `ttl`.
    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> bool;

    async fn delete(&self, key: &str) -> bool;

    /// Remove every key matching a glob pattern, returning how many went.
    async fn clear_pattern(&self, pattern: &str) -> usize;

    /// Whether the backend is reachable. A degraded cache reports false.
    fn is_available(&self) -> bool;

    fn stats(&self) -> CacheStats;

    fn backend_name(&self) -> &'static str;
}

/// Cache performance statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub errors: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }

    pub fn miss_rate(&self) -> f64 {
        1.0 - self.hit_rate()
    }
}

/// Lock-free counters behind [`CacheStats`].
#[derive(Debug, Default)]
pub struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    errors: AtomicU64,
}

impl CacheCounters {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Cache that stores nothing. Used when caching is switched off.
#[derive(Debug, Default)]
pub struct NoopCache;

#[async_trait]
impl ResultCache for NoopCache {
    async fn get(&self, _key: &str) -> Option<Value> {
        None
    }

    async fn set(&self, _key: &str, _value: &Value, _ttl: Duration) -> bool {
        false
    }

    async fn delete(&self, _key: &str) -> bool {
        false
    }

    async fn clear_pattern(&self, _pattern: &str) -> usize {
        0
    }

    fn is_available(&self) -> bool {
        false
    }

    fn stats(&self) -> CacheStats {
        CacheStats::default()
    }

    fn backend_name(&self) -> &'static str {
        "disabled"
    }
}
