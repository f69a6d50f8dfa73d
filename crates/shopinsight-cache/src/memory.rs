use crate::cache::{CacheCounters, CacheStats, ResultCache};
use async_trait::async_trait;
use dashmap::DashMap;
use globset::Glob;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Cache entry holding the serialized value and its deadline
#[derive(Debug, Clone)]
struct CacheEntry {
    payload: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(payload: String, ttl: Duration) -> Self {
        Self {
            payload,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-process cache with per-entry TTL.
///
/// Values are stored serialized, matching what a remote backend would hold.
/// Expired entries are dropped on access, and every `sweep_interval` writes
/// a sweep reclaims the ones nobody reads again.
#[derive(Debug)]
pub struct InMemoryCache {
    entries: DashMap<String, CacheEntry>,
    counters: CacheCounters,
    writes: AtomicU64,
    sweep_interval: u64,
}

/// Writes between sweeps of expired entries.
pub const DEFAULT_SWEEP_INTERVAL: u64 = 256;

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::with_sweep_interval(DEFAULT_SWEEP_INTERVAL)
    }
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sweep_interval(sweep_interval: u64) -> Self {
        Self {
            entries: DashMap::new(),
            counters: CacheCounters::default(),
            writes: AtomicU64::new(0),
            sweep_interval: sweep_interval.max(1),
        }
    }

    /// Number of stored entries, including ones that expired but were not yet
    /// purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        before - self.entries.len()
    }
}

#[async_trait]
impl ResultCache for InMemoryCache {
    async fn get(&self, key: &str) -> Option<Value> {
        let payload = match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => Some(entry.payload.clone()),
            Some(_) => None,
            None => None,
        };

        let Some(payload) = payload else {
            self.entries.remove_if(key, |_, entry| entry.is_expired());
            self.counters.record_miss();
            return None;
        };

        match serde_json::from_str(&payload) {
            Ok(value) => {
                self.counters.record_hit();
                Some(value)
            }
            Err(e) => {
                warn!("Cache get error: {}", e);
                self.counters.record_error();
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> bool {
        match serde_json::to_string(value) {
            Ok(payload) => {
                self.entries
                    .insert(key.to_string(), CacheEntry::new(payload, ttl));
                self.counters.record_write();

                let writes = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
                if writes % self.sweep_interval == 0 {
                    let purged = self.purge_expired();
                    if purged > 0 {
                        debug!("Purged {} expired cache entries", purged);
                    }
                }
                true
            }
            Err(e) => {
                warn!("Cache set error: {}", e);
                self.counters.record_error();
                false
            }
        }
    }

    async fn delete(&self, key: &str) -> bool {
        self.entries.remove(key);
        true
    }

    async fn clear_pattern(&self, pattern: &str) -> usize {
        let matcher = match Glob::new(pattern) {
            Ok(glob) => glob.compile_matcher(),
            Err(e) => {
                warn!("Cache clear error: invalid pattern '{}': {}", pattern, e);
                self.counters.record_error();
                return 0;
            }
        };

        let before = self.entries.len();
        self.entries.retain(|key, _| !matcher.is_match(key));
        let removed = before.saturating_sub(self.entries.len());
        debug!("Cleared {} cache entries matching '{}'", removed, pattern);
        removed
    }

    fn is_available(&self) -> bool {
        true
    }

    fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
