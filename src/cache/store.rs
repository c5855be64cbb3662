//! In-memory response cache with TTL expiry.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::cache::popularity::PopularityPolicy;
use crate::observability::metrics;

/// A cached value and the moment it was stored.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub stored_at: Instant,
}

/// A thread-safe TTL cache shared across requests.
///
/// Entries are overwritten whole, never patched. Validity is checked on read:
/// an entry is served while `now - stored_at <= effective_ttl(key)` and
/// dropped on the first read after that.
#[derive(Clone)]
pub struct ResponseCache<V> {
    inner: Arc<DashMap<String, CacheEntry<V>>>,
    base_ttl: Duration,
    policy: Arc<PopularityPolicy>,
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(base_ttl: Duration, policy: PopularityPolicy) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            base_ttl,
            policy: Arc::new(policy),
        }
    }

    /// Get a value if present and still fresh.
    pub fn get(&self, key: &str) -> Option<V> {
        let ttl = self.policy.effective_ttl(key, self.base_ttl);

        let fresh = match self.inner.get(key) {
            Some(entry) if entry.stored_at.elapsed() <= ttl => Some(entry.value.clone()),
            Some(_) => None,
            None => {
                metrics::record_cache_lookup(false);
                return None;
            }
        };

        if fresh.is_none() {
            // Re-check under the shard lock; a concurrent set may have refreshed it.
            self.inner.remove_if(key, |_, entry| entry.stored_at.elapsed() > ttl);
            metrics::record_cache_size(self.inner.len());
            tracing::debug!(key = %key, "Cache expired");
        }

        metrics::record_cache_lookup(fresh.is_some());
        fresh
    }

    /// Store a value with a fresh timestamp, replacing any previous entry.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        tracing::debug!(key = %key, "Added to cache");
        self.inner.insert(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
        metrics::record_cache_size(self.inner.len());
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.inner.clear();
        metrics::record_cache_size(0);
        tracing::debug!("Cache cleared");
    }

    /// Remove exactly `key`. Returns whether it was present.
    pub fn remove(&self, key: &str) -> bool {
        let removed = self.inner.remove(key).is_some();
        metrics::record_cache_size(self.inner.len());
        removed
    }

    /// Remove all keys containing `pattern`. Returns how many were removed.
    pub fn invalidate(&self, pattern: &str) -> usize {
        if pattern.is_empty() {
            let count = self.inner.len();
            self.clear();
            return count;
        }

        let before = self.inner.len();
        self.inner.retain(|key, _| !key.contains(pattern));
        let removed = before.saturating_sub(self.inner.len());

        metrics::record_cache_size(self.inner.len());
        tracing::debug!(removed, pattern = %pattern, "Invalidated cache entries");
        removed
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn base_ttl(&self) -> Duration {
        self.base_ttl
    }
}
