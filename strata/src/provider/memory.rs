//! Bounded in-process cache with LRU eviction

use crate::entry::{CacheEntry, DEFAULT_VOLATILITY, SetOptions};
use crate::error::Result;
use crate::provider::CacheProvider;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Bounded in-process provider
///
/// Entries live in a `HashMap` with a `VecDeque` recency order (most recent
/// at the back). Expiry is enforced lazily on read; capacity is enforced on
/// write by evicting the least-recently-accessed entry. Calls return
/// immediately; the async surface exists for interface uniformity with
/// networked providers.
pub struct MemoryCache<T> {
    inner: RwLock<Inner<T>>,
    stats: RwLock<MemoryCacheStats>,
    default_ttl_ms: u64,
}

struct Inner<T> {
    entries: HashMap<String, CacheEntry<T>>,
    lru_order: VecDeque<String>,
    max_size: usize,
}

/// Statistics for an in-process level
#[derive(Debug, Clone, Default)]
pub struct MemoryCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub entries: usize,
}

impl MemoryCacheStats {
    /// Calculate hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl<T: Clone + Send + Sync + 'static> MemoryCache<T> {
    /// Create a new bounded cache
    pub fn new(max_size: usize, default_ttl_ms: u64) -> Self {
        Self {
            inner: RwLock::new(Inner {
                entries: HashMap::new(),
                lru_order: VecDeque::new(),
                max_size: max_size.max(1),
            }),
            stats: RwLock::new(MemoryCacheStats::default()),
            default_ttl_ms,
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> MemoryCacheStats {
        self.stats.read().clone()
    }

    /// Current number of live entries (expired-but-unswept included)
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }
}

#[async_trait]
impl<T: Clone + Send + Sync + 'static> CacheProvider<T> for MemoryCache<T> {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Option<T> {
        let mut inner = self.inner.write();
        let mut stats = self.stats.write();

        let is_expired = match inner.entries.get(key) {
            Some(entry) => entry.is_expired(),
            None => {
                stats.misses += 1;
                debug!("memory cache MISS for key: {}", key);
                return None;
            }
        };

        if is_expired {
            inner.entries.remove(key);
            inner.lru_order.retain(|k| k != key);
            stats.misses += 1;
            stats.expirations += 1;
            stats.entries = inner.entries.len();
            debug!("memory cache EXPIRE for key: {}", key);
            return None;
        }

        let value = inner.entries.get_mut(key).map(|entry| {
            entry.touch();
            entry.value.clone()
        });

        // Move to back of the recency order (most recent)
        inner.lru_order.retain(|k| k != key);
        inner.lru_order.push_back(key.to_string());

        stats.hits += 1;
        debug!("memory cache HIT for key: {}", key);

        value
    }

    async fn set(&self, key: &str, value: T, options: &SetOptions) -> Result<()> {
        let mut inner = self.inner.write();
        let mut stats = self.stats.write();

        // Full replacement: drop any previous recency slot for the key
        if inner.entries.contains_key(key) {
            inner.lru_order.retain(|k| k != key);
            inner.entries.remove(key);
        }

        // Evict least-recently-accessed entries until there is room
        while inner.entries.len() >= inner.max_size && !inner.lru_order.is_empty() {
            if let Some(evict_key) = inner.lru_order.pop_front() {
                if inner.entries.remove(&evict_key).is_some() {
                    stats.evictions += 1;
                    debug!("memory cache EVICT: {}", evict_key);
                }
            }
        }

        let entry = CacheEntry::new(
            value,
            options.ttl_ms.unwrap_or(self.default_ttl_ms),
            options.tags.clone(),
            options.volatility.unwrap_or(DEFAULT_VOLATILITY),
        );

        inner.entries.insert(key.to_string(), entry);
        inner.lru_order.push_back(key.to_string());
        stats.entries = inner.entries.len();

        debug!("memory cache SET: {}", key);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut inner = self.inner.write();

        let removed = inner.entries.remove(key).is_some();
        if removed {
            inner.lru_order.retain(|k| k != key);
            let mut stats = self.stats.write();
            stats.entries = inner.entries.len();
            debug!("memory cache DELETE: {}", key);
        }
        Ok(removed)
    }

    async fn clear(&self) -> Result<()> {
        let mut inner = self.inner.write();
        let mut stats = self.stats.write();

        let count = inner.entries.len();
        inner.entries.clear();
        inner.lru_order.clear();
        stats.entries = 0;

        debug!("memory cache CLEAR ({} entries)", count);
        Ok(())
    }

    async fn has(&self, key: &str) -> bool {
        let inner = self.inner.read();
        inner.entries.get(key).is_some_and(|e| !e.is_expired())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_set_get() {
        let cache: MemoryCache<Vec<u8>> = MemoryCache::new(100, 60_000);

        cache.set("key1", vec![1, 2, 3], &SetOptions::new()).await.unwrap();

        let value = cache.get("key1").await.unwrap();
        assert_eq!(value, vec![1, 2, 3]);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
    }

    #[tokio::test]
    async fn test_miss() {
        let cache: MemoryCache<u32> = MemoryCache::new(100, 60_000);

        assert!(cache.get("nonexistent").await.is_none());

        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let cache: MemoryCache<u32> = MemoryCache::new(3, 60_000);

        cache.set("key1", 1, &SetOptions::new()).await.unwrap();
        cache.set("key2", 2, &SetOptions::new()).await.unwrap();
        cache.set("key3", 3, &SetOptions::new()).await.unwrap();

        // One more - should evict key1 (oldest)
        cache.set("key4", 4, &SetOptions::new()).await.unwrap();

        assert!(cache.get("key1").await.is_none(), "key1 should be evicted");
        assert!(cache.get("key2").await.is_some());
        assert!(cache.get("key3").await.is_some());
        assert!(cache.get("key4").await.is_some());

        assert_eq!(cache.stats().evictions, 1);
        assert_eq!(cache.len(), 3);
    }

    #[tokio::test]
    async fn test_lru_order_tracks_reads() {
        let cache: MemoryCache<u32> = MemoryCache::new(3, 60_000);

        cache.set("key1", 1, &SetOptions::new()).await.unwrap();
        cache.set("key2", 2, &SetOptions::new()).await.unwrap();
        cache.set("key3", 3, &SetOptions::new()).await.unwrap();

        // Access key1 so key2 becomes the least recently used
        cache.get("key1").await;

        cache.set("key4", 4, &SetOptions::new()).await.unwrap();

        assert!(
            cache.get("key1").await.is_some(),
            "key1 was accessed, should not be evicted"
        );
        assert!(
            cache.get("key2").await.is_none(),
            "key2 should be evicted (oldest)"
        );
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let cache: MemoryCache<u32> = MemoryCache::new(100, 60_000);

        cache
            .set("expiring", 7, &SetOptions::new().with_ttl_ms(30))
            .await
            .unwrap();
        assert!(cache.get("expiring").await.is_some());

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(cache.get("expiring").await.is_none());
        assert_eq!(cache.stats().expirations, 1);
        assert_eq!(cache.len(), 0, "lapsed entry is removed on access");
    }

    #[tokio::test]
    async fn test_set_replaces_entry() {
        let cache: MemoryCache<u32> = MemoryCache::new(100, 60_000);

        cache
            .set("k", 1, &SetOptions::new().with_ttl_ms(30).with_tags(["old"]))
            .await
            .unwrap();
        cache.set("k", 2, &SetOptions::new()).await.unwrap();

        // The rewrite restarted the TTL from the default, so the original
        // 30ms expiry no longer applies
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(cache.get("k").await, Some(2));
    }

    #[tokio::test]
    async fn test_delete() {
        let cache: MemoryCache<u32> = MemoryCache::new(100, 60_000);

        cache.set("key1", 1, &SetOptions::new()).await.unwrap();
        assert!(cache.delete("key1").await.unwrap());
        assert!(!cache.delete("key1").await.unwrap());
        assert!(cache.get("key1").await.is_none());
    }

    #[tokio::test]
    async fn test_clear() {
        let cache: MemoryCache<u32> = MemoryCache::new(100, 60_000);

        cache.set("key1", 1, &SetOptions::new()).await.unwrap();
        cache.set("key2", 2, &SetOptions::new()).await.unwrap();

        cache.clear().await.unwrap();

        assert!(cache.is_empty());
        assert!(cache.get("key1").await.is_none());
        assert!(cache.get("key2").await.is_none());
    }

    #[tokio::test]
    async fn test_has_does_not_touch_recency() {
        let cache: MemoryCache<u32> = MemoryCache::new(3, 60_000);

        cache.set("key1", 1, &SetOptions::new()).await.unwrap();
        cache.set("key2", 2, &SetOptions::new()).await.unwrap();
        cache.set("key3", 3, &SetOptions::new()).await.unwrap();

        // An existence check must not mark key1 recently used
        assert!(cache.has("key1").await);

        cache.set("key4", 4, &SetOptions::new()).await.unwrap();

        assert!(!cache.has("key1").await, "key1 still the eviction candidate");
        assert!(cache.has("key2").await);
    }

    #[tokio::test]
    async fn test_has_respects_expiry() {
        let cache: MemoryCache<u32> = MemoryCache::new(100, 60_000);

        cache
            .set("expiring", 7, &SetOptions::new().with_ttl_ms(30))
            .await
            .unwrap();
        assert!(cache.has("expiring").await);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!cache.has("expiring").await);
    }

    #[tokio::test]
    async fn test_capacity_never_exceeded() {
        let cache: MemoryCache<u32> = MemoryCache::new(5, 60_000);

        for i in 0..50 {
            cache
                .set(&format!("key{}", i), i, &SetOptions::new())
                .await
                .unwrap();
            assert!(cache.len() <= 5);
        }
    }
}
