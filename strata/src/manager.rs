//! Tiered cache manager
//!
//! Orchestrates one or more [`CacheProvider`] levels ranked by weight
//! (fastest first). Lookups scan levels in order and promote values found
//! in a slower level back into every faster one; writes fan out to all
//! levels. The manager also keeps the tag index used for group
//! invalidation and the per-key volatility history behind the advisory
//! adaptive-TTL signal.

use crate::config::CacheConfig;
use crate::entry::SetOptions;
use crate::error::Result;
use crate::metrics::{MetricsSink, NoopMetrics};
use crate::provider::{CacheProvider, MemoryCache};
use futures::future::join_all;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Weight of the in-process level created at construction. Levels added
/// later rank above it only with a larger weight.
pub const MEMORY_LEVEL_WEIGHT: u32 = 100;

/// One ranked provider inside a manager
pub struct CacheLevel<T> {
    provider: Arc<dyn CacheProvider<T>>,
    weight: u32,
}

impl<T> CacheLevel<T> {
    pub fn provider(&self) -> &Arc<dyn CacheProvider<T>> {
        &self.provider
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }
}

/// Tiered cache manager
///
/// Construct one per logical cache and pass it where needed; there is no
/// process-wide instance. Levels are fixed once added, so `add_level` takes
/// `&mut self` and everything after composition works through `&self`.
pub struct CacheManager<T> {
    levels: Vec<CacheLevel<T>>,
    tag_index: RwLock<HashMap<String, HashSet<String>>>,
    volatility: RwLock<HashMap<String, VecDeque<f64>>>,
    metrics: Arc<dyn MetricsSink>,
    config: CacheConfig,
}

impl<T: Clone + Send + Sync + 'static> CacheManager<T> {
    /// Create a manager with its in-process level
    pub fn new(config: CacheConfig) -> Self {
        let config = config.normalized();
        info!(
            "initializing cache manager namespace={} max_size={} default_ttl_ms={}",
            config.namespace, config.max_size, config.default_ttl_ms
        );

        let memory: Arc<dyn CacheProvider<T>> =
            Arc::new(MemoryCache::new(config.max_size, config.default_ttl_ms));

        Self {
            levels: vec![CacheLevel {
                provider: memory,
                weight: MEMORY_LEVEL_WEIGHT,
            }],
            tag_index: RwLock::new(HashMap::new()),
            volatility: RwLock::new(HashMap::new()),
            metrics: Arc::new(NoopMetrics),
            config,
        }
    }

    /// Replace the metrics sink
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Append a level and re-rank all levels by descending weight
    ///
    /// Equal weights keep their prior relative order.
    pub fn add_level(&mut self, provider: Arc<dyn CacheProvider<T>>, weight: u32) {
        info!("adding cache level {} (weight={})", provider.name(), weight);
        self.levels.push(CacheLevel { provider, weight });
        self.levels.sort_by(|a, b| b.weight.cmp(&a.weight));
    }

    /// Ranked levels, fastest first
    pub fn levels(&self) -> &[CacheLevel<T>] {
        &self.levels
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Bare keys currently recorded under a tag
    pub fn tagged_keys(&self, tag: &str) -> Vec<String> {
        self.tag_index
            .read()
            .get(tag)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.config.namespace, key)
    }

    fn record(&self, name: &str, extra: &[(&str, String)]) {
        let mut attrs = vec![("namespace", self.config.namespace.clone())];
        attrs.extend(extra.iter().map(|(k, v)| (*k, v.clone())));
        self.metrics.record(name, &attrs);
    }

    /// Look a key up across levels, promoting hits from slower levels
    pub async fn get(&self, key: &str) -> Option<T> {
        let full_key = self.namespaced(key);

        for (idx, level) in self.levels.iter().enumerate() {
            let Some(value) = level.provider.get(&full_key).await else {
                continue;
            };

            debug!(
                "cache hit for {} at level {} ({})",
                key,
                idx,
                level.provider.name()
            );
            self.record("cache_hit", &[("level", idx.to_string())]);

            // Backfill every faster level. Promotion carries the value
            // only: each level applies its own default TTL, and tags stay
            // with the original write.
            for faster in &self.levels[..idx] {
                if let Err(e) = faster
                    .provider
                    .set(&full_key, value.clone(), &SetOptions::default())
                    .await
                {
                    warn!(
                        "promotion of {} to {} failed: {}",
                        key,
                        faster.provider.name(),
                        e
                    );
                }
            }

            return Some(value);
        }

        self.record("cache_miss", &[]);
        None
    }

    /// Write a value to every level
    pub async fn set(&self, key: &str, value: T, options: SetOptions) -> Result<()> {
        let full_key = self.namespaced(key);
        let options = SetOptions {
            ttl_ms: Some(options.ttl_ms.unwrap_or(self.config.default_ttl_ms)),
            ..options
        };

        let writes = self
            .levels
            .iter()
            .map(|level| level.provider.set(&full_key, value.clone(), &options));
        let results = join_all(writes).await;

        if !options.tags.is_empty() {
            let mut index = self.tag_index.write();
            for tag in &options.tags {
                index.entry(tag.clone()).or_default().insert(key.to_string());
            }
        }

        if let Some(volatility) = options.volatility {
            let mut history = self.volatility.write();
            let samples = history.entry(key.to_string()).or_default();
            samples.push_back(volatility);
            while samples.len() > self.config.adaptive.history_limit {
                samples.pop_front();
            }
        }

        self.record("cache_set", &[]);

        // All levels were attempted; surface the first fault afterwards so a
        // slow level cannot leave faster ones unwritten.
        results.into_iter().collect::<Result<Vec<_>>>()?;
        Ok(())
    }

    /// Delete a key from every level
    ///
    /// `Ok(true)` only when every level actually removed the key.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let full_key = self.namespaced(key);

        let deletes = self
            .levels
            .iter()
            .map(|level| level.provider.delete(&full_key));
        let results = join_all(deletes).await;

        self.drop_key_from_tags(key);
        self.volatility.write().remove(key);
        self.record("cache_delete", &[]);

        let mut all_removed = true;
        let mut first_err = None;
        for result in results {
            match result {
                Ok(removed) => all_removed &= removed,
                Err(e) => first_err = first_err.or(Some(e)),
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(all_removed),
        }
    }

    /// Delete every key recorded under a tag
    ///
    /// Deletions run concurrently and are awaited together; one failure does
    /// not stop the others. Keys whose deletion failed are retained under the
    /// tag so a retry can still reach them; the tag entry is dropped only
    /// once no member is left. Returns the snapshot size.
    pub async fn invalidate_by_tag(&self, tag: &str) -> usize {
        let keys: Vec<String> = self.tagged_keys(tag);
        let count = keys.len();

        debug!("invalidating tag {} ({} keys)", tag, count);

        let results = join_all(keys.iter().map(|key| self.delete(key))).await;

        let mut failed: HashSet<String> = HashSet::new();
        for (key, result) in keys.iter().zip(results) {
            if let Err(e) = result {
                warn!("tag invalidation left {} cached: {}", key, e);
                failed.insert(key.clone());
            }
        }

        let mut index = self.tag_index.write();
        if failed.is_empty() {
            index.remove(tag);
        } else {
            index.insert(tag.to_string(), failed);
        }
        drop(index);

        self.record(
            "cache_invalidate_tag",
            &[("tag", tag.to_string()), ("keys", count.to_string())],
        );

        count
    }

    /// Clear every level and all manager-local bookkeeping
    pub async fn clear(&self) -> Result<()> {
        let clears = self.levels.iter().map(|level| level.provider.clear());
        let results = join_all(clears).await;

        self.tag_index.write().clear();
        self.volatility.write().clear();
        self.record("cache_clear", &[]);

        results.into_iter().collect::<Result<Vec<_>>>()?;
        Ok(())
    }

    /// Suggest a TTL for a key from its recorded volatility history
    ///
    /// Advisory only: `set` never applies this on its own. Callers opt in by
    /// passing the result as the TTL option.
    pub fn adaptive_ttl(&self, key: &str, base_ttl_ms: u64) -> u64 {
        let history = self.volatility.read();
        let Some(samples) = history.get(key).filter(|s| !s.is_empty()) else {
            return base_ttl_ms;
        };

        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        if mean > self.config.adaptive.high_watermark {
            base_ttl_ms / 2
        } else if mean < self.config.adaptive.low_watermark {
            base_ttl_ms * 2
        } else {
            base_ttl_ms
        }
    }

    fn drop_key_from_tags(&self, key: &str) {
        let mut index = self.tag_index.write();
        index.retain(|_, keys| {
            keys.remove(key);
            !keys.is_empty()
        });
    }
}
