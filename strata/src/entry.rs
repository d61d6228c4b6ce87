//! Cache entries and write options

use std::time::{Duration, Instant};

/// Default entry lifetime when neither the caller nor the provider
/// configuration supplies one: 1 hour.
pub const DEFAULT_TTL_MS: u64 = 3_600_000;

/// Neutral volatility hint used when the caller does not supply one.
pub const DEFAULT_VOLATILITY: f64 = 0.5;

/// A stored cache entry with expiry and access metadata
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// Cached value, opaque to the cache
    pub value: T,
    /// Absolute expiration time
    pub expires_at: Instant,
    /// Group labels for bulk invalidation
    pub tags: Vec<String>,
    /// Caller-supplied change-rate hint in [0, 1]
    pub volatility: f64,
    /// When the entry was written
    pub created_at: Instant,
    /// Last access time (for LRU)
    pub accessed_at: Instant,
    /// Number of successful reads
    pub access_count: u64,
}

impl<T> CacheEntry<T> {
    /// Create a new entry expiring `ttl_ms` from now
    pub fn new(value: T, ttl_ms: u64, tags: Vec<String>, volatility: f64) -> Self {
        let now = Instant::now();
        Self {
            value,
            expires_at: now + Duration::from_millis(ttl_ms),
            tags,
            volatility: volatility.clamp(0.0, 1.0),
            created_at: now,
            accessed_at: now,
            access_count: 0,
        }
    }

    /// Check if the entry has lapsed
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Update access bookkeeping on a successful read
    pub fn touch(&mut self) {
        self.accessed_at = Instant::now();
        self.access_count += 1;
    }

    /// Remaining lifetime in milliseconds (0 once lapsed)
    pub fn remaining_ttl_ms(&self) -> u64 {
        let now = Instant::now();
        if now >= self.expires_at {
            0
        } else {
            (self.expires_at - now).as_millis() as u64
        }
    }
}

/// Options for a cache write
///
/// Missing fields fall back to the provider's configured default TTL and the
/// neutral volatility. A `set` on an existing key fully replaces the entry,
/// including its tags and expiry.
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// TTL override in milliseconds
    pub ttl_ms: Option<u64>,
    /// Group labels recorded for tag invalidation
    pub tags: Vec<String>,
    /// Change-rate hint in [0, 1]
    pub volatility: Option<f64>,
}

impl SetOptions {
    /// Create empty options (provider defaults apply)
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the entry TTL in milliseconds
    pub fn with_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.ttl_ms = Some(ttl_ms);
        self
    }

    /// Attach group labels
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Supply a volatility hint, clamped to [0, 1]
    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = Some(volatility.clamp(0.0, 1.0));
        self
    }
}
