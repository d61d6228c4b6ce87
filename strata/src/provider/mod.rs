//! Cache providers
//!
//! A provider is one storage level behind the manager:
//! - `MemoryCache`: bounded in-process store with LRU eviction
//! - `RemoteCache`: durable store on a remote KV service with server-side expiry

pub mod memory;
pub mod remote;

pub use memory::{MemoryCache, MemoryCacheStats};
pub use remote::{RemoteCache, RemoteConfig};

use crate::entry::SetOptions;
use crate::error::Result;
use async_trait::async_trait;

/// Uniform key-value store contract implemented by every cache level
///
/// Read paths never error: a provider experiencing a transient fault reports
/// a miss, since the cache is a non-authoritative accelerator and the caller
/// can always recompute the true value. Write paths propagate faults.
#[async_trait]
pub trait CacheProvider<T>: Send + Sync
where
    T: Send + Sync + 'static,
{
    /// Provider name used in logs and metric labels
    fn name(&self) -> &str;

    /// Return the value if present and unexpired, updating access bookkeeping
    async fn get(&self, key: &str) -> Option<T>;

    /// Store a value, fully replacing any existing entry for the key
    async fn set(&self, key: &str, value: T, options: &SetOptions) -> Result<()>;

    /// Remove a key, reporting whether it was present
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Remove every entry this provider holds under its namespace
    async fn clear(&self) -> Result<()>;

    /// Whether `get` would return a value, without touching access bookkeeping
    async fn has(&self, key: &str) -> bool;
}
