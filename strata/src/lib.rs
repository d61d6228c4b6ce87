//! # Strata
//!
//! Tiered, tag-aware caching for Rust services.
//!
//! ## Features
//!
//! - **Ranked levels**: an in-process LRU level out of the box, with
//!   optional slower levels (e.g. a remote KV service) behind it
//! - **Read-through promotion**: values found in a slow level are copied
//!   back into every faster level
//! - **Tag invalidation**: drop every entry sharing a group label in one call
//! - **Adaptive TTL**: an advisory TTL suggestion computed from each key's
//!   recent volatility history
//! - **Pluggable metrics**: inject a [`MetricsSink`]; a Prometheus-backed
//!   sink ships with the crate
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use strata::{CacheConfig, CacheManager, SetOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager: CacheManager<f64> = CacheManager::new(CacheConfig::default());
//!
//!     manager
//!         .set(
//!             "price:42",
//!             19.99,
//!             SetOptions::new().with_ttl_ms(60_000).with_tags(["prices"]),
//!         )
//!         .await?;
//!
//!     let price = manager.get("price:42").await;
//!     println!("price: {:?}", price);
//!
//!     manager.invalidate_by_tag("prices").await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod entry;
pub mod error;
pub mod manager;
pub mod metrics;
pub mod provider;

pub use config::{AdaptiveTtlConfig, CacheConfig, Environment};
pub use entry::{CacheEntry, DEFAULT_TTL_MS, DEFAULT_VOLATILITY, SetOptions};
pub use error::{Result, StrataError};
pub use manager::{CacheLevel, CacheManager, MEMORY_LEVEL_WEIGHT};
pub use metrics::{MetricsSink, NoopMetrics, PrometheusMetrics, encode_metrics};
pub use provider::{CacheProvider, MemoryCache, MemoryCacheStats, RemoteCache, RemoteConfig};
