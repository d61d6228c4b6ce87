//! Tiered Cache Example
//!
//! Demonstrates manager construction, tagged writes, tag invalidation, and
//! the advisory adaptive-TTL signal. Set STRATA_REMOTE_URL to also attach a
//! remote level.
//!
//! Usage:
//!   cargo run --example tiered

use std::sync::Arc;
use strata::{CacheConfig, CacheManager, RemoteCache, RemoteConfig, SetOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let config = CacheConfig {
        namespace: "demo".to_string(),
        ..Default::default()
    };
    let mut manager: CacheManager<f64> = CacheManager::new(config);

    // Optionally attach a slower durable level behind the in-process one
    if let Ok(url) = std::env::var("STRATA_REMOTE_URL") {
        let remote = RemoteCache::new(RemoteConfig::new(url).with_namespace("demo"))?;
        manager.add_level(Arc::new(remote), 10);
    }

    println!("1. Writing tagged prices");
    manager
        .set(
            "price:42",
            19.99,
            SetOptions::new().with_tags(["prices"]).with_volatility(0.9),
        )
        .await?;
    manager
        .set(
            "price:7",
            4.25,
            SetOptions::new().with_tags(["prices"]).with_volatility(0.85),
        )
        .await?;

    println!("2. Reading back");
    println!("   price:42 = {:?}", manager.get("price:42").await);

    println!("3. Adaptive TTL suggestion for a volatile key");
    let suggested = manager.adaptive_ttl("price:42", 60_000);
    println!("   suggested TTL: {}ms (base 60000ms)", suggested);

    // Callers opt in by passing the suggestion back as the TTL
    manager
        .set(
            "price:42",
            20.49,
            SetOptions::new()
                .with_ttl_ms(suggested)
                .with_tags(["prices"])
                .with_volatility(0.9),
        )
        .await?;

    println!("4. Invalidating the whole tag");
    let affected = manager.invalidate_by_tag("prices").await;
    println!("   dropped {} keys", affected);
    println!("   price:42 = {:?}", manager.get("price:42").await);

    Ok(())
}
