use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::sync::Arc;
use strata::{CacheConfig, CacheManager, CacheProvider, MemoryCache, SetOptions};

fn bench_memory_set(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let cache: Arc<MemoryCache<Vec<u8>>> = Arc::new(MemoryCache::new(10_000, 60_000));

    c.bench_function("memory_set", |b| {
        b.to_async(&rt).iter(|| async {
            let key = black_box("test_key");
            let value = black_box(b"test_value".to_vec());
            cache.set(key, value, &SetOptions::new()).await.unwrap();
        });
    });
}

fn bench_memory_get(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let cache: Arc<MemoryCache<Vec<u8>>> = Arc::new(MemoryCache::new(10_000, 60_000));

    // Pre-populate
    rt.block_on(async {
        cache
            .set("test_key", b"test_value".to_vec(), &SetOptions::new())
            .await
            .unwrap();
    });

    c.bench_function("memory_get", |b| {
        b.to_async(&rt).iter(|| async {
            let key = black_box("test_key");
            cache.get(key).await;
        });
    });
}

fn bench_memory_eviction_churn(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let cache: Arc<MemoryCache<u64>> = Arc::new(MemoryCache::new(128, 60_000));
    let mut i: u64 = 0;

    c.bench_function("memory_eviction_churn", |b| {
        b.to_async(&rt).iter(|| {
            i += 1;
            let cache = cache.clone();
            async move {
                let key = format!("key{}", black_box(i));
                cache.set(&key, i, &SetOptions::new()).await.unwrap();
            }
        });
    });
}

fn bench_manager_get_hit(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let manager: Arc<CacheManager<Vec<u8>>> = Arc::new(CacheManager::new(CacheConfig::default()));

    rt.block_on(async {
        manager
            .set("test_key", b"test_value".to_vec(), SetOptions::new())
            .await
            .unwrap();
    });

    c.bench_function("manager_get_hit", |b| {
        b.to_async(&rt).iter(|| async {
            let key = black_box("test_key");
            manager.get(key).await;
        });
    });
}

fn bench_manager_set_fanout(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut manager: CacheManager<Vec<u8>> = CacheManager::new(CacheConfig::default());
    manager.add_level(Arc::new(MemoryCache::new(10_000, 60_000)), 10);
    let manager = Arc::new(manager);

    c.bench_function("manager_set_fanout", |b| {
        b.to_async(&rt).iter(|| async {
            let key = black_box("test_key");
            let value = black_box(b"test_value".to_vec());
            manager.set(key, value, SetOptions::new()).await.unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_memory_set,
    bench_memory_get,
    bench_memory_eviction_churn,
    bench_manager_get_hit,
    bench_manager_set_fanout
);
criterion_main!(benches);
