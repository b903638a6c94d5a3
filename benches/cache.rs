use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, SamplingMode, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde_json::json;

use atrium::cache::{CacheKey, QueryCache};

fn gen_thread_ids(n: usize, seed: u64) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen::<u64>() % (n as u64)).collect()
}

fn bench_cache(c: &mut Criterion) {
    let ns = [1_000usize, 10_000usize];
    let mut group = c.benchmark_group("query_cache");
    group.sampling_mode(SamplingMode::Flat);
    group.sample_size(20);

    for &n in &ns {
        group.throughput(Throughput::Elements(n as u64));

        // Sequential write of distinct fingerprints
        group.bench_with_input(BenchmarkId::new("write_seq", n.to_string()), &n, |b, &n| {
            b.iter(|| {
                let cache = QueryCache::new();
                for i in 0..n as u64 {
                    cache.write(&CacheKey::new("messages").scoped(i), json!([{"id": i}]));
                }
                criterion::black_box(cache.len());
            });
        });

        // Random read over a pre-populated cache
        group.bench_with_input(BenchmarkId::new("read_rand", n.to_string()), &n, |b, &n| {
            let cache = QueryCache::new();
            for i in 0..n as u64 {
                cache.write(&CacheKey::new("messages").scoped(i), json!([{"id": i}]));
            }
            let ids = gen_thread_ids(n, 0xBEEF_CAFE);
            b.iter(|| {
                let mut hits = 0usize;
                for &id in &ids {
                    if cache.value(&CacheKey::new("messages").scoped(id)).is_some() {
                        hits += 1;
                    }
                }
                criterion::black_box(hits);
            });
        });

        // Invalidate-all, the settle hot path
        group.bench_with_input(BenchmarkId::new("invalidate_all", n.to_string()), &n, |b, &n| {
            let cache = QueryCache::new();
            for i in 0..n as u64 {
                cache.write(&CacheKey::new("messages").scoped(i), json!([{"id": i}]));
            }
            let keys = cache.keys();
            b.iter(|| {
                for k in &keys {
                    cache.invalidate(k);
                }
                criterion::black_box(keys.len());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_cache);
criterion_main!(benches);
