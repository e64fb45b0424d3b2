//! Throughput Benchmark for SnapKV
//!
//! This benchmark measures the performance of the store under various
//! workloads. Writes include the snapshot rewrite, so their cost grows with
//! the number of keys held.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use snapkv::storage::{snapshot, Entry, Store, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Opens a store already holding `n` keys, written with a single snapshot.
fn preloaded(dir: &Path, n: usize) -> Store {
    let path = dir.join("bench.json");
    let entries: HashMap<String, Entry> = (0..n)
        .map(|i| (format!("key:{}", i), Entry::new(Value::from(format!("value:{}", i)))))
        .collect();
    snapshot::save(&entries, &path).unwrap();
    Store::open(path)
}

/// Benchmark SET operations against stores of different sizes
fn bench_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    for size in [0usize, 100, 1_000] {
        let dir = tempfile::tempdir().unwrap();
        let store = preloaded(dir.path(), size);

        group.bench_with_input(BenchmarkId::new("set_small", size), &size, |b, _| {
            let mut i = 0u64;
            b.iter(|| {
                store.set(format!("new:{}", i % 64), "small_value").unwrap();
                i += 1;
            });
        });
    }

    group.finish();
}

/// Benchmark GET operations
fn bench_get(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let store = preloaded(dir.path(), 100_000);

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(store.get(&format!("key:{}", i % 100_000)));
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(store.get(&format!("missing:{}", i)));
            i += 1;
        });
    });

    group.bench_function("ttl", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(store.ttl(&format!("key:{}", i % 100_000)));
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark mixed workload (95% reads, 5% writes)
fn bench_mixed(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let store = preloaded(dir.path(), 1_000);

    let mut group = c.benchmark_group("mixed");
    group.throughput(Throughput::Elements(1));

    group.bench_function("95_read_5_write", |b| {
        let mut i = 0u64;
        b.iter(|| {
            if i % 20 == 0 {
                store.set_with_ttl(format!("key:{}", i % 1_000), "value", 3600).unwrap();
            } else {
                black_box(store.get(&format!("key:{}", i % 1_000)));
            }
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark concurrent readers contending for the single lock
fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(preloaded(dir.path(), 10_000));

    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_get", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let store = Arc::clone(&store);
                    thread::spawn(move || {
                        for i in 0..10_000 {
                            black_box(store.get(&format!("key:{}", (i * 4 + t) % 10_000)));
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }
        });
    });

    group.finish();
}

/// Benchmark the bulk listing
fn bench_all(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let store = preloaded(dir.path(), 10_000);

    let mut group = c.benchmark_group("all");

    group.bench_function("all_10k", |b| {
        b.iter(|| {
            black_box(store.all());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_set,
    bench_get,
    bench_mixed,
    bench_concurrent,
    bench_all,
);

criterion_main!(benches);
