//! Throughput Benchmark for BlinkDB
//!
//! Measures the storage engine under string, list, and mixed workloads,
//! plus the cost of constant eviction churn at a small capacity.

use blinkdb::storage::StorageEngine;
use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;

/// Benchmark SET operations
fn bench_set(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::with_capacity(200_000));

    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_small", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i % 100_000));
            engine.set(&key, Bytes::from("small_value"));
            i += 1;
        });
    });

    group.bench_function("set_medium", |b| {
        let mut i = 0u64;
        let value = Bytes::from("x".repeat(1024)); // 1KB value
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i % 100_000));
            engine.set(&key, value.clone());
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark GET operations
fn bench_get(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::with_capacity(200_000));

    // Pre-populate with data
    for i in 0..100_000 {
        let key = Bytes::from(format!("key:{i}"));
        engine.set(&key, Bytes::from(format!("value:{i}")));
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i % 100_000));
            black_box(engine.get(&key).unwrap());
            i += 1;
        });
    });

    // absent keys exercise the filter short-circuit
    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("missing:{i}"));
            black_box(engine.get(&key).unwrap());
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark list push/pop at both ends
fn bench_list(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::with_capacity(10_000));

    let mut group = c.benchmark_group("list");
    group.throughput(Throughput::Elements(1));

    group.bench_function("push_back_pop_front", |b| {
        let key = Bytes::from("queue");
        b.iter(|| {
            engine.push_back(&key, Bytes::from("element")).unwrap();
            black_box(engine.pop_front(&key).unwrap());
        });
    });

    group.bench_function("range_100", |b| {
        let key = Bytes::from("wide");
        for i in 0..100 {
            engine
                .push_back(&key, Bytes::from(format!("e{i}")))
                .unwrap();
        }
        b.iter(|| {
            black_box(engine.range(&key, 0, -1).unwrap());
        });
    });

    group.finish();
}

/// Benchmark mixed workload (80% reads, 20% writes)
fn bench_mixed(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::with_capacity(20_000));

    for i in 0..10_000 {
        let key = Bytes::from(format!("key:{i}"));
        engine.set(&key, Bytes::from(format!("value:{i}")));
    }

    let mut group = c.benchmark_group("mixed");
    group.throughput(Throughput::Elements(1));

    group.bench_function("80_read_20_write", |b| {
        let mut i = 0u64;
        b.iter(|| {
            if i % 5 == 0 {
                let key = Bytes::from(format!("key:{}", i % 10_000));
                engine.set(&key, Bytes::from("value"));
            } else {
                let key = Bytes::from(format!("key:{}", i % 10_000));
                black_box(engine.get(&key).unwrap());
            }
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark eviction churn: every insert at capacity ejects a key
fn bench_eviction(c: &mut Criterion) {
    let mut group = c.benchmark_group("eviction");
    group.throughput(Throughput::Elements(1));

    group.bench_function("insert_at_capacity", |b| {
        let engine = StorageEngine::with_capacity(1000);
        for i in 0..1000 {
            engine.set(&Bytes::from(format!("warm:{i}")), Bytes::from("v"));
        }

        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("churn:{i}"));
            engine.set(&key, Bytes::from("v"));
            i += 1;
        });
    });

    group.finish();
}

criterion_group!(benches, bench_set, bench_get, bench_list, bench_mixed, bench_eviction);

criterion_main!(benches);
