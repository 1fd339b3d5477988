//! Throughput Benchmark for LineKV
//!
//! Measures the store engine's raw command throughput, plus the full
//! parse-dispatch-render path a connection would take.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use linekv::commands::Dispatcher;
use linekv::storage::Store;
use std::sync::{Arc, Mutex};

/// Benchmark SET operations
fn bench_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_small", |b| {
        let mut store = Store::new();
        let mut i = 0u64;
        b.iter(|| {
            store
                .set(&format!("key:{i}"), "small_value", None)
                .unwrap();
            i += 1;
        });
    });

    group.bench_function("set_medium", |b| {
        let mut store = Store::new();
        let value = "x".repeat(1024); // 1KB value
        let mut i = 0u64;
        b.iter(|| {
            store.set(&format!("key:{i}"), &value, None).unwrap();
            i += 1;
        });
    });

    group.bench_function("set_with_expiry", |b| {
        let mut store = Store::new();
        let mut i = 0u64;
        b.iter(|| {
            store
                .set(&format!("key:{i}"), "value", Some("60000"))
                .unwrap();
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark GET operations
fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut store = Store::new();
        // Pre-populate with data
        for i in 0..100_000 {
            store
                .set(&format!("key:{i}"), &format!("value:{i}"), None)
                .unwrap();
        }

        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key:{}", i % 100_000);
            black_box(store.get(&key).unwrap());
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut store = Store::new();
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("missing:{i}");
            black_box(store.get(&key).unwrap());
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark list operations
fn bench_lists(c: &mut Criterion) {
    let mut group = c.benchmark_group("lists");
    group.throughput(Throughput::Elements(1));

    group.bench_function("lpush", |b| {
        let mut store = Store::new();
        let values = vec!["value".to_string()];
        b.iter(|| {
            black_box(store.lpush("bench-list", &values).unwrap());
        });
    });

    group.bench_function("lrange_100", |b| {
        let mut store = Store::new();
        let values: Vec<String> = (0..100).map(|i| format!("item:{i}")).collect();
        store.rpush("bench-list", &values).unwrap();

        b.iter(|| {
            black_box(store.lrange("bench-list", 0, -1).unwrap());
        });
    });

    group.finish();
}

/// Benchmark the full line dispatch path (parse + lock + execute + render)
fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Elements(1));

    group.bench_function("dispatch_set", |b| {
        let dispatcher = Dispatcher::new(Arc::new(Mutex::new(Store::new())));
        let mut i = 0u64;
        b.iter(|| {
            black_box(dispatcher.dispatch(&format!("SET key:{i} value")));
            i += 1;
        });
    });

    group.bench_function("dispatch_get", |b| {
        let store = Arc::new(Mutex::new(Store::new()));
        store
            .lock()
            .unwrap()
            .set("hot-key", "value", None)
            .unwrap();
        let dispatcher = Dispatcher::new(store);

        b.iter(|| {
            black_box(dispatcher.dispatch("GET hot-key"));
        });
    });

    group.finish();
}

criterion_group!(benches, bench_set, bench_get, bench_lists, bench_dispatch);
criterion_main!(benches);
