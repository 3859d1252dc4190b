//! Pool allocation benchmarks
//!
//! Measures bump allocation, construction with registered cleanups, and
//! clear/recycle cycles against the system allocator.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use regionpool::Pool;

fn pool() -> Pool<'static> {
    regionpool::init().unwrap();
    Pool::new().unwrap()
}

fn bench_allocate_raw(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocate_raw");

    for size in [8, 64, 512, 4096].iter() {
        group.bench_with_input(BenchmarkId::new("pool", size), size, |b, &size| {
            let mut pool = pool();
            b.iter(|| {
                for _ in 0..256 {
                    black_box(pool.allocate_raw(size).unwrap());
                }
                pool.clear().unwrap();
            });
        });

        group.bench_with_input(BenchmarkId::new("system", size), size, |b, &size| {
            b.iter(|| {
                let boxes: Vec<Box<[u8]>> =
                    (0..256).map(|_| vec![0u8; size].into_boxed_slice()).collect();
                black_box(boxes);
            });
        });
    }

    group.finish();
}

fn bench_construct(c: &mut Criterion) {
    let mut group = c.benchmark_group("construct");

    for count in [16, 256, 4096].iter() {
        group.bench_with_input(BenchmarkId::new("plain", count), count, |b, &count| {
            let mut pool = pool();
            b.iter(|| {
                for i in 0..count {
                    black_box(pool.construct(i as u64).unwrap());
                }
                pool.clear().unwrap();
            });
        });

        // Values with destructors exercise the cleanup registry
        group.bench_with_input(BenchmarkId::new("with_drop", count), count, |b, &count| {
            let mut pool = pool();
            b.iter(|| {
                for i in 0..count {
                    black_box(pool.construct(format!("value-{}", i)).unwrap());
                }
                pool.clear().unwrap();
            });
        });
    }

    group.finish();
}

fn bench_duplicate_string(c: &mut Criterion) {
    let text = "the quick brown fox jumps over the lazy dog";

    c.bench_function("duplicate_string", |b| {
        let mut pool = pool();
        b.iter(|| {
            for _ in 0..256 {
                black_box(pool.duplicate_string(black_box(text)).unwrap());
            }
            pool.clear().unwrap();
        });
    });
}

criterion_group!(benches, bench_allocate_raw, bench_construct, bench_duplicate_string);
criterion_main!(benches);
