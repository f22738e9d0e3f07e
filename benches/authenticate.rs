//! Authentication hot path: lookup, verify, two atomic increments.

use std::num::NonZeroU64;
use std::sync::Arc;
use std::thread;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use hotrank::Engine;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const USERS: usize = 100_000;

fn loaded_engine(threshold: u64) -> Engine {
    let engine = Engine::new(NonZeroU64::new(threshold).unwrap());
    engine
        .bulk_insert((0..USERS).map(|i| (format!("user_{i}"), format!("secret_{i}"))))
        .unwrap();
    engine.reorganize();
    engine
}

fn credentials(count: usize, seed: u64) -> Vec<(String, String)> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let i = rng.random_range(0..USERS);
            (format!("user_{i}"), format!("secret_{i}"))
        })
        .collect()
}

fn bench_authenticate_success(c: &mut Criterion) {
    let engine = loaded_engine(u64::MAX);
    let keys = credentials(4096, 7);

    let mut group = c.benchmark_group("authenticate");
    group.throughput(Throughput::Elements(keys.len() as u64));
    group.bench_function("success_no_reorganize", |b| {
        b.iter(|| {
            for (identity, secret) in &keys {
                let _ = std::hint::black_box(engine.authenticate(identity, secret));
            }
        })
    });
    group.bench_function("invalid_credential", |b| {
        b.iter(|| {
            for (identity, _) in &keys {
                let _ = std::hint::black_box(engine.authenticate(identity, "wrong"));
            }
        })
    });
    group.bench_function("not_found", |b| {
        b.iter(|| {
            for (identity, secret) in &keys {
                let _ = std::hint::black_box(
                    engine.authenticate(std::hint::black_box(&identity[1..]), secret),
                );
            }
        })
    });
    group.finish();
}

fn bench_authenticate_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("authenticate_contended");
    for threads in [1usize, 2, 4, 8] {
        let engine = Arc::new(loaded_engine(u64::MAX));
        let per_thread = credentials(1024, 11);
        group.throughput(Throughput::Elements((threads * per_thread.len()) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter(|| {
                thread::scope(|scope| {
                    for _ in 0..threads {
                        let engine = &engine;
                        let keys = &per_thread;
                        scope.spawn(move || {
                            for (identity, secret) in keys {
                                let _ = std::hint::black_box(engine.authenticate(identity, secret));
                            }
                        });
                    }
                });
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_authenticate_success,
    bench_authenticate_contended
);
criterion_main!(benches);
