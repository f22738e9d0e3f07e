//! DHAT heap profiler for hotrank.
//!
//! Run with: cargo run --bin dhat_profile --release --features dhat-heap
//! View results: Open dhat-heap.json in <https://nnethercote.github.io/dh_view/dh_view.html>

#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use hotrank::{Engine, ReorganizePolicy};

/// Simple XorShift64 RNG for deterministic workloads.
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn next_f64(&mut self) -> f64 {
        const SCALE: f64 = 1.0 / (u64::MAX as f64);
        (self.next_u64() as f64) * SCALE
    }
}

fn load(engine: &Engine, users: usize) {
    let batch = (0..users).map(|i| (format!("user_{i}"), format!("secret-{i}")));
    if let Err(err) = engine.bulk_insert(batch) {
        eprintln!("bulk insert failed: {err}");
    }
}

/// Hotset traffic: 90% of authentications hit 10% of users.
fn hotset_traffic(engine: &Engine, users: usize, operations: usize, seed: u64) {
    let mut rng = XorShift64::new(seed);
    let hot = (users / 10).max(1) as u64;
    let users = users as u64;

    for _ in 0..operations {
        let i = if rng.next_f64() < 0.9 {
            rng.next_u64() % hot
        } else {
            rng.next_u64() % users
        };
        let _ = engine.authenticate(&format!("user_{i}"), format!("secret-{i}"));
    }
}

fn profile(policy: ReorganizePolicy) {
    println!("=== Profiling {policy:?} ===");
    let users = 50_000;
    let operations = 200_000;

    let engine = match Engine::builder(10_000).policy(policy).try_build() {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("{err}");
            return;
        },
    };
    load(&engine, users);
    hotset_traffic(&engine, users, operations, 42);
    engine.wait_idle();

    let metrics = engine.metrics();
    println!("  Records: {}", metrics.records);
    println!("  Reorganizations: {}", metrics.reorganizations);
    println!("  Max pass: {:?}", metrics.max_reorganization);
}

fn main() {
    let _profiler = dhat::Profiler::new_heap();

    println!("hotrank DHAT Heap Profiling");
    println!("===========================\n");

    profile(ReorganizePolicy::Synchronous);
    profile(ReorganizePolicy::Background);

    println!("\n===========================");
    println!("Profile written to dhat-heap.json");
}
