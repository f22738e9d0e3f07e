//! Loads generated users into an engine and replays skewed login traffic.
//!
//! Usage:
//!   cargo run --release --package bench-support --bin simulate -- \
//!     --users 1000000 --batch-size 100000 --queries 10000000 --threshold 1000000

use std::time::Duration;

use anyhow::Context;
use bench_support::metrics::LatencyStats;
use bench_support::simulation::{TrafficConfig, load_users, prometheus_metrics, simulate_traffic};
use clap::{Parser, ValueEnum};
use hotrank::{Engine, ReorganizePolicy};
use tracing::info;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Policy {
    Sync,
    Background,
}

impl From<Policy> for ReorganizePolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Sync => ReorganizePolicy::Synchronous,
            Policy::Background => ReorganizePolicy::Background,
        }
    }
}

/// Simulate command line arguments.
#[derive(Parser, Debug)]
#[command(name = "simulate")]
#[command(about = "Bulk-load users into hotrank and replay skewed authentication traffic")]
struct Args {
    /// Number of users to generate
    #[arg(long, default_value_t = 1_000_000)]
    users: usize,

    /// Users per bulk insert
    #[arg(long, default_value_t = 100_000)]
    batch_size: usize,

    /// Authentications to replay
    #[arg(long, default_value_t = 10_000_000)]
    queries: u64,

    /// Successful authentications between reorganizations
    #[arg(long, default_value_t = 1_000_000)]
    threshold: u64,

    /// Fraction of users that are power users, and the chance a query picks one
    #[arg(long, default_value_t = 0.75)]
    power_users_ratio: f64,

    /// Worker threads replaying traffic
    #[arg(long, default_value_t = 1)]
    threads: usize,

    /// When a threshold-crossing call reorganizes
    #[arg(long, value_enum, default_value_t = Policy::Sync)]
    policy: Policy,

    /// Index shards (defaults to available parallelism)
    #[arg(long)]
    shards: Option<usize>,

    /// Latency at which a call is reported as slow, in microseconds
    #[arg(long, default_value_t = 1_000)]
    slow_call_us: u64,

    /// RNG seed for credentials and traffic
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Also print final engine metrics in Prometheus text format
    #[arg(long)]
    prometheus: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    setup_tracing(args.verbose);

    let mut builder = Engine::builder(args.threshold)
        .policy(args.policy.into())
        .capacity_hint(args.users);
    if let Some(shards) = args.shards {
        builder = builder.shards(shards);
    }
    let engine = builder.try_build().context("invalid engine configuration")?;

    info!(users = args.users, batch_size = args.batch_size, "starting user generation");
    let (load, credentials) = load_users(&engine, args.users, args.batch_size, args.seed)
        .context("user generation produced a duplicate identity")?;
    println!(
        "Generated {} users in {:.2} seconds ({} batches).",
        load.users,
        load.elapsed.as_secs_f64(),
        load.batches
    );
    print_latency("Batch insert", &load.batch_latency);

    info!(queries = args.queries, threads = args.threads, "starting traffic simulation");
    let config = TrafficConfig {
        queries: args.queries,
        power_users_ratio: args.power_users_ratio,
        threads: args.threads,
        seed: args.seed.wrapping_add(1),
        slow_call: Duration::from_micros(args.slow_call_us),
    };
    let traffic = simulate_traffic(&engine, &credentials, &config);
    println!(
        "Simulated {} queries in {:.2} seconds.",
        traffic.queries,
        traffic.elapsed.as_secs_f64()
    );

    println!("Average request time: {:.9} seconds", traffic.average_request.as_secs_f64());
    println!("Maximum request time: {:.9} seconds", traffic.max_request.as_secs_f64());
    print_latency("Request", &traffic.request_latency);
    println!("Slow requests (>= {} us): {}", args.slow_call_us, traffic.slow_calls);
    println!("Failed requests: {}", traffic.failures);

    let metrics = engine.metrics();
    println!(
        "Reorganizations: {} completed, {} coalesced, {} aborted",
        metrics.reorganizations, metrics.coalesced_triggers, metrics.aborted_reorganizations
    );
    println!(
        "Average reorganize time: {:.9} seconds",
        metrics.average_reorganization().as_secs_f64()
    );
    println!(
        "Maximum reorganize time: {:.9} seconds",
        metrics.max_reorganization.as_secs_f64()
    );

    println!("Top users:");
    for (rank, (identity, count)) in engine.top(10).into_iter().enumerate() {
        println!("  {:>2}. {identity} ({count})", rank + 1);
    }

    if args.prometheus {
        print!("{}", prometheus_metrics(&engine, "hotrank"));
    }

    Ok(())
}

fn print_latency(label: &str, stats: &LatencyStats) {
    println!(
        "{label} latency: min={:?} p50={:?} p95={:?} p99={:?} max={:?} (n={})",
        stats.min, stats.p50, stats.p95, stats.p99, stats.max, stats.sample_count
    );
}

fn setup_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("hotrank=debug,bench_support=debug,info")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
