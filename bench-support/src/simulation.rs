//! Load and traffic drivers.
//!
//! ```text
//!   load_users ──► CredentialGenerator::batch ──► Engine::bulk_insert (per batch)
//!
//!   simulate_traffic
//!        │  thread::scope, one TrafficModel fork per worker
//!        ▼
//!   next_user ──► Engine::authenticate ──► LatencySampler
//!                        │
//!                        └── ReorgTrigger::Completed(report) ──► reorganization sampler
//! ```

use std::thread;
use std::time::{Duration, Instant};

use hotrank::metrics::{MetricsExporter, MetricsSnapshotProvider, PrometheusTextExporter};
use hotrank::{DuplicateIdentity, Engine, ReorgTrigger};
use tracing::{debug, info};

use crate::metrics::{LatencySampler, LatencyStats};
use crate::workload::{CredentialGenerator, TrafficModel};

const MAX_LATENCY_SAMPLES: usize = 100_000;

/// Outcome of [`load_users`].
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub users: usize,
    pub batches: usize,
    pub elapsed: Duration,
    pub batch_latency: LatencyStats,
}

/// Generates `users` credentials and inserts them `batch_size` at a time.
///
/// Returns the generated credentials so traffic can present them.
pub fn load_users(
    engine: &Engine,
    users: usize,
    batch_size: usize,
    seed: u64,
) -> Result<(LoadReport, Vec<(String, String)>), DuplicateIdentity> {
    let batch_size = batch_size.max(1);
    let mut generator = CredentialGenerator::new(seed);
    let mut credentials = Vec::with_capacity(users);
    let mut sampler = LatencySampler::new(users.div_ceil(batch_size), 1);
    let started = Instant::now();

    for start in (0..users).step_by(batch_size) {
        let end = (start + batch_size).min(users);
        let batch = generator.batch(start..end);

        let batch_started = Instant::now();
        engine.bulk_insert(batch.iter().map(|(id, secret)| (id.as_str(), secret.as_str())))?;
        sampler.record(batch_started.elapsed());
        debug!(start, end, "batch added");

        credentials.extend(batch);
    }

    let report = LoadReport {
        users,
        batches: sampler.count() as usize,
        elapsed: started.elapsed(),
        batch_latency: sampler.stats(),
    };
    Ok((report, credentials))
}

/// Parameters for [`simulate_traffic`].
#[derive(Debug, Clone, Copy)]
pub struct TrafficConfig {
    pub queries: u64,
    pub power_users_ratio: f64,
    pub threads: usize,
    pub seed: u64,
    /// Calls at or above this latency count as slow.
    pub slow_call: Duration,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            queries: 1_000_000,
            power_users_ratio: 0.75,
            threads: 1,
            seed: 42,
            slow_call: Duration::from_millis(1),
        }
    }
}

/// Outcome of [`simulate_traffic`].
#[derive(Debug, Clone)]
pub struct TrafficReport {
    pub queries: u64,
    pub failures: u64,
    pub slow_calls: u64,
    pub elapsed: Duration,
    pub average_request: Duration,
    pub max_request: Duration,
    pub request_latency: LatencyStats,
    /// Passes run inline by an authentication.
    pub reorganizations: u64,
    pub average_reorganization: Duration,
    pub max_reorganization: Duration,
    pub scheduled: u64,
    pub coalesced: u64,
    pub aborted: u64,
}

#[derive(Debug)]
struct WorkerTally {
    requests: LatencySampler,
    reorganizations: LatencySampler,
    failures: u64,
    slow_calls: u64,
    scheduled: u64,
    coalesced: u64,
    aborted: u64,
}

impl WorkerTally {
    fn new(sample_capacity: usize) -> Self {
        Self {
            requests: LatencySampler::new(sample_capacity, 1),
            reorganizations: LatencySampler::new(sample_capacity, 1),
            failures: 0,
            slow_calls: 0,
            scheduled: 0,
            coalesced: 0,
            aborted: 0,
        }
    }

    fn merge(&mut self, other: WorkerTally) {
        self.requests.merge(other.requests);
        self.reorganizations.merge(other.reorganizations);
        self.failures += other.failures;
        self.slow_calls += other.slow_calls;
        self.scheduled += other.scheduled;
        self.coalesced += other.coalesced;
        self.aborted += other.aborted;
    }
}

fn drive(
    engine: &Engine,
    credentials: &[(String, String)],
    mut model: TrafficModel,
    queries: u64,
    slow_call: Duration,
    sample_capacity: usize,
) -> WorkerTally {
    let mut tally = WorkerTally::new(sample_capacity);

    for _ in 0..queries {
        let Some(user) = model.next_user() else {
            break;
        };
        let (identity, secret) = &credentials[user];

        let started = Instant::now();
        let result = engine.authenticate(identity, secret);
        let elapsed = started.elapsed();
        tally.requests.record(elapsed);

        if elapsed >= slow_call {
            tally.slow_calls += 1;
            debug!(identity = %identity, elapsed_us = elapsed.as_micros() as u64, "slow authentication");
        }

        match result {
            Ok(outcome) => match outcome.reorganization() {
                ReorgTrigger::Completed(report) => {
                    tally.reorganizations.record(report.elapsed);
                    info!(
                        generation = report.generation,
                        records = report.records,
                        elapsed_ms = report.elapsed.as_secs_f64() * 1_000.0,
                        "reorganized"
                    );
                },
                ReorgTrigger::Scheduled => tally.scheduled += 1,
                ReorgTrigger::Coalesced => tally.coalesced += 1,
                ReorgTrigger::Aborted => tally.aborted += 1,
                ReorgTrigger::NotTriggered => {},
            },
            Err(_) => tally.failures += 1,
        }
    }
    tally
}

/// Replays skewed authentication traffic against `engine`.
///
/// `credentials[i]` must be the credential of user `i`. Queries are split
/// evenly across `config.threads` workers; each worker draws from its own
/// fork of one [`TrafficModel`], so every worker shares the power-user set.
pub fn simulate_traffic(
    engine: &Engine,
    credentials: &[(String, String)],
    config: &TrafficConfig,
) -> TrafficReport {
    let threads = config.threads.max(1);
    let model = TrafficModel::new(credentials.len(), config.power_users_ratio, config.seed);
    let sample_capacity = MAX_LATENCY_SAMPLES / threads;
    let started = Instant::now();

    let mut tally = if threads == 1 || credentials.is_empty() {
        drive(
            engine,
            credentials,
            model,
            config.queries,
            config.slow_call,
            sample_capacity,
        )
    } else {
        let per_thread = config.queries / threads as u64;
        let remainder = config.queries % threads as u64;
        thread::scope(|scope| {
            let workers: Vec<_> = (0..threads)
                .map(|worker| {
                    let queries = per_thread + u64::from((worker as u64) < remainder);
                    let model = model.fork(config.seed.wrapping_add(worker as u64 + 1));
                    scope.spawn(move || {
                        drive(
                            engine,
                            credentials,
                            model,
                            queries,
                            config.slow_call,
                            sample_capacity,
                        )
                    })
                })
                .collect();

            let mut total = WorkerTally::new(MAX_LATENCY_SAMPLES);
            for worker in workers {
                match worker.join() {
                    Ok(tally) => total.merge(tally),
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
            total
        })
    };
    engine.wait_idle();
    let elapsed = started.elapsed();

    TrafficReport {
        queries: tally.requests.count(),
        failures: tally.failures,
        slow_calls: tally.slow_calls,
        elapsed,
        average_request: tally.requests.average(),
        max_request: tally.requests.max(),
        request_latency: tally.requests.stats(),
        reorganizations: tally.reorganizations.count(),
        average_reorganization: tally.reorganizations.average(),
        max_reorganization: tally.reorganizations.max(),
        scheduled: tally.scheduled,
        coalesced: tally.coalesced,
        aborted: tally.aborted,
    }
}

/// Renders the engine's current metrics in Prometheus text format, each
/// series named `<prefix>_<metric>`.
pub fn prometheus_metrics(engine: &Engine, prefix: &str) -> String {
    let exporter = PrometheusTextExporter::new(prefix, Vec::new());
    exporter.export(&engine.snapshot());
    String::from_utf8_lossy(&exporter.into_inner()).into_owned()
}

#[cfg(test)]
mod tests {
    use hotrank::ReorganizePolicy;

    use super::*;

    #[test]
    fn load_inserts_every_user_in_batches() {
        let engine = Engine::try_new(1_000).unwrap();
        let (report, credentials) = load_users(&engine, 250, 100, 1).unwrap();

        assert_eq!(report.users, 250);
        assert_eq!(report.batches, 3);
        assert_eq!(credentials.len(), 250);
        assert_eq!(engine.len(), 250);
        assert_eq!(credentials[7].0, "user_7");
        assert!(engine.authenticate(&credentials[7].0, &credentials[7].1).is_ok());
    }

    #[test]
    fn loading_twice_is_rejected_as_duplicate() {
        let engine = Engine::try_new(1_000).unwrap();
        load_users(&engine, 10, 5, 1).unwrap();
        let err = load_users(&engine, 10, 5, 2).unwrap_err();
        assert_eq!(err.identity(), "user_0");
        assert_eq!(engine.len(), 10);
    }

    #[test]
    fn single_thread_traffic_counts_reorganizations() {
        let engine = Engine::try_new(100).unwrap();
        let (_, credentials) = load_users(&engine, 500, 100, 3).unwrap();
        let config = TrafficConfig {
            queries: 1_000,
            ..TrafficConfig::default()
        };

        let report = simulate_traffic(&engine, &credentials, &config);
        assert_eq!(report.queries, 1_000);
        assert_eq!(report.failures, 0);
        assert_eq!(report.reorganizations, 10);
        assert_eq!(engine.total_queries(), 1_000);
        assert!(report.max_reorganization >= report.average_reorganization);
    }

    #[test]
    fn multi_thread_traffic_splits_queries() {
        let engine = Engine::builder(64)
            .policy(ReorganizePolicy::Background)
            .try_build()
            .unwrap();
        let (_, credentials) = load_users(&engine, 200, 50, 4).unwrap();
        let config = TrafficConfig {
            queries: 1_003,
            threads: 4,
            ..TrafficConfig::default()
        };

        let report = simulate_traffic(&engine, &credentials, &config);
        assert_eq!(report.queries, 1_003);
        assert_eq!(engine.total_queries(), 1_003);
        assert_eq!(report.scheduled + report.coalesced, 1_003 / 64);
        assert!(engine.rank_snapshot().check_invariants().is_ok());
    }

    #[test]
    fn no_users_means_no_traffic() {
        let engine = Engine::try_new(10).unwrap();
        let report = simulate_traffic(&engine, &[], &TrafficConfig::default());
        assert_eq!(report.queries, 0);
        assert_eq!(engine.total_queries(), 0);
    }

    #[test]
    fn prometheus_metrics_reflect_simulated_traffic() {
        let engine = Engine::try_new(100).unwrap();
        let (_, credentials) = load_users(&engine, 50, 25, 5).unwrap();
        let config = TrafficConfig {
            queries: 300,
            ..TrafficConfig::default()
        };
        simulate_traffic(&engine, &credentials, &config);

        let text = prometheus_metrics(&engine, "sim");
        assert!(text.contains("# TYPE sim_auth_success_total counter"));
        assert!(text.contains("sim_auth_success_total 300\n"));
        assert!(text.contains("sim_reorganizations_total 3\n"));
        assert!(text.contains("sim_records 50\n"));
        assert!(text.contains("sim_rank_generation 3\n"));
    }
}
