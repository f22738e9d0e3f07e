//! Engine metrics: atomic recording, point-in-time snapshots, export.
//!
//! Recording happens on the hot path through relaxed atomics owned by each
//! engine instance; nothing here is process-global. Consumers read a
//! [`EngineMetricsSnapshot`] and hand it to a [`MetricsExporter`] or inspect
//! it directly in tests.

pub mod exporter;
pub mod snapshot;
pub mod traits;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub use exporter::PrometheusTextExporter;
pub use snapshot::EngineMetricsSnapshot;
pub use traits::{MetricsExporter, MetricsSnapshotProvider};

/// Counters behind [`EngineMetricsSnapshot`].
#[derive(Debug, Default)]
pub(crate) struct EngineCounters {
    successes: AtomicU64,
    not_found: AtomicU64,
    invalid_credential: AtomicU64,
    reorganizations: AtomicU64,
    coalesced_triggers: AtomicU64,
    aborted_reorganizations: AtomicU64,
    last_reorg_nanos: AtomicU64,
    max_reorg_nanos: AtomicU64,
    total_reorg_nanos: AtomicU64,
}

impl EngineCounters {
    pub(crate) fn inc_success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_not_found(&self) {
        self.not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_invalid_credential(&self) {
        self.invalid_credential.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_coalesced(&self) {
        self.coalesced_triggers.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_aborted(&self) {
        self.aborted_reorganizations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reorganization(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.reorganizations.fetch_add(1, Ordering::Relaxed);
        self.last_reorg_nanos.store(nanos, Ordering::Relaxed);
        self.max_reorg_nanos.fetch_max(nanos, Ordering::Relaxed);
        self.total_reorg_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    /// Fills the counter fields; gauges are left for the caller.
    pub(crate) fn snapshot(&self) -> EngineMetricsSnapshot {
        EngineMetricsSnapshot {
            successes: self.successes.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            invalid_credential: self.invalid_credential.load(Ordering::Relaxed),
            reorganizations: self.reorganizations.load(Ordering::Relaxed),
            coalesced_triggers: self.coalesced_triggers.load(Ordering::Relaxed),
            aborted_reorganizations: self.aborted_reorganizations.load(Ordering::Relaxed),
            last_reorganization: Duration::from_nanos(
                self.last_reorg_nanos.load(Ordering::Relaxed),
            ),
            max_reorganization: Duration::from_nanos(self.max_reorg_nanos.load(Ordering::Relaxed)),
            total_reorganization: Duration::from_nanos(
                self.total_reorg_nanos.load(Ordering::Relaxed),
            ),
            ..EngineMetricsSnapshot::default()
        }
    }
}
