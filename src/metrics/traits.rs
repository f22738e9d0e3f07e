//! # Metrics consumption traits
//!
//! Recording stays inside the engine (plain atomics). Consumption is split
//! into two small traits so that tests and the simulation harness can read
//! snapshots without knowing about exporters, and exporters can publish
//! without knowing about engines.
//!
//! ```text
//!   ┌──────────────────────────────┐    ┌──────────────────────────────┐
//!   │ MetricsSnapshotProvider<S>   │    │ MetricsExporter<S>           │
//!   │ (harness/test)               │    │ (monitoring)                 │
//!   └──────────────┬───────────────┘    └──────────────▲───────────────┘
//!                  │          snapshot: S              │
//!                  └───────────────────────────────────┘
//! ```

/// Produces a point-in-time metrics snapshot.
pub trait MetricsSnapshotProvider<S> {
    fn snapshot(&self) -> S;
}

/// Publishes a snapshot to a monitoring sink.
pub trait MetricsExporter<S> {
    fn export(&self, snapshot: &S);
}
