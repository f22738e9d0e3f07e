//! Benchmark support utilities for hotrank.
//!
//! Shared infrastructure for driving an [`Engine`](hotrank::Engine) the way a
//! login service would: bulk-loading generated users, replaying skewed
//! authentication traffic, and summarizing latency.

pub mod metrics;
pub mod simulation;
pub mod workload;
