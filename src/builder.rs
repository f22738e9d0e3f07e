//! Engine configuration.
//!
//! ## Example
//!
//! ```rust
//! use hotrank::{EngineBuilder, ReorganizePolicy};
//!
//! let engine = EngineBuilder::new(10_000)
//!     .policy(ReorganizePolicy::Background)
//!     .shards(8)
//!     .capacity_hint(1_000_000)
//!     .try_build()
//!     .unwrap();
//! assert_eq!(engine.reorganize_threshold(), 10_000);
//! assert_eq!(engine.policy(), ReorganizePolicy::Background);
//!
//! assert!(EngineBuilder::new(0).try_build().is_err());
//! ```

use std::num::NonZeroU64;

use crate::credential::{ConstantTimeVerifier, CredentialVerifier};
use crate::engine::Engine;
use crate::error::ConfigError;

/// When a threshold-crossing authentication runs the reorganization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReorganizePolicy {
    /// The crossing call runs the pass inline and returns after publish.
    /// `top` and `rank_of` wait for any in-flight pass.
    #[default]
    Synchronous,
    /// The crossing call hands the pass to a worker thread and returns.
    /// `top` and `rank_of` read whatever is published.
    Background,
}

/// Builder for [`Engine`].
#[derive(Debug)]
pub struct EngineBuilder {
    reorganize_threshold: u64,
    policy: ReorganizePolicy,
    shards: usize,
    capacity_hint: usize,
    verifier: Box<dyn CredentialVerifier>,
}

impl EngineBuilder {
    /// Starts a builder with the given reorganize threshold.
    pub fn new(reorganize_threshold: u64) -> Self {
        Self {
            reorganize_threshold,
            policy: ReorganizePolicy::default(),
            shards: default_shards(),
            capacity_hint: 0,
            verifier: Box::new(ConstantTimeVerifier),
        }
    }

    pub fn policy(mut self, policy: ReorganizePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Index shard count; clamped to at least 1.
    pub fn shards(mut self, shards: usize) -> Self {
        self.shards = shards.max(1);
        self
    }

    /// Expected number of records, used to pre-size the index.
    pub fn capacity_hint(mut self, records: usize) -> Self {
        self.capacity_hint = records;
        self
    }

    /// Replaces the credential comparison.
    pub fn verifier(mut self, verifier: impl CredentialVerifier + 'static) -> Self {
        self.verifier = Box::new(verifier);
        self
    }

    /// Validates the configuration and builds the engine.
    pub fn try_build(self) -> Result<Engine, ConfigError> {
        let threshold = NonZeroU64::new(self.reorganize_threshold)
            .ok_or_else(|| ConfigError::new("reorganize_threshold must be > 0"))?;
        Ok(Engine::from_parts(
            threshold,
            self.policy,
            self.shards,
            self.capacity_hint,
            self.verifier,
        ))
    }
}

pub(crate) fn default_shards() -> usize {
    std::thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or(1)
}
