//! Common imports for engine users.
//!
//! ```
//! use hotrank::prelude::*;
//!
//! let engine = Engine::try_new(100).unwrap();
//! engine.bulk_insert([("alice", "s3cret")]).unwrap();
//! assert!(matches!(
//!     engine.authenticate("alice", "bad"),
//!     Err(AuthError::InvalidCredential)
//! ));
//! ```

pub use crate::builder::{EngineBuilder, ReorganizePolicy};
pub use crate::credential::{ConstantTimeVerifier, Credential, CredentialVerifier};
pub use crate::engine::{AuthOutcome, Engine, ReorgTrigger};
pub use crate::error::{AuthError, ConfigError, DuplicateIdentity, InvariantError};
pub use crate::metrics::{
    EngineMetricsSnapshot, MetricsExporter, MetricsSnapshotProvider, PrometheusTextExporter,
};
pub use crate::rank_view::{RankSnapshot, RankedEntry};
pub use crate::record::{Record, RecordHandle};
pub use crate::reorganizer::{ReorgError, ReorgReport};
