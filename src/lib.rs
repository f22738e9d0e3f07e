//! hotrank: an in-memory credential store ranked by access frequency.
//!
//! Records are found by identity through a sharded hash [`index`], while a
//! separately published [`rank_view`] orders them by how often they
//! authenticate. The ranking is recomputed wholesale by the
//! [`reorganizer`] every `reorganize_threshold` successful authentications.
//!
//! ## Architecture
//!
//! ```text
//!   authenticate(identity, secret)
//!        │
//!        ▼
//!   ┌────────────────────────────┐     ┌─────────────────────────────────┐
//!   │ Index (sharded RwLock map) │────►│ Record { identity, credential,  │
//!   │ identity -> RecordHandle   │     │          query_count: AtomicU64 }│
//!   └────────────────────────────┘     └─────────────────────────────────┘
//!        │ success: +1 record, +1 total_queries
//!        ▼
//!   total_queries % threshold == 0 ?
//!        │ yes
//!        ▼
//!   ┌────────────────────────────┐     ┌─────────────────────────────────┐
//!   │ Reorganizer                │────►│ RankView (ArcSwap<RankSnapshot>)│
//!   │ snapshot pass, sort, swap  │     │ read by top() / rank_of()       │
//!   └────────────────────────────┘     └─────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use std::num::NonZeroU64;
//!
//! use hotrank::Engine;
//!
//! let engine = Engine::new(NonZeroU64::new(3).unwrap());
//! engine
//!     .bulk_insert([("a", "pw-a"), ("b", "pw-b"), ("c", "pw-c")])
//!     .unwrap();
//!
//! engine.authenticate("a", "pw-a").unwrap();
//! engine.authenticate("a", "pw-a").unwrap();
//! engine.authenticate("b", "pw-b").unwrap(); // third success reorganizes
//!
//! let top: Vec<_> = engine
//!     .top(3)
//!     .into_iter()
//!     .map(|(id, count)| (id.to_string(), count))
//!     .collect();
//! assert_eq!(
//!     top,
//!     vec![("a".to_string(), 2), ("b".to_string(), 1), ("c".to_string(), 0)]
//! );
//! ```

pub mod builder;
pub mod credential;
pub mod ds;
pub mod engine;
pub mod error;
pub mod index;
pub mod metrics;
pub mod prelude;
pub mod rank_view;
pub mod record;
pub mod reorganizer;

pub use builder::{EngineBuilder, ReorganizePolicy};
pub use engine::{AuthOutcome, Engine, ReorgTrigger};
pub use error::{AuthError, ConfigError, DuplicateIdentity};
