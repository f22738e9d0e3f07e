//! Published, frequency-ordered snapshot of all records.
//!
//! ## Mental model
//!
//! * A [`RankSnapshot`] is immutable once built: an ordered `Vec` of
//!   [`RankedEntry`] plus an identity → position map for `rank_of`.
//! * [`RankView`] holds the current snapshot in an `ArcSwap`. Readers load an
//!   `Arc` (wait-free) and keep using it for as long as they like; the
//!   reorganizer publishes a replacement with a single pointer store.
//! * Nothing ever mutates a published snapshot, so readers cannot observe a
//!   half-built ranking and an old snapshot stays valid after a swap.
//!
//! ## Ordering
//!
//! Entries are ordered by `query_count` descending, ties broken by identity
//! ascending. The count stored in each entry is the one read during the
//! reorganization pass; the record's live counter may have moved on since.
//!
//! ```text
//!   generation 7                      live counters now
//!   ┌─────┬──────────┬───────┐        ┌──────────┬───────┐
//!   │ pos │ identity │ count │        │ identity │ count │
//!   ├─────┼──────────┼───────┤        ├──────────┼───────┤
//!   │  0  │ "carol"  │  41   │        │ "carol"  │  43   │
//!   │  1  │ "alice"  │  17   │        │ "alice"  │  17   │
//!   │  2  │ "bob"    │  17   │        │ "bob"    │  18   │  ← reflected at gen 8
//!   └─────┴──────────┴───────┘        └──────────┴───────┘
//! ```

use std::cmp::Ordering;
use std::collections::TryReserveError;
use std::sync::Arc;

use arc_swap::ArcSwap;
use rustc_hash::FxHashMap;

use crate::error::InvariantError;
use crate::record::RecordHandle;

/// One ranked position: a record handle and the count it was ranked by.
#[derive(Debug, Clone)]
pub struct RankedEntry {
    record: RecordHandle,
    query_count: u64,
}

impl RankedEntry {
    /// Captures the record's counter as of now.
    pub(crate) fn capture(record: &RecordHandle) -> Self {
        Self {
            record: Arc::clone(record),
            query_count: record.query_count(),
        }
    }

    #[inline]
    pub fn identity(&self) -> &str {
        self.record.identity()
    }

    #[inline]
    pub(crate) fn identity_arc(&self) -> &Arc<str> {
        self.record.identity_arc()
    }

    /// The count this entry was ranked by.
    #[inline]
    pub fn query_count(&self) -> u64 {
        self.query_count
    }

    /// The record's current counter, which may be ahead of the ranked count.
    #[inline]
    pub fn live_query_count(&self) -> u64 {
        self.record.query_count()
    }

    #[inline]
    pub fn record(&self) -> &RecordHandle {
        &self.record
    }
}

/// Rank order: higher count first, then lexicographically smaller identity.
#[inline]
pub(crate) fn rank_order(a: &RankedEntry, b: &RankedEntry) -> Ordering {
    b.query_count
        .cmp(&a.query_count)
        .then_with(|| a.identity().cmp(b.identity()))
}

/// Immutable ranked sequence produced by one reorganization.
#[derive(Debug, Default)]
pub struct RankSnapshot {
    generation: u64,
    entries: Vec<RankedEntry>,
    positions: FxHashMap<Arc<str>, usize>,
}

impl RankSnapshot {
    /// The empty generation-0 snapshot an engine starts with.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a snapshot from entries already sorted by [`rank_order`].
    pub(crate) fn from_sorted(
        generation: u64,
        entries: Vec<RankedEntry>,
    ) -> Result<Self, TryReserveError> {
        let mut positions = FxHashMap::default();
        positions.try_reserve(entries.len())?;
        for (pos, entry) in entries.iter().enumerate() {
            positions.insert(Arc::clone(entry.identity_arc()), pos);
        }
        Ok(Self {
            generation,
            entries,
            positions,
        })
    }

    /// Reorganization number that produced this snapshot (0 = never ranked).
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in rank order.
    #[inline]
    pub fn entries(&self) -> &[RankedEntry] {
        &self.entries
    }

    /// The first `n` entries, or all of them if there are fewer.
    #[inline]
    pub fn top(&self, n: usize) -> &[RankedEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    /// 0-based position of `identity`, if it was ranked in this snapshot.
    #[inline]
    pub fn position(&self, identity: &str) -> Option<usize> {
        self.positions.get(identity).copied()
    }

    /// Verifies rank order and position-map consistency.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.positions.len() != self.entries.len() {
            return Err(InvariantError::new(format!(
                "position map has {} identities for {} entries",
                self.positions.len(),
                self.entries.len()
            )));
        }
        for (pos, entry) in self.entries.iter().enumerate() {
            if self.positions.get(entry.identity()) != Some(&pos) {
                return Err(InvariantError::new(format!(
                    "identity `{}` at {} is not mapped to its position",
                    entry.identity(),
                    pos
                )));
            }
        }
        for (pos, pair) in self.entries.windows(2).enumerate() {
            if rank_order(&pair[0], &pair[1]) != Ordering::Less {
                return Err(InvariantError::new(format!(
                    "rank order broken between {} (`{}`, {}) and {} (`{}`, {})",
                    pos,
                    pair[0].identity(),
                    pair[0].query_count,
                    pos + 1,
                    pair[1].identity(),
                    pair[1].query_count
                )));
            }
        }
        Ok(())
    }
}

/// Atomically replaceable holder of the current [`RankSnapshot`].
#[derive(Debug)]
pub struct RankView {
    current: ArcSwap<RankSnapshot>,
}

impl RankView {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(RankSnapshot::empty()),
        }
    }

    /// The currently published snapshot. Never blocks.
    #[inline]
    pub fn snapshot(&self) -> Arc<RankSnapshot> {
        self.current.load_full()
    }

    /// Generation of the currently published snapshot.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.current.load().generation
    }

    /// Publishes `next` and returns the snapshot it replaced.
    pub fn replace(&self, next: RankSnapshot) -> Arc<RankSnapshot> {
        self.current.swap(Arc::new(next))
    }
}

impl Default for RankView {
    fn default() -> Self {
        Self::new()
    }
}
