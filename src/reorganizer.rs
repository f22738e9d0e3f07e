//! Periodic re-ranking: snapshot, sort, publish.
//!
//! ## Pass
//!
//! ```text
//!   Reorganizer::run()
//!        │
//!        ▼
//!   1. try_reserve(index.len())        ── any failed reservation (here or while
//!        │                                   growing in step 2) → ReorgError::Allocation,
//!        │                                   previous view stays published
//!        ▼
//!   2. index.visit(): one read lock per shard, capture (handle, query_count)
//!        │
//!        ▼
//!   3. sort_unstable_by(count desc, identity asc)     O(m log m), no locks held
//!        │
//!        ▼
//!   4. RankView::replace(new snapshot)                single pointer swap
//! ```
//!
//! Each counter is read exactly once, in step 2, so the comparator sees a
//! frozen key even while authentications keep incrementing the live
//! counters. An increment that lands after its record was captured is
//! reflected by the next completed pass, not this one.
//!
//! ## State machine
//!
//! [`ReorgGate`] tracks `Idle → Reorganizing → Idle`. Only the caller that
//! wins [`ReorgGate::try_begin`] runs a pass; a trigger that arrives while a
//! pass is in flight is coalesced. Authentications never consult the gate.
//! Readers that want a settled ranking call [`ReorgGate::wait_idle`].

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

use crate::index::Index;
use crate::rank_view::{RankSnapshot, RankView, RankedEntry, rank_order};

/// Reorganization state of one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorgPhase {
    Idle,
    Reorganizing,
}

/// Mutual exclusion for reorganization passes, with a wait-for-idle signal.
#[derive(Debug)]
pub struct ReorgGate {
    phase: Mutex<ReorgPhase>,
    idle: Condvar,
}

impl ReorgGate {
    pub fn new() -> Self {
        Self {
            phase: Mutex::new(ReorgPhase::Idle),
            idle: Condvar::new(),
        }
    }

    /// Moves `Idle → Reorganizing`. Returns `false` if a pass is already in
    /// flight; the caller must not run one.
    pub fn try_begin(&self) -> bool {
        let mut phase = self.phase.lock();
        match *phase {
            ReorgPhase::Idle => {
                *phase = ReorgPhase::Reorganizing;
                true
            },
            ReorgPhase::Reorganizing => false,
        }
    }

    /// Moves back to `Idle` and wakes every waiter.
    pub fn finish(&self) {
        let mut phase = self.phase.lock();
        *phase = ReorgPhase::Idle;
        self.idle.notify_all();
    }

    /// Blocks until no pass is in flight.
    pub fn wait_idle(&self) {
        let mut phase = self.phase.lock();
        while *phase == ReorgPhase::Reorganizing {
            self.idle.wait(&mut phase);
        }
    }

    pub fn phase(&self) -> ReorgPhase {
        *self.phase.lock()
    }
}

impl Default for ReorgGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Calls [`ReorgGate::finish`] when dropped, including on unwind.
#[derive(Debug)]
pub(crate) struct FinishOnDrop<'a>(pub(crate) &'a ReorgGate);

impl Drop for FinishOnDrop<'_> {
    fn drop(&mut self) {
        self.0.finish();
    }
}

/// Outcome of a completed pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReorgReport {
    /// Generation number of the snapshot this pass published.
    pub generation: u64,
    /// Number of records ranked.
    pub records: usize,
    /// Wall-clock time from snapshot start to publish.
    pub elapsed: Duration,
}

/// The one way a pass can fail. The previous view stays published.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReorgError {
    #[error("could not allocate a ranking for {records} records")]
    Allocation { records: usize },
}

/// Rebuilds a [`RankView`] from the live records of an [`Index`].
///
/// Callers are responsible for single-writer discipline (hold the
/// [`ReorgGate`]); the reorganizer itself takes no gate.
#[derive(Debug, Clone, Copy)]
pub struct Reorganizer<'a> {
    index: &'a Index,
    view: &'a RankView,
}

impl<'a> Reorganizer<'a> {
    pub fn new(index: &'a Index, view: &'a RankView) -> Self {
        Self { index, view }
    }

    /// Runs one full pass and publishes the result.
    pub fn run(&self) -> Result<ReorgReport, ReorgError> {
        let started = Instant::now();
        let generation = self.view.generation() + 1;

        let entries = self.collect()?;
        let records = entries.len();
        let snapshot = RankSnapshot::from_sorted(generation, entries)
            .map_err(|_| ReorgError::Allocation { records })?;
        self.view.replace(snapshot);

        Ok(ReorgReport {
            generation,
            records,
            elapsed: started.elapsed(),
        })
    }

    /// Captures every live record and sorts into rank order.
    pub(crate) fn collect(&self) -> Result<Vec<RankedEntry>, ReorgError> {
        self.collect_reserving(self.index.len())
    }

    /// Like [`collect`](Self::collect), starting from room for `expected`
    /// entries. Records inserted while the pass runs may push past that;
    /// every growth step is fallible too, so no allocation in a pass can
    /// abort the process.
    fn collect_reserving(&self, expected: usize) -> Result<Vec<RankedEntry>, ReorgError> {
        let mut entries = Vec::new();
        reserve(&mut entries, expected)?;

        let mut failed = None;
        self.index.visit(|record| {
            if failed.is_some() {
                return;
            }
            if entries.len() == entries.capacity() {
                let additional = entries.len().max(MIN_GROWTH);
                if let Err(err) = reserve(&mut entries, additional) {
                    failed = Some(err);
                    return;
                }
            }
            entries.push(RankedEntry::capture(record));
        });
        if let Some(err) = failed {
            return Err(err);
        }

        entries.sort_unstable_by(rank_order);
        Ok(entries)
    }
}

const MIN_GROWTH: usize = 16;

fn reserve(entries: &mut Vec<RankedEntry>, additional: usize) -> Result<(), ReorgError> {
    let records = entries.len().saturating_add(additional);
    #[cfg(test)]
    if fault::reservation_fails() {
        return Err(ReorgError::Allocation { records });
    }
    entries
        .try_reserve(additional)
        .map_err(|_| ReorgError::Allocation { records })
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::credential::Credential;

    fn index_with(items: &[(&str, u64)]) -> Index {
        let index = Index::new(4);
        for (id, count) in items {
            index.insert(*id, Credential::from("pw")).unwrap();
            let rec = index.get(id).unwrap();
            for _ in 0..*count {
                rec.record_query();
            }
        }
        index
    }

    fn ranking(view: &RankView) -> Vec<(String, u64)> {
        view.snapshot()
            .entries()
            .iter()
            .map(|e| (e.identity().to_string(), e.query_count()))
            .collect()
    }

    #[test]
    fn run_publishes_sorted_snapshot() {
        let index = index_with(&[("c", 0), ("a", 2), ("b", 1)]);
        let view = RankView::new();

        let report = Reorganizer::new(&index, &view).run().unwrap();
        assert_eq!(report.generation, 1);
        assert_eq!(report.records, 3);
        assert_eq!(
            ranking(&view),
            vec![("a".to_string(), 2), ("b".to_string(), 1), ("c".to_string(), 0)]
        );
        assert!(view.snapshot().check_invariants().is_ok());
    }

    #[test]
    fn run_does_not_reset_counters() {
        let index = index_with(&[("a", 5)]);
        let view = RankView::new();
        Reorganizer::new(&index, &view).run().unwrap();
        assert_eq!(index.get("a").unwrap().query_count(), 5);
    }

    #[test]
    fn noop_pass_reproduces_previous_ranking() {
        let index = index_with(&[("x", 3), ("y", 3), ("z", 1), ("w", 0)]);
        let view = RankView::new();
        let reorganizer = Reorganizer::new(&index, &view);

        reorganizer.run().unwrap();
        let first = ranking(&view);
        let report = reorganizer.run().unwrap();

        assert_eq!(report.generation, 2);
        assert_eq!(ranking(&view), first);
    }

    #[test]
    fn removed_records_drop_out_on_next_pass() {
        let index = index_with(&[("a", 1), ("b", 0)]);
        let view = RankView::new();
        let reorganizer = Reorganizer::new(&index, &view);
        reorganizer.run().unwrap();

        index.remove("a");
        assert_eq!(view.snapshot().position("a"), Some(0));
        reorganizer.run().unwrap();
        assert_eq!(view.snapshot().position("a"), None);
        assert_eq!(view.snapshot().position("b"), Some(0));
    }

    #[test]
    fn empty_index_publishes_empty_generation() {
        let index = Index::new(2);
        let view = RankView::new();
        let report = Reorganizer::new(&index, &view).run().unwrap();
        assert_eq!(report.records, 0);
        assert_eq!(view.generation(), 1);
        assert!(view.snapshot().is_empty());
    }

    #[test]
    fn failed_reservation_keeps_previous_view() {
        let index = index_with(&[("a", 1), ("b", 0)]);
        let view = RankView::new();
        let reorganizer = Reorganizer::new(&index, &view);
        reorganizer.run().unwrap();
        let before = view.snapshot();

        index.get("b").unwrap().record_query();
        index.get("b").unwrap().record_query();
        fault::fail_reservation_after(0);
        assert_eq!(
            reorganizer.run(),
            Err(ReorgError::Allocation { records: 2 })
        );

        let after = view.snapshot();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.generation(), 1);
        assert_eq!(
            ranking(&view),
            vec![("a".to_string(), 1), ("b".to_string(), 0)]
        );

        reorganizer.run().unwrap();
        assert_eq!(view.generation(), 2);
        assert_eq!(view.snapshot().position("b"), Some(0));
    }

    #[test]
    fn records_beyond_reservation_are_still_collected() {
        let ids: Vec<String> = (0..40).map(|i| format!("user_{i:02}")).collect();
        let items: Vec<(&str, u64)> = ids.iter().map(|id| (id.as_str(), 0)).collect();
        let index = index_with(&items);
        let view = RankView::new();

        let entries = Reorganizer::new(&index, &view)
            .collect_reserving(1)
            .unwrap();
        assert_eq!(entries.len(), 40);
        assert_eq!(entries[0].identity(), "user_00");
        assert_eq!(entries[39].identity(), "user_39");
    }

    #[test]
    fn failed_growth_past_reservation_aborts_collect() {
        let ids: Vec<String> = (0..40).map(|i| format!("user_{i:02}")).collect();
        let items: Vec<(&str, u64)> = ids.iter().map(|id| (id.as_str(), 0)).collect();
        let index = index_with(&items);
        let view = RankView::new();

        fault::fail_reservation_after(1);
        let err = Reorganizer::new(&index, &view)
            .collect_reserving(1)
            .unwrap_err();
        assert!(matches!(err, ReorgError::Allocation { .. }));
        assert!(view.snapshot().is_empty());
    }

    #[test]
    fn gate_coalesces_second_begin() {
        let gate = ReorgGate::new();
        assert_eq!(gate.phase(), ReorgPhase::Idle);
        assert!(gate.try_begin());
        assert_eq!(gate.phase(), ReorgPhase::Reorganizing);
        assert!(!gate.try_begin());
        gate.finish();
        assert_eq!(gate.phase(), ReorgPhase::Idle);
        assert!(gate.try_begin());
        gate.finish();
    }

    #[test]
    fn finish_on_drop_releases_gate() {
        let gate = ReorgGate::new();
        assert!(gate.try_begin());
        {
            let _finish = FinishOnDrop(&gate);
        }
        assert_eq!(gate.phase(), ReorgPhase::Idle);
    }

    #[test]
    fn wait_idle_blocks_until_finish() {
        let gate = Arc::new(ReorgGate::new());
        assert!(gate.try_begin());

        let waiter = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                gate.wait_idle();
                gate.phase()
            })
        };

        thread::sleep(Duration::from_millis(20));
        assert!(!waiter.is_finished());
        gate.finish();
        assert_eq!(waiter.join().unwrap(), ReorgPhase::Idle);
    }
}
