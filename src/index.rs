//! Sharded exact-match index from identity to record.
//!
//! ## Architecture
//! - Identities live in `FxHashMap<Arc<str>, RecordHandle>` shards, each behind
//!   its own `parking_lot::RwLock`.
//! - A [`ShardSelector`] picks the shard; lookups take one read lock, clone
//!   the handle, and release it before any credential work happens.
//! - Counter increments never touch the map: they are atomic RMWs on the
//!   record the handle points to, so steady-state traffic only ever holds
//!   read locks.
//!
//! ## Core Operations
//! - `insert`: add one record, rejecting a live duplicate.
//! - `insert_batch`: all-or-nothing insert of many records.
//! - `get`: fetch a handle by identity.
//! - `remove`: delete by identity.
//! - `visit`: shard-by-shard read pass used by the reorganizer.
//!
//! ## Batch Atomicity
//! `insert_batch` takes every shard's write lock in ascending shard order,
//! validates the whole batch against live records and against itself, and
//! only then inserts. A rejected batch never touches a map, so there is
//! nothing to roll back and no reader can observe a half-applied batch.
//! Single-shard writers (`insert`, `remove`) never wait on a second lock, so
//! the ordered acquisition cannot deadlock.
//!
//! ## Example Usage
//! ```rust
//! use hotrank::credential::Credential;
//! use hotrank::index::Index;
//!
//! let index = Index::new(4);
//! index.insert("alice", Credential::from("pw")).unwrap();
//! assert!(index.insert("alice", Credential::from("other")).is_err());
//! assert_eq!(index.get("alice").unwrap().identity(), "alice");
//! assert!(index.get("bob").is_none());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::credential::Credential;
use crate::ds::ShardSelector;
use crate::error::DuplicateIdentity;
use crate::record::{Record, RecordHandle};

type Shard = RwLock<FxHashMap<Arc<str>, RecordHandle>>;

/// Identity → record map; the source of truth for existence and live counts.
#[derive(Debug)]
pub struct Index {
    shards: Box<[Shard]>,
    selector: ShardSelector,
    len: AtomicUsize,
}

impl Index {
    /// Creates an empty index with `shards` shards (clamped to at least 1).
    pub fn new(shards: usize) -> Self {
        Self::with_capacity(shards, 0)
    }

    /// Creates an empty index pre-sized for roughly `capacity` records.
    pub fn with_capacity(shards: usize, capacity: usize) -> Self {
        let selector = ShardSelector::new(shards, 0);
        let per_shard = capacity.div_ceil(selector.shard_count());
        let shards = (0..selector.shard_count())
            .map(|_| {
                RwLock::new(FxHashMap::with_capacity_and_hasher(
                    per_shard,
                    Default::default(),
                ))
            })
            .collect();
        Self {
            shards,
            selector,
            len: AtomicUsize::new(0),
        }
    }

    /// Returns the number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    #[inline]
    fn shard(&self, identity: &str) -> &Shard {
        &self.shards[self.selector.shard_for_key(identity)]
    }

    /// Inserts a single record.
    pub fn insert(
        &self,
        identity: impl Into<Arc<str>>,
        credential: Credential,
    ) -> Result<(), DuplicateIdentity> {
        let identity = identity.into();
        let mut map = self.shard(&identity).write();
        if map.contains_key(&*identity) {
            return Err(DuplicateIdentity(identity.to_string()));
        }
        let record = Arc::new(Record::new(Arc::clone(&identity), credential));
        map.insert(identity, record);
        self.len.fetch_add(1, Ordering::Release);
        Ok(())
    }

    /// Inserts every record of `batch`, or none of them.
    ///
    /// Fails with the first identity (in batch order) that is already live or
    /// repeats an earlier batch item. Returns the number of records inserted.
    pub fn insert_batch(
        &self,
        batch: Vec<(Arc<str>, Credential)>,
    ) -> Result<usize, DuplicateIdentity> {
        if batch.is_empty() {
            return Ok(0);
        }

        let mut guards: Vec<_> = self.shards.iter().map(|shard| shard.write()).collect();

        {
            let mut seen: FxHashSet<&str> = FxHashSet::default();
            seen.reserve(batch.len());
            for (identity, _) in &batch {
                let idx = self.selector.shard_for_key(&**identity);
                if guards[idx].contains_key(&**identity) || !seen.insert(&**identity) {
                    return Err(DuplicateIdentity(identity.to_string()));
                }
            }
        }

        let count = batch.len();
        for (identity, credential) in batch {
            let idx = self.selector.shard_for_key(&*identity);
            let record = Arc::new(Record::new(Arc::clone(&identity), credential));
            guards[idx].insert(identity, record);
        }
        self.len.fetch_add(count, Ordering::Release);
        Ok(count)
    }

    /// Fetches a record handle. Takes one shard read lock and writes nothing.
    #[inline]
    pub fn get(&self, identity: &str) -> Option<RecordHandle> {
        self.shard(identity).read().get(identity).cloned()
    }

    /// Returns `true` if `identity` is live.
    pub fn contains(&self, identity: &str) -> bool {
        self.shard(identity).read().contains_key(identity)
    }

    /// Removes a record. Handles already held elsewhere stay valid.
    pub fn remove(&self, identity: &str) -> Option<RecordHandle> {
        let removed = self.shard(identity).write().remove(identity);
        if removed.is_some() {
            self.len.fetch_sub(1, Ordering::Release);
        }
        removed
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Returns `true` if there are no live records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Calls `f` once for every live record, one shard at a time.
    ///
    /// Each shard is read-locked only while it is being walked. Records
    /// inserted into an already-visited shard during the pass are not seen.
    pub fn visit(&self, mut f: impl FnMut(&RecordHandle)) {
        for shard in self.shards.iter() {
            let map = shard.read();
            for record in map.values() {
                f(record);
            }
        }
    }
}
