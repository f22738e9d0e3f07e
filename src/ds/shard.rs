//! Seeded key-to-shard mapping for the sharded [`Index`](crate::index::Index).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Shard Selection Flow                           │
//! │                                                                         │
//! │   identity: &str                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │   ┌───────────────────────────────────────────────────────────────┐   │
//! │   │  ShardSelector { shards: 4, seed: 42 }                        │   │
//! │   │                                                               │   │
//! │   │  1. FxHasher::default()                                       │   │
//! │   │  2. seed.hash(&mut hasher)                                    │   │
//! │   │  3. key.hash(&mut hasher)                                     │   │
//! │   │  4. hasher.finish() % 4                                       │   │
//! │   └───────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │   ┌─────────┬─────────┬─────────┬─────────┐                           │
//! │   │ Shard 0 │ Shard 1 │ Shard 2 │ Shard 3 │                           │
//! │   └─────────┴─────────┴─────────┴─────────┘                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `str` and `Arc<str>` hash identically, so an owned key stored in a shard
//! and a borrowed lookup key always land on the same shard.
//!
//! ## Example Usage
//!
//! ```
//! use hotrank::ds::ShardSelector;
//!
//! let selector = ShardSelector::new(4, 0);
//! let shard = selector.shard_for_key("user_123");
//! assert!(shard < 4);
//! assert_eq!(selector.shard_for_key("user_123"), shard);
//! ```

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

/// Deterministic shard selector using a seeded hash.
///
/// The same `(key, seed, shards)` tuple always produces the same shard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardSelector {
    shards: usize,
    seed: u64,
}

impl ShardSelector {
    /// Creates a selector for `shards` shards with the given `seed`.
    ///
    /// The shard count is clamped to at least 1.
    ///
    /// ```
    /// use hotrank::ds::ShardSelector;
    ///
    /// assert_eq!(ShardSelector::new(16, 0).shard_count(), 16);
    /// assert_eq!(ShardSelector::new(0, 0).shard_count(), 1);
    /// ```
    pub fn new(shards: usize, seed: u64) -> Self {
        Self {
            shards: shards.max(1),
            seed,
        }
    }

    /// Returns the number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards
    }

    /// Maps a key to a shard index in `[0, shards)`.
    #[inline]
    pub fn shard_for_key<K: Hash + ?Sized>(&self, key: &K) -> usize {
        if self.shards == 1 {
            return 0;
        }
        let mut hasher = FxHasher::default();
        self.seed.hash(&mut hasher);
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards
    }
}

impl Default for ShardSelector {
    /// Creates a single-shard selector with seed 0.
    fn default() -> Self {
        Self::new(1, 0)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn shard_selector_is_deterministic() {
        let selector = ShardSelector::new(8, 123);

        let a = selector.shard_for_key("key");
        let b = selector.shard_for_key("key");
        assert_eq!(a, b);
        assert!(a < selector.shard_count());
    }

    #[test]
    fn owned_and_borrowed_keys_agree() {
        let selector = ShardSelector::new(16, 7);
        for i in 0..256 {
            let id = format!("user_{i}");
            let owned: Arc<str> = Arc::from(id.as_str());
            assert_eq!(
                selector.shard_for_key(id.as_str()),
                selector.shard_for_key(&*owned)
            );
        }
    }

    #[test]
    fn single_shard_always_zero() {
        let selector = ShardSelector::default();
        assert_eq!(selector.shard_for_key("anything"), 0);
    }

    #[test]
    fn keys_spread_across_shards() {
        let selector = ShardSelector::new(4, 0);
        let mut seen = [false; 4];
        for i in 0..1_000 {
            seen[selector.shard_for_key(format!("user_{i}").as_str())] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }
}
