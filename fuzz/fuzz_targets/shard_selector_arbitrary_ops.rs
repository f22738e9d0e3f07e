#![no_main]

use libfuzzer_sys::fuzz_target;
use hotrank::ds::ShardSelector;

// Fuzz identity-to-shard routing
//
// Routing must be deterministic and in range for any shard count, seed, and
// identity bytes, since a batch insert locks shards by the same routing that
// lookups use.
fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }

    let shard_count = usize::from(data[0] % 64) + 1;
    let seed = u64::from_le_bytes([data[1], data[2], 0, 0, 0, 0, 0, 0]);
    let selector = ShardSelector::new(shard_count, seed);
    assert_eq!(selector.shard_count(), shard_count);

    for window in data[3..].windows(4) {
        let identity = String::from_utf8_lossy(window);
        let shard = selector.shard_for_key(&*identity);
        assert!(shard < shard_count);
        assert_eq!(shard, selector.shard_for_key(identity.to_string().as_str()));
    }

    if shard_count == 1 {
        assert_eq!(selector.shard_for_key("anything"), 0);
    }
});
