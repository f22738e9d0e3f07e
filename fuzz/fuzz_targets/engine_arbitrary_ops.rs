#![no_main]

use libfuzzer_sys::fuzz_target;
use hotrank::prelude::*;

// Fuzz arbitrary engine operations
//
// Drives authenticate/insert/remove/reorganize from raw bytes and checks that
// every published ranking stays ordered and that counts never go backwards.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let threshold = u64::from(data[0] % 16) + 1;
    let engine = match Engine::try_new(threshold) {
        Ok(engine) => engine,
        Err(_) => return,
    };

    let mut counts = [0u64; 16];
    let mut live = [false; 16];

    for pair in data[1..].chunks(2) {
        let op = pair[0] % 5;
        let slot = (pair.get(1).copied().unwrap_or(0) % 16) as usize;
        let identity = format!("id{slot}");

        match op {
            0 => {
                let inserted = engine.bulk_insert([(identity.as_str(), "pw")]);
                assert_eq!(inserted.is_ok(), !live[slot]);
                if inserted.is_ok() {
                    live[slot] = true;
                    counts[slot] = 0;
                }
            },
            1 | 2 => match engine.authenticate(&identity, "pw") {
                Ok(outcome) => {
                    assert!(live[slot]);
                    counts[slot] += 1;
                    assert_eq!(outcome.query_count(), counts[slot]);
                },
                Err(err) => {
                    assert!(!live[slot]);
                    assert_eq!(err, AuthError::NotFound);
                },
            },
            3 => {
                assert_eq!(engine.remove(&identity), live[slot]);
                live[slot] = false;
            },
            _ => {
                assert!(matches!(engine.reorganize(), ReorgTrigger::Completed(_)));
            },
        }

        let snapshot = engine.rank_snapshot();
        assert!(snapshot.check_invariants().is_ok());
    }

    assert_eq!(engine.len(), live.iter().filter(|l| **l).count());
});
