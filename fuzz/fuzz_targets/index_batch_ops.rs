#![no_main]

use std::collections::HashSet;

use libfuzzer_sys::fuzz_target;
use hotrank::Engine;

// Fuzz bulk insert atomicity
//
// Each chunk becomes one batch of short identities. A batch either lands
// whole or leaves the store exactly as it was.
fuzz_target!(|data: &[u8]| {
    let engine = match Engine::builder(1_000).shards(3).try_build() {
        Ok(engine) => engine,
        Err(_) => return,
    };
    let mut model: HashSet<String> = HashSet::new();

    for chunk in data.chunks(6) {
        let batch: Vec<String> = chunk.iter().map(|b| format!("k{}", b % 32)).collect();
        let before = engine.len();

        let mut seen = HashSet::new();
        let clean = batch
            .iter()
            .all(|id| !model.contains(id) && seen.insert(id.clone()));

        let result = engine.bulk_insert(batch.iter().map(|id| (id.as_str(), "pw")));
        if clean {
            assert_eq!(result.ok(), Some(batch.len()));
            model.extend(batch);
        } else {
            let err = match result {
                Err(err) => err,
                Ok(_) => panic!("batch with a duplicate was accepted"),
            };
            assert!(batch.iter().any(|id| id == err.identity()));
            assert_eq!(engine.len(), before);
        }

        for id in &model {
            assert!(engine.contains(id));
        }
        assert_eq!(engine.len(), model.len());
    }
});
