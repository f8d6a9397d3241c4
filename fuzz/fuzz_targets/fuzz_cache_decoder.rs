//! Fuzz target: history cache loader
//!
//! Feeds arbitrary bytes to `PersistenceCache::load` through an in-memory
//! `StoragePort` and verifies:
//! - No panics under arbitrary byte inputs
//! - The rebuilt store never exceeds its capacity
//! - Recovered samples are chronologically ordered
//! - Saving the recovered store and loading it again is lossless
//!
//! cargo fuzz run fuzz_cache_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use clima::app::ports::{StorageError, StoragePort};
use clima::history::cache::{CACHE_KEY, CACHE_NAMESPACE, LoadStatus, PersistenceCache};
use clima::history::RECORD_SIZE;
use std::collections::HashMap;

const CAPACITY: usize = 64;

// ── In-memory StoragePort for fuzz testing ────────────────────

struct MemStore {
    data: HashMap<String, Vec<u8>>,
}

impl StoragePort for MemStore {
    fn read(&self, ns: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        match self.data.get(&format!("{ns}::{key}")) {
            Some(v) => {
                let n = v.len().min(buf.len());
                buf[..n].copy_from_slice(&v[..n]);
                Ok(n)
            }
            None => Err(StorageError::NotFound),
        }
    }

    fn write(&mut self, ns: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.data.insert(format!("{ns}::{key}"), data.to_vec());
        Ok(())
    }

    fn exists(&self, ns: &str, key: &str) -> bool {
        self.data.contains_key(&format!("{ns}::{key}"))
    }

    fn delete(&mut self, ns: &str, key: &str) -> Result<(), StorageError> {
        self.data.remove(&format!("{ns}::{key}"));
        Ok(())
    }
}

fuzz_target!(|data: &[u8]| {
    let mut store = MemStore {
        data: HashMap::from([(format!("{CACHE_NAMESPACE}::{CACHE_KEY}"), data.to_vec())]),
    };
    let cache = PersistenceCache::new();

    let loaded = cache.load::<CAPACITY>(&store);
    assert!(loaded.store.len() <= CAPACITY);
    assert!(
        loaded
            .store
            .all()
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp),
        "recovered samples out of order"
    );
    match loaded.status {
        LoadStatus::Loaded { records, discarded_bytes, .. } => {
            assert_eq!(records, loaded.store.len());
            assert!(discarded_bytes < RECORD_SIZE);
        }
        other => panic!("unexpected status {other:?}"),
    }

    // Re-save and reload: must be lossless (NaN payloads compare by bits).
    let written = cache.save(&mut store, &loaded.store).unwrap_or(0);
    assert_eq!(written, loaded.store.len() * RECORD_SIZE);
    let again = cache.load::<CAPACITY>(&store);
    let bits = |s: &clima::history::Sample| (s.timestamp, s.temperature.to_bits(), s.humidity.to_bits());
    assert!(again.store.all().iter().map(bits).eq(loaded.store.all().iter().map(bits)));
});
