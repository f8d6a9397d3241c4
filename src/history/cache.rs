//! Persistence cache — binary mirror of the Sample Store.
//!
//! The cache is rewritten in full after every append and read once at boot.
//! Loading never fails the caller: a missing or unreadable cache yields an
//! empty store, and a torn write (power lost mid-record) only costs the
//! partial record at the tail. The outcome is reported in [`LoadStatus`] so
//! callers can log it.

use log::{info, warn};

use super::store::SampleStore;
use super::{HISTORY_CAPACITY, RECORD_SIZE, decode_records, encode_records};
use crate::app::ports::{StorageError, StoragePort};
use crate::error::{HistoryError, Result};

pub const CACHE_NAMESPACE: &str = "history";
pub const CACHE_KEY: &str = "CACHE";

/// What happened while loading the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// No cache on storage (first boot or after a month rollover).
    Missing,
    /// Storage refused the read; history starts empty.
    Unreadable(StorageError),
    /// Cache decoded.
    Loaded {
        records: usize,
        /// Bytes of a trailing partial record that were ignored.
        discarded_bytes: usize,
        /// Whole records dropped because they broke chronological order.
        discarded_records: usize,
    },
}

/// Result of [`PersistenceCache::load`].
#[derive(Debug, Clone)]
pub struct CacheLoad<const N: usize = HISTORY_CAPACITY> {
    pub store: SampleStore<N>,
    pub status: LoadStatus,
}

impl<const N: usize> CacheLoad<N> {
    /// Timestamp of the newest recovered sample.
    pub fn last_timestamp(&self) -> Option<i64> {
        self.store.last().map(|s| s.timestamp)
    }

    /// The degradation that occurred, if any.
    pub fn degradation(&self) -> Option<HistoryError> {
        match self.status {
            LoadStatus::Unreadable(e) => Some(HistoryError::StorageReadFailed(e)),
            LoadStatus::Loaded {
                discarded_bytes, ..
            } if discarded_bytes > 0 => Some(HistoryError::Truncated { discarded_bytes }),
            _ => None,
        }
    }
}

/// Location of the cache blob on a [`StoragePort`].
#[derive(Debug, Clone, Copy)]
pub struct PersistenceCache {
    namespace: &'static str,
    key: &'static str,
}

impl Default for PersistenceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PersistenceCache {
    pub const fn new() -> Self {
        Self::at(CACHE_NAMESPACE, CACHE_KEY)
    }

    pub const fn at(namespace: &'static str, key: &'static str) -> Self {
        Self { namespace, key }
    }

    /// Overwrite the cache with the full store. Returns bytes written.
    pub fn save<const N: usize>(
        &self,
        storage: &mut impl StoragePort,
        store: &SampleStore<N>,
    ) -> Result<usize> {
        let bytes = encode_records(store.all());
        storage
            .write(self.namespace, self.key, &bytes)
            .map_err(HistoryError::StorageWriteFailed)?;
        Ok(bytes.len())
    }

    /// Rebuild a store from the cache.
    pub fn load<const N: usize>(&self, storage: &impl StoragePort) -> CacheLoad<N> {
        // Room for N records plus the longest possible partial tail, so a
        // torn record after a full store is still noticed.
        let mut buf = vec![0u8; N * RECORD_SIZE + RECORD_SIZE - 1];

        let len = match storage.read(self.namespace, self.key, &mut buf) {
            Ok(len) => len,
            Err(StorageError::NotFound) => {
                info!("Cache: none on storage, starting empty");
                return CacheLoad {
                    store: SampleStore::new(),
                    status: LoadStatus::Missing,
                };
            }
            Err(e) => {
                warn!("Cache: read failed ({}), starting empty", e);
                return CacheLoad {
                    store: SampleStore::new(),
                    status: LoadStatus::Unreadable(e),
                };
            }
        };

        let (samples, discarded_bytes) = decode_records(&buf[..len]);
        let (store, discarded_records) = SampleStore::from_samples(samples);

        if discarded_bytes > 0 {
            warn!("Cache: ignored {} trailing bytes of a partial record", discarded_bytes);
        }
        if discarded_records > 0 {
            warn!("Cache: dropped {} out-of-order records", discarded_records);
        }
        info!("Cache: recovered {} samples", store.len());

        CacheLoad {
            status: LoadStatus::Loaded {
                records: store.len(),
                discarded_bytes,
                discarded_records,
            },
            store,
        }
    }

    /// Remove the cache. Succeeds if it was already absent.
    pub fn delete(&self, storage: &mut impl StoragePort) -> Result<()> {
        storage
            .delete(self.namespace, self.key)
            .map_err(HistoryError::StorageWriteFailed)
    }

    pub fn exists(&self, storage: &impl StoragePort) -> bool {
        storage.exists(self.namespace, self.key)
    }
}
