//! Sample store — fixed-capacity, append-only hourly history.
//!
//! Backed by a `heapless::Vec` so the whole month of samples lives in one
//! statically sized buffer. `append` never wraps or grows: a full store
//! answers with [`HistoryError::CapacityExceeded`] and the caller applies
//! its overflow policy (see [`SampleStore::append_evicting`]).
//!
//! Invariants:
//! - `len() <= N`
//! - timestamps are non-decreasing from oldest to newest

use chrono::{Datelike, FixedOffset};

use super::clock::local_datetime;
use super::{HISTORY_CAPACITY, Sample};
use crate::error::{HistoryError, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleStore<const N: usize = HISTORY_CAPACITY> {
    samples: heapless::Vec<Sample, N>,
}

impl<const N: usize> SampleStore<N> {
    pub fn new() -> Self {
        Self {
            samples: heapless::Vec::new(),
        }
    }

    /// Build a store from chronologically ordered samples.
    ///
    /// Stops at the first sample that would break ordering or overflow the
    /// store; returns the store and how many samples were left out.
    pub fn from_samples(samples: impl IntoIterator<Item = Sample>) -> (Self, usize) {
        let mut store = Self::new();
        let mut skipped = 0;
        for sample in samples {
            if skipped > 0 || store.append(sample).is_err() {
                skipped += 1;
            }
        }
        (store, skipped)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn is_full(&self) -> bool {
        self.samples.is_full()
    }

    /// Newest sample.
    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    fn check_order(&self, sample: &Sample) -> Result<()> {
        match self.samples.last() {
            Some(last) if sample.timestamp < last.timestamp => Err(HistoryError::OutOfOrder),
            _ => Ok(()),
        }
    }

    /// Append at the end. Rejects when full or when `sample` is older than
    /// the newest stored sample.
    pub fn append(&mut self, sample: Sample) -> Result<()> {
        self.check_order(&sample)?;
        self.samples
            .push(sample)
            .map_err(|_| HistoryError::CapacityExceeded)
    }

    /// Append, dropping the oldest sample first if the store is full.
    /// Returns the evicted sample, if any.
    pub fn append_evicting(&mut self, sample: Sample) -> Result<Option<Sample>> {
        self.check_order(&sample)?;
        let evicted = if self.is_full() && !self.samples.is_empty() {
            Some(self.samples.remove(0))
        } else {
            None
        };
        self.append(sample)?;
        Ok(evicted)
    }

    /// The most recent `min(k, len)` samples, oldest first.
    pub fn window(&self, k: usize) -> &[Sample] {
        let start = self.samples.len().saturating_sub(k);
        &self.samples[start..]
    }

    /// Every sample, oldest first.
    pub fn all(&self) -> &[Sample] {
        &self.samples
    }

    /// Keep only the newest sample (or nothing if empty).
    pub fn reset_to_last(&mut self) {
        if let Some(last) = self.samples.last().copied() {
            self.samples.clear();
            // Cannot fail: the store was just cleared and N >= 1.
            let _ = self.samples.push(last);
        }
    }

    /// Drop every sample stamped after `timestamp`. Returns how many went.
    pub fn discard_newer_than(&mut self, timestamp: i64) -> usize {
        let keep = self.samples.partition_point(|s| s.timestamp <= timestamp);
        let removed = self.samples.len() - keep;
        self.samples.truncate(keep);
        removed
    }

    /// Drop every sample not in the calendar month of the newest sample.
    /// Returns the number of samples removed.
    pub fn retain_latest_month(&mut self, offset: FixedOffset) -> usize {
        let Some(newest) = self.last().and_then(|s| local_datetime(s.timestamp, offset)) else {
            return 0;
        };
        let month = (newest.year(), newest.month());
        let before = self.samples.len();
        self.samples.retain(|s| {
            local_datetime(s.timestamp, offset).is_some_and(|dt| (dt.year(), dt.month()) == month)
        });
        before - self.samples.len()
    }
}
