//! Unified error types for the CLIMA firmware.
//!
//! A single `HistoryError` enum covers every failure the history core can
//! report. None of them is fatal: the tick handler logs or emits them and
//! carries on with whatever history it still has. All variants are `Copy`
//! so they can be passed into events and test assertions without allocation.

use core::fmt;

use crate::app::ports::StorageError;

// ---------------------------------------------------------------------------
// History errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryError {
    /// Wall clock has not been synchronised yet; no sample may be taken.
    ClockNotReady,
    /// The Sample Store is full.
    CapacityExceeded,
    /// A sample is older than the newest sample already held.
    OutOfOrder,
    /// Writing to non-volatile storage failed.
    StorageWriteFailed(StorageError),
    /// Reading from non-volatile storage failed.
    StorageReadFailed(StorageError),
    /// The cache ended in a partial record that was discarded.
    Truncated { discarded_bytes: usize },
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClockNotReady => write!(f, "wall clock not synchronised"),
            Self::CapacityExceeded => write!(f, "sample store full"),
            Self::OutOfOrder => write!(f, "sample older than newest stored sample"),
            Self::StorageWriteFailed(e) => write!(f, "storage write failed: {e}"),
            Self::StorageReadFailed(e) => write!(f, "storage read failed: {e}"),
            Self::Truncated { discarded_bytes } => {
                write!(f, "cache truncated ({discarded_bytes} trailing bytes discarded)")
            }
        }
    }
}

impl std::error::Error for HistoryError {}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, HistoryError>;
