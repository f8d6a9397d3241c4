//! Outbound application events.
//!
//! The [`HistoryService`](super::service::HistoryService) emits these through
//! the [`EventSink`](super::ports::EventSink) port. Adapters on the other
//! side decide what to do with them — log to serial, publish on a message
//! bus, refresh a status page, etc.

use crate::error::HistoryError;
use crate::history::cache::LoadStatus;
use crate::history::export::MonthlyExport;
use crate::history::Sample;

use super::ports::SensorReading;

/// Structured events emitted by the history core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service has booted from the persistence cache.
    Started { recovered: usize, status: LoadStatus },

    /// A tick arrived before the wall clock was synchronised.
    ClockNotReady,

    /// Wall clock reads earlier than the last processed instant.
    ClockWentBackwards { now: i64, last: i64 },

    /// Recovered samples stamped after the first synchronised instant were
    /// dropped.
    FutureSamplesDropped { removed: usize, now: i64 },

    /// A new hourly sample was appended.
    SampleRecorded(Sample),

    /// The sensor did not answer on every channel; zeros were recorded.
    SensorFault(SensorReading),

    /// The store was full and its oldest sample was dropped.
    SampleEvicted(Sample),

    /// The new sample could not be stored.
    SampleRejected { sample: Sample, error: HistoryError },

    /// The cache now mirrors the store.
    Persisted { records: usize },

    /// Saving the cache failed; the store is ahead of storage.
    StorageFailed(HistoryError),

    /// A daily export was written.
    DailyExported { name: String },

    /// A monthly export was written and the store was reset.
    MonthlyExported(MonthlyExport),

    /// An on-demand snapshot was written.
    SnapshotExported { name: String },

    /// A rollover or snapshot export could not be written.
    ExportFailed(HistoryError),

    /// Samples outside the newest month were dropped on request.
    HistoryTrimmed { removed: usize },
}
