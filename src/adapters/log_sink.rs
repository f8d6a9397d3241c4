//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! Each line starts with a fixed-width tag so serial captures can be
//! grepped by concern.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::history::LoadStatus;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink {
    /// Suppress repeats of `ClockNotReady`, which fires every tick until
    /// SNTP lands.
    clock_wait_logged: bool,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        if !matches!(event, AppEvent::ClockNotReady) {
            self.clock_wait_logged = false;
        }
        match event {
            AppEvent::Started { recovered, status } => match status {
                LoadStatus::Missing => info!("START | no cache, empty history"),
                LoadStatus::Unreadable(e) => warn!("START | cache unreadable ({}), empty history", e),
                LoadStatus::Loaded {
                    discarded_bytes,
                    discarded_records,
                    ..
                } => info!(
                    "START | recovered={} dropped_bytes={} dropped_records={}",
                    recovered, discarded_bytes, discarded_records
                ),
            },
            AppEvent::ClockNotReady => {
                if !self.clock_wait_logged {
                    info!("CLOCK | waiting for time sync");
                    self.clock_wait_logged = true;
                }
            }
            AppEvent::ClockWentBackwards { now, last } => {
                warn!("CLOCK | went backwards now={} last={}", now, last);
            }
            AppEvent::FutureSamplesDropped { removed, now } => {
                warn!("STORE | dropped {} samples newer than {}", removed, now);
            }
            AppEvent::SampleRecorded(s) => {
                info!(
                    "SAMPLE | ts={} T={:.1}\u{00b0}C RH={:.1}%",
                    s.timestamp, s.temperature, s.humidity
                );
            }
            AppEvent::SensorFault(r) => {
                warn!(
                    "SENSOR | incomplete T={:?} RH={:?}",
                    r.temperature, r.humidity
                );
            }
            AppEvent::SampleEvicted(s) => {
                info!("STORE | full, evicted ts={}", s.timestamp);
            }
            AppEvent::SampleRejected { sample, error } => {
                warn!("STORE | rejected ts={}: {}", sample.timestamp, error);
            }
            AppEvent::Persisted { records } => {
                info!("CACHE | saved {} records", records);
            }
            AppEvent::StorageFailed(e) => {
                warn!("CACHE | {}", e);
            }
            AppEvent::DailyExported { name } => {
                info!("EXPORT | daily {}", name);
            }
            AppEvent::MonthlyExported(m) => {
                info!(
                    "EXPORT | monthly {} records={} cache_cleared={}",
                    m.name, m.records, m.cache_cleared
                );
            }
            AppEvent::SnapshotExported { name } => {
                info!("EXPORT | snapshot {}", name);
            }
            AppEvent::ExportFailed(e) => {
                warn!("EXPORT | failed: {}", e);
            }
            AppEvent::HistoryTrimmed { removed } => {
                info!("STORE | trimmed {} samples", removed);
            }
        }
    }
}
