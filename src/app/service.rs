//! History service — the hexagonal core.
//!
//! [`HistoryService`] owns the clock monitor, sample store, persistence
//! cache and rollover exporter. It is the only writer of the store and the
//! cache; UI collaborators get read-only slices through the query methods.
//! All I/O flows through port traits injected at call sites.
//!
//! ```text
//!   ClockPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!  SensorPort ──▶ │        HistoryService        │
//!                 │ Clock · Store · Cache · Export│ ◀─▶ StoragePort
//!                 └──────────────────────────────┘
//! ```
//!
//! Per tick:
//!
//! ```text
//! clock not ready ─────────────▶ Err(ClockNotReady)
//! classify ── NoChange ────────▶ retry pending save
//!          ── HourChanged ─────▶ read · append · save
//!          ── DayChanged ──────▶ export day ─────────────▶ read · append · save
//!          ── MonthChanged ────▶ export day · export month (reset) ─▶ read · append · save
//! ```

use log::{info, warn};

use crate::config::{HistoryConfig, OverflowPolicy};
use crate::error::{HistoryError, Result};
use crate::history::{
    ClockMonitor, HISTORY_CAPACITY, PersistenceCache, RolloverExporter, Sample, SampleStore,
    Transition,
};

use super::commands::AppCommand;
use super::events::AppEvent;
use super::ports::{ClockPort, EventSink, SensorPort, StoragePort};

// ───────────────────────────────────────────────────────────────
// HistoryService
// ───────────────────────────────────────────────────────────────

pub struct HistoryService {
    config: HistoryConfig,
    clock: ClockMonitor,
    store: SampleStore<HISTORY_CAPACITY>,
    cache: PersistenceCache,
    exporter: RolloverExporter,
    /// First synchronised instant seen by this process.
    boot_time: Option<i64>,
    tick_count: u64,
    /// Store holds samples the cache does not.
    cache_dirty: bool,
    last_save_attempt: Option<i64>,
}

impl HistoryService {
    /// Rehydrate from the persistence cache and seed the clock monitor with
    /// the newest recovered sample.
    pub fn boot(
        config: HistoryConfig,
        storage: &impl StoragePort,
        sink: &mut impl EventSink,
    ) -> Self {
        let cache = PersistenceCache::new();
        let loaded = cache.load::<HISTORY_CAPACITY>(storage);
        if let Some(degraded) = loaded.degradation() {
            warn!("History boot degraded: {}", degraded);
        }

        let clock = ClockMonitor::from_config(&config).with_last(loaded.last_timestamp());
        let exporter = RolloverExporter::from_config(&config);

        sink.emit(&AppEvent::Started {
            recovered: loaded.store.len(),
            status: loaded.status,
        });
        info!(
            "HistoryService booted with {} samples (last={:?})",
            loaded.store.len(),
            clock.last_processed()
        );

        Self {
            config,
            clock,
            store: loaded.store,
            cache,
            exporter,
            boot_time: None,
            tick_count: 0,
            cache_dirty: false,
            last_save_attempt: None,
        }
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one tick: classify the wall clock, roll over finished periods,
    /// record a sample on every hour change.
    ///
    /// Only [`HistoryError::ClockNotReady`] is returned as an error; storage
    /// failures are reported through `sink` and never abort the tick.
    pub fn tick(
        &mut self,
        clock: &impl ClockPort,
        sensor: &mut impl SensorPort,
        storage: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) -> Result<Transition> {
        self.tick_count += 1;
        let now = clock.now();
        let synchronized = clock.is_synchronized();

        if !self.clock.is_ready(now, synchronized) {
            sink.emit(&AppEvent::ClockNotReady);
            return Err(HistoryError::ClockNotReady);
        }
        if self.boot_time.is_none() {
            self.boot_time = Some(now);
            self.drop_future_samples(now, storage, sink);
        }

        if self.clock.is_behind(now) {
            let last = self.clock.last_processed().unwrap_or(now);
            warn!("Clock moved backwards: now={} last={}", now, last);
            sink.emit(&AppEvent::ClockWentBackwards { now, last });
            self.retry_save(now, storage, sink);
            return Ok(Transition::NoChange);
        }

        let closing = self.clock.last_processed();
        let transition = self.clock.observe(now, synchronized)?;

        // Close finished periods before the new hour's sample lands, so
        // exports only cover the period they are named after.
        if let Some(closed) = closing {
            if transition.day_changed() {
                self.close_day(closed, storage, sink);
            }
            if transition.month_changed() {
                self.close_month(closed, storage, sink);
            }
        }

        if transition.hour_changed() {
            self.record(now, sensor, storage, sink);
        } else {
            self.retry_save(now, storage, sink);
        }

        Ok(transition)
    }

    // ── Command handling ──────────────────────────────────────

    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        clock: &impl ClockPort,
        storage: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        match cmd {
            AppCommand::Flush => self.save(clock.now(), storage, sink),
            AppCommand::ExportSnapshot => {
                let now = clock.now();
                if !self.clock.is_ready(now, clock.is_synchronized()) {
                    return Err(HistoryError::ClockNotReady);
                }
                match self.exporter.export_snapshot(storage, &self.store, now) {
                    Ok(name) => {
                        sink.emit(&AppEvent::SnapshotExported { name });
                        Ok(())
                    }
                    Err(e) => {
                        sink.emit(&AppEvent::ExportFailed(e));
                        Err(e)
                    }
                }
            }
            AppCommand::TrimToLatestMonth => {
                let removed = self.store.retain_latest_month(self.clock.offset());
                sink.emit(&AppEvent::HistoryTrimmed { removed });
                info!("History trimmed: {} samples removed", removed);
                if removed > 0 {
                    self.save(clock.now(), storage, sink)
                } else {
                    Ok(())
                }
            }
        }
    }

    // ── Queries (read-only, for UI collaborators) ─────────────

    /// Newest recorded sample.
    pub fn latest_reading(&self) -> Option<&Sample> {
        self.store.last()
    }

    /// The most recent `k` samples, oldest first.
    pub fn recent_window(&self, k: usize) -> &[Sample] {
        self.store.window(k)
    }

    /// The window shown on the status page graph.
    pub fn graph_window(&self) -> &[Sample] {
        self.store.window(self.config.render_window as usize)
    }

    pub fn full_history(&self) -> &[Sample] {
        self.store.all()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn boot_time(&self) -> Option<i64> {
        self.boot_time
    }

    pub fn last_processed(&self) -> Option<i64> {
        self.clock.last_processed()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Whether the store holds samples the cache is missing.
    pub fn is_cache_dirty(&self) -> bool {
        self.cache_dirty
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    // ── Internal ──────────────────────────────────────────────

    fn record(
        &mut self,
        now: i64,
        sensor: &mut impl SensorPort,
        storage: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) {
        let reading = sensor.read();
        if !reading.is_complete() {
            warn!("Sensor reading incomplete ({:?}), recording zero", reading);
            sink.emit(&AppEvent::SensorFault(reading));
        }
        let sample = Sample::new(
            now,
            reading.temperature.unwrap_or(0.0),
            reading.humidity.unwrap_or(0.0),
        );

        let appended = match self.config.overflow_policy {
            OverflowPolicy::EvictOldest => self.store.append_evicting(sample).map(|evicted| {
                if let Some(old) = evicted {
                    sink.emit(&AppEvent::SampleEvicted(old));
                }
            }),
            OverflowPolicy::Reject => self.store.append(sample),
        };

        match appended {
            Ok(()) => {
                sink.emit(&AppEvent::SampleRecorded(sample));
                let _ = self.save(now, storage, sink);
            }
            Err(error) => {
                warn!("Sample at {} not stored: {}", now, error);
                sink.emit(&AppEvent::SampleRejected { sample, error });
            }
        }
    }

    fn save(
        &mut self,
        now: i64,
        storage: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        self.last_save_attempt = Some(now);
        match self.cache.save(storage, &self.store) {
            Ok(_) => {
                self.cache_dirty = false;
                sink.emit(&AppEvent::Persisted {
                    records: self.store.len(),
                });
                Ok(())
            }
            Err(e) => {
                self.cache_dirty = true;
                warn!("Cache save failed: {}", e);
                sink.emit(&AppEvent::StorageFailed(e));
                Err(e)
            }
        }
    }

    /// Recovered samples stamped after the first synchronised instant would
    /// pin the monitor ahead of the wall clock and block every later record.
    fn drop_future_samples(
        &mut self,
        now: i64,
        storage: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) {
        let removed = self.store.discard_newer_than(now);
        if removed == 0 {
            return;
        }
        warn!("Dropped {} cached samples newer than {}", removed, now);
        sink.emit(&AppEvent::FutureSamplesDropped { removed, now });
        self.clock.reseed(self.store.last().map(|s| s.timestamp));
        let _ = self.save(now, storage, sink);
    }

    /// Retry a failed save once `persist_retry_secs` have passed.
    fn retry_save(&mut self, now: i64, storage: &mut impl StoragePort, sink: &mut impl EventSink) {
        if !self.cache_dirty {
            return;
        }
        let due = self.last_save_attempt.is_none_or(|last| {
            now.saturating_sub(last) >= i64::from(self.config.persist_retry_secs)
        });
        if due {
            info!("Retrying cache save");
            let _ = self.save(now, storage, sink);
        }
    }

    fn close_day(&mut self, closed: i64, storage: &mut impl StoragePort, sink: &mut impl EventSink) {
        match self.exporter.export_daily(storage, &self.store, closed) {
            Ok(name) => sink.emit(&AppEvent::DailyExported { name }),
            Err(e) => {
                warn!("Daily export failed: {}", e);
                sink.emit(&AppEvent::ExportFailed(e));
            }
        }
    }

    fn close_month(
        &mut self,
        closed: i64,
        storage: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) {
        match self
            .exporter
            .export_monthly(storage, &mut self.store, &self.cache, closed)
        {
            Ok(export) => sink.emit(&AppEvent::MonthlyExported(export)),
            Err(e) => {
                // History is kept; next month's export carries both periods.
                warn!("Monthly export failed, store not reset: {}", e);
                sink.emit(&AppEvent::ExportFailed(e));
            }
        }
    }
}
