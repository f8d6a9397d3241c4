//! Rollover exporter — dated CSV snapshots of the history.
//!
//! File names encode the period that just closed, never the one starting:
//!
//! | Export   | Name               | Content                          |
//! |----------|--------------------|----------------------------------|
//! | daily    | `DD-MM-YYYY.csv`   | last `daily_window` samples      |
//! | monthly  | `MM-YYYY.csv`      | whole store, then store reset    |
//! | snapshot | `snapshot-DD-MM-YYYY-HHMMSS.csv` | whole store, no reset |
//!
//! Every file starts with [`CSV_HEADER`] followed by one
//! `HH:MM:SS, DD-MM-YYYY, <temp>, <humidity>` line per sample in
//! device-local time, values to one decimal.

use core::fmt::Write as _;

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc};
use log::{info, warn};

use super::Sample;
use super::cache::PersistenceCache;
use super::clock::{fixed_offset, local_datetime};
use super::store::SampleStore;
use crate::app::ports::StoragePort;
use crate::config::HistoryConfig;
use crate::error::{HistoryError, Result};

pub const EXPORT_NAMESPACE: &str = "exports";
pub const CSV_HEADER: &str = "Hora, Data, Temperatura, Humidade\n";

/// Outcome of a successful monthly export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyExport {
    pub name: String,
    pub records: usize,
    /// `false` if the cache could not be removed after the reset.
    pub cache_cleared: bool,
}

#[derive(Debug, Clone)]
pub struct RolloverExporter {
    offset: FixedOffset,
    daily_window: usize,
    namespace: &'static str,
}

impl RolloverExporter {
    pub fn new(utc_offset_secs: i32, daily_window: usize) -> Self {
        Self {
            offset: fixed_offset(utc_offset_secs),
            daily_window,
            namespace: EXPORT_NAMESPACE,
        }
    }

    pub fn from_config(config: &HistoryConfig) -> Self {
        Self::new(config.utc_offset_secs, config.daily_export_window as usize)
    }

    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    fn local(&self, timestamp: i64) -> DateTime<FixedOffset> {
        local_datetime(timestamp, self.offset)
            .unwrap_or_else(|| DateTime::<Utc>::default().with_timezone(&self.offset))
    }

    /// `DD-MM-YYYY.csv` for the day containing `closed`.
    pub fn daily_name(&self, closed: i64) -> String {
        let dt = self.local(closed);
        format!("{:02}-{:02}-{:04}.csv", dt.day(), dt.month(), dt.year())
    }

    /// `MM-YYYY.csv` for the month containing `closed`.
    pub fn monthly_name(&self, closed: i64) -> String {
        let dt = self.local(closed);
        format!("{:02}-{:04}.csv", dt.month(), dt.year())
    }

    pub fn snapshot_name(&self, now: i64) -> String {
        let dt = self.local(now);
        format!(
            "snapshot-{:02}-{:02}-{:04}-{:02}{:02}{:02}.csv",
            dt.day(),
            dt.month(),
            dt.year(),
            dt.hour(),
            dt.minute(),
            dt.second()
        )
    }

    /// Render samples in the export format.
    pub fn render_csv(&self, samples: &[Sample]) -> String {
        // "HH:MM:SS, DD-MM-YYYY, -xx.x, xxx.x\n" fits in 40 bytes.
        let mut out = String::with_capacity(CSV_HEADER.len() + samples.len() * 40);
        out.push_str(CSV_HEADER);
        for s in samples {
            let dt = self.local(s.timestamp);
            let _ = writeln!(
                out,
                "{:02}:{:02}:{:02}, {:02}-{:02}-{:04}, {:.1}, {:.1}",
                dt.hour(),
                dt.minute(),
                dt.second(),
                dt.day(),
                dt.month(),
                dt.year(),
                s.temperature,
                s.humidity
            );
        }
        out
    }

    fn write(&self, storage: &mut impl StoragePort, name: &str, samples: &[Sample]) -> Result<()> {
        let csv = self.render_csv(samples);
        storage
            .write(self.namespace, name, csv.as_bytes())
            .map_err(HistoryError::StorageWriteFailed)
    }

    /// Export the closing day's window. The store is left untouched.
    pub fn export_daily<const N: usize>(
        &self,
        storage: &mut impl StoragePort,
        store: &SampleStore<N>,
        day_being_closed: i64,
    ) -> Result<String> {
        let name = self.daily_name(day_being_closed);
        let window = store.window(self.daily_window);
        self.write(storage, &name, window)?;
        info!("Export: daily {} ({} samples)", name, window.len());
        Ok(name)
    }

    /// Export the whole store for the closing month, then reset the store
    /// to its last sample and delete the cache.
    ///
    /// If the export itself cannot be written, nothing is reset.
    pub fn export_monthly<const N: usize>(
        &self,
        storage: &mut impl StoragePort,
        store: &mut SampleStore<N>,
        cache: &PersistenceCache,
        month_being_closed: i64,
    ) -> Result<MonthlyExport> {
        let name = self.monthly_name(month_being_closed);
        let records = store.len();
        self.write(storage, &name, store.all())?;

        store.reset_to_last();
        let cache_cleared = match cache.delete(storage) {
            Ok(()) => true,
            Err(e) => {
                warn!("Export: cache delete after monthly rollover failed ({})", e);
                false
            }
        };
        info!("Export: monthly {} ({} samples), store reset", name, records);

        Ok(MonthlyExport {
            name,
            records,
            cache_cleared,
        })
    }

    /// Export the whole store without resetting anything.
    pub fn export_snapshot<const N: usize>(
        &self,
        storage: &mut impl StoragePort,
        store: &SampleStore<N>,
        now: i64,
    ) -> Result<String> {
        let name = self.snapshot_name(now);
        self.write(storage, &name, store.all())?;
        info!("Export: snapshot {} ({} samples)", name, store.len());
        Ok(name)
    }
}
