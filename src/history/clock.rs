//! Clock monitor — classifies ticks against the last processed instant.
//!
//! Classification compares calendar fields in device-local time (fixed UTC
//! offset), never elapsed duration. A boundary is reported exactly once, on
//! the first tick that sees the field change; a long power-off that spans
//! several hours, days or months collapses into a single event of the
//! widest kind.

use chrono::{DateTime, Datelike, FixedOffset, Offset, Timelike, Utc};

use crate::config::HistoryConfig;
use crate::error::{HistoryError, Result};

/// Kind of calendar boundary crossed between two instants.
///
/// Ordered by width: every `DayChanged` is also an hour change, every
/// `MonthChanged` is also a day change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Transition {
    NoChange,
    HourChanged,
    DayChanged,
    MonthChanged,
}

impl Transition {
    pub fn hour_changed(self) -> bool {
        self >= Self::HourChanged
    }

    pub fn day_changed(self) -> bool {
        self >= Self::DayChanged
    }

    pub fn month_changed(self) -> bool {
        self == Self::MonthChanged
    }
}

/// Convert epoch seconds to device-local time. `None` if out of range.
pub fn local_datetime(timestamp: i64, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    DateTime::from_timestamp(timestamp, 0).map(|utc| utc.with_timezone(&offset))
}

/// Build the fixed offset for `secs` east of UTC, falling back to UTC for
/// values outside ±24h.
pub fn fixed_offset(secs: i32) -> FixedOffset {
    FixedOffset::east_opt(secs).unwrap_or_else(|| Utc.fix())
}

/// Pure classification of `now` against `last`.
///
/// Year is part of every comparison so that a jump of exactly one year is
/// not mistaken for "same month". Unrepresentable instants classify as
/// [`Transition::NoChange`].
pub fn classify(now: i64, last: i64, offset: FixedOffset) -> Transition {
    let (Some(n), Some(l)) = (local_datetime(now, offset), local_datetime(last, offset)) else {
        return Transition::NoChange;
    };

    if (n.year(), n.month()) != (l.year(), l.month()) {
        Transition::MonthChanged
    } else if n.day() != l.day() {
        Transition::DayChanged
    } else if n.hour() != l.hour() {
        Transition::HourChanged
    } else {
        Transition::NoChange
    }
}

/// Stateful wrapper holding the last processed instant.
#[derive(Debug, Clone)]
pub struct ClockMonitor {
    offset: FixedOffset,
    sync_floor: i64,
    last: Option<i64>,
}

impl ClockMonitor {
    pub fn new(utc_offset_secs: i32, sync_floor: i64) -> Self {
        Self {
            offset: fixed_offset(utc_offset_secs),
            sync_floor,
            last: None,
        }
    }

    pub fn from_config(config: &HistoryConfig) -> Self {
        Self::new(config.utc_offset_secs, config.sync_epoch_floor)
    }

    /// Seed the last processed instant (e.g. from the newest cached sample).
    pub fn with_last(mut self, last: Option<i64>) -> Self {
        self.last = last;
        self
    }

    /// Replace the last processed instant.
    pub fn reseed(&mut self, last: Option<i64>) {
        self.last = last;
    }

    pub fn last_processed(&self) -> Option<i64> {
        self.last
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// `true` when `synchronized` is reported and `now` is past the floor.
    pub fn is_ready(&self, now: i64, synchronized: bool) -> bool {
        synchronized && now >= self.sync_floor
    }

    /// `true` if `now` lies before the last processed instant.
    pub fn is_behind(&self, now: i64) -> bool {
        self.last.is_some_and(|last| now < last)
    }

    /// Classify without updating state.
    ///
    /// With no processed instant yet there is nothing to compare against,
    /// so the tick is [`Transition::NoChange`].
    pub fn classify(&self, now: i64, synchronized: bool) -> Result<Transition> {
        if !self.is_ready(now, synchronized) {
            return Err(HistoryError::ClockNotReady);
        }
        Ok(match self.last {
            Some(last) if now >= last => classify(now, last, self.offset),
            _ => Transition::NoChange,
        })
    }

    /// Classify and advance: the first ready tick seeds the monitor, and
    /// every hour change moves the last processed instant to `now`.
    pub fn observe(&mut self, now: i64, synchronized: bool) -> Result<Transition> {
        let transition = self.classify(now, synchronized)?;
        if self.last.is_none() || transition.hour_changed() {
            self.last = Some(now);
        }
        Ok(transition)
    }
}
