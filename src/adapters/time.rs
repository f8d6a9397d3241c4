//! Wall-clock time adapter.
//!
//! Implements [`ClockPort`] for the CLIMA logger.
//!
//! - **`target_os = "espidf"`** — reads the system clock set by SNTP.
//! - **`not(target_os = "espidf")`** — uses `std::time::SystemTime`, with
//!   an optional manual override for simulation.
//!
//! Either way, a wall clock earlier than the configured floor is never
//! reported as synchronised.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::app::ports::ClockPort;

/// Wall-clock adapter.
pub struct WallClock {
    sync_floor: i64,
    #[cfg(not(target_os = "espidf"))]
    manual: std::cell::Cell<Option<i64>>,
}

impl WallClock {
    pub fn new(sync_floor: i64) -> Self {
        Self {
            sync_floor,
            #[cfg(not(target_os = "espidf"))]
            manual: std::cell::Cell::new(None),
        }
    }

    /// Seconds since the Unix epoch from the system clock (0 if before it).
    fn system_secs() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs() as i64)
    }

    /// Pin the clock to `now` (simulation only). `None` returns to the
    /// system clock.
    #[cfg(not(target_os = "espidf"))]
    pub fn set(&self, now: Option<i64>) {
        self.manual.set(now);
    }
}

impl ClockPort for WallClock {
    #[cfg(target_os = "espidf")]
    fn now(&self) -> i64 {
        Self::system_secs()
    }

    #[cfg(not(target_os = "espidf"))]
    fn now(&self) -> i64 {
        self.manual.get().unwrap_or_else(Self::system_secs)
    }

    // The RTC keeps counting from its reset value until SNTP lands, so
    // anything below the floor is an unsynced clock.
    fn is_synchronized(&self) -> bool {
        self.now() >= self.sync_floor
    }
}
