//! Inbound commands to the history service.
//!
//! These represent maintenance actions requested by the outside world
//! (status page, serial console) that the
//! [`HistoryService`](super::service::HistoryService) carries out between
//! ticks.

use core::fmt;
use core::str::FromStr;

/// Commands that external adapters can send into the history core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Persist the store now instead of waiting for the next retry window.
    Flush,

    /// Write the whole store to a timestamped CSV without resetting it.
    ExportSnapshot,

    /// Drop every sample outside the calendar month of the newest sample.
    TrimToLatestMonth,
}

/// Input that names no [`AppCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownCommand;

impl fmt::Display for UnknownCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown command (expected flush, snapshot or trim)")
    }
}

impl FromStr for AppCommand {
    type Err = UnknownCommand;

    /// Console spelling, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flush" | "save" => Ok(Self::Flush),
            "snapshot" | "dump" => Ok(Self::ExportSnapshot),
            "trim" => Ok(Self::TrimToLatestMonth),
            _ => Err(UnknownCommand),
        }
    }
}
