//! System configuration parameters
//!
//! All tunable parameters for the CLIMA logger.
//! Values can be overridden via NVS (non-volatile storage).

use serde::{Deserialize, Serialize};

/// What to do with a new sample when the Sample Store is already full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverflowPolicy {
    /// Drop the oldest sample to make room.
    EvictOldest,
    /// Keep existing history and discard the new sample.
    Reject,
}

/// Core logger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    // --- Identity ---
    /// Hostname / advertised device name
    pub device_name: heapless::String<32>,

    // --- Clock ---
    /// Fixed offset of device-local time from UTC (seconds, east positive)
    pub utc_offset_secs: i32,
    /// Any wall-clock value before this epoch second is treated as unsynced
    pub sync_epoch_floor: i64,
    /// Boot-time attempts to wait for SNTP before entering the loop
    pub clock_sync_retries: u8,
    /// Delay between boot-time sync attempts (milliseconds)
    pub clock_sync_retry_ms: u32,

    // --- Timing ---
    /// Scheduler loop period (milliseconds)
    pub tick_interval_ms: u32,
    /// Minimum gap between retries of a failed cache save (seconds)
    pub persist_retry_secs: u32,

    // --- History ---
    /// Entries covered by a daily export
    pub daily_export_window: u16,
    /// Entries exposed to the UI graph
    pub render_window: u16,
    /// Behaviour when the Sample Store is full
    pub overflow_policy: OverflowPolicy,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        let mut device_name = heapless::String::new();
        let _ = device_name.push_str("CLIMA");

        Self {
            device_name,

            // Clock
            utc_offset_secs: -3 * 3600,       // UTC-3
            sync_epoch_floor: 1_609_459_200, // 2021-01-01T00:00:00Z
            clock_sync_retries: 30,
            clock_sync_retry_ms: 100,

            // Timing
            tick_interval_ms: 1000,
            persist_retry_secs: 300,

            // History
            daily_export_window: 24,  // one day of hourly samples
            render_window: 24 * 7,    // one week
            overflow_policy: OverflowPolicy::EvictOldest,
        }
    }
}
