//! GPIO / peripheral pin assignments for the CLIMA sensor board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// DHT11 temperature / humidity sensor
// ---------------------------------------------------------------------------

/// Single-wire data line, open-drain with external 10 kOhm pull-up.
pub const DHT_DATA_GPIO: i32 = 2;

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// VFS mount point of the SPIFFS data partition.
pub const SPIFFS_BASE_PATH: &core::ffi::CStr = c"/spiffs";
