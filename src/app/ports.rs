//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ HistoryService (domain)
//! ```
//!
//! Driven adapters (sensor, wall clock, storage, event sink, config) implement
//! these traits. The [`HistoryService`](super::service::HistoryService)
//! consumes them via generics, so the history core never touches hardware
//! directly and runs unchanged against in-memory mocks.

use crate::config::HistoryConfig;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// One raw reading. A `None` field means the sensor produced no value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorReading {
    pub temperature: Option<f32>,
    pub humidity: Option<f32>,
}

impl SensorReading {
    pub fn new(temperature: f32, humidity: f32) -> Self {
        Self {
            temperature: Some(temperature),
            humidity: Some(humidity),
        }
    }

    /// A reading where neither channel answered.
    pub fn failed() -> Self {
        Self::default()
    }

    pub fn is_complete(&self) -> bool {
        self.temperature.is_some() && self.humidity.is_some()
    }
}

/// Read-side port: the domain calls this once per recorded hour.
pub trait SensorPort {
    fn read(&mut self) -> SensorReading;
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: RTC / SNTP → domain)
// ───────────────────────────────────────────────────────────────

/// Wall-clock source.
pub trait ClockPort {
    /// Seconds since the Unix epoch (UTC).
    fn now(&self) -> i64;

    /// `false` until the wall clock has been set from a trusted source.
    fn is_synchronized(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists [`HistoryConfig`].
///
/// Implementations MUST validate before persisting and reject out-of-range
/// values with [`ConfigError::ValidationFailed`] instead of clamping.
pub trait ConfigPort {
    /// Returns [`HistoryConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<HistoryConfig, ConfigError>;

    fn save(&mut self, config: &HistoryConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ flash filesystem)
// ───────────────────────────────────────────────────────────────

/// Persistent namespaced blob storage (history cache, exported CSV files).
///
/// - `write` replaces the whole value; a power cut must leave either the
///   old or the new content, never a mix of both.
/// - Keys are namespaced to keep the cache apart from exported files.
pub trait StoragePort {
    /// Read a value. Returns the number of bytes written to `buf`; a value
    /// longer than `buf` is cut to `buf.len()`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Replace a value.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key. Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
