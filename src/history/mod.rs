//! Persistent hourly history — the core of the logger.
//!
//! ```text
//!  ClockMonitor ──classify──▶ HistoryService ──append──▶ SampleStore
//!                                   │                        │
//!                                   ├──save/load──▶ PersistenceCache
//!                                   └──rollover───▶ RolloverExporter
//! ```
//!
//! Everything in here is pure logic over [`StoragePort`](crate::app::ports::StoragePort);
//! no module touches hardware or reads the wall clock itself.

pub mod cache;
pub mod clock;
pub mod export;
pub mod store;

pub use cache::{CacheLoad, LoadStatus, PersistenceCache};
pub use clock::{ClockMonitor, Transition};
pub use export::RolloverExporter;
pub use store::SampleStore;

/// Store capacity: 24 hourly samples × 32 days.
pub const HISTORY_CAPACITY: usize = 24 * 32;

/// Encoded size of one [`Sample`] in the cache file.
pub const RECORD_SIZE: usize = 16;

/// One timestamped temperature/humidity reading.
///
/// Cache record layout (platform-native endianness, no padding):
/// ```text
/// ┌──────────────────┬───────────────┬───────────────┐
/// │ timestamp (8B)   │ temperature   │ humidity      │
/// │ i64, epoch secs  │ f32 (4B)      │ f32 (4B)      │
/// └──────────────────┴───────────────┴───────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: i64,
    pub temperature: f32,
    pub humidity: f32,
}

impl Sample {
    pub const fn new(timestamp: i64, temperature: f32, humidity: f32) -> Self {
        Self {
            timestamp,
            temperature,
            humidity,
        }
    }

    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        out[..8].copy_from_slice(&self.timestamp.to_ne_bytes());
        out[8..12].copy_from_slice(&self.temperature.to_ne_bytes());
        out[12..].copy_from_slice(&self.humidity.to_ne_bytes());
        out
    }

    pub fn decode(record: &[u8; RECORD_SIZE]) -> Self {
        let mut ts = [0u8; 8];
        let mut t = [0u8; 4];
        let mut h = [0u8; 4];
        ts.copy_from_slice(&record[..8]);
        t.copy_from_slice(&record[8..12]);
        h.copy_from_slice(&record[12..]);
        Self {
            timestamp: i64::from_ne_bytes(ts),
            temperature: f32::from_ne_bytes(t),
            humidity: f32::from_ne_bytes(h),
        }
    }
}

/// Decode every whole record in `bytes`, ignoring a trailing partial record.
///
/// Returns the decoded samples and the number of trailing bytes dropped.
pub fn decode_records(bytes: &[u8]) -> (Vec<Sample>, usize) {
    let chunks = bytes.chunks_exact(RECORD_SIZE);
    let remainder = chunks.remainder().len();
    let samples = chunks
        .filter_map(|c| <&[u8; RECORD_SIZE]>::try_from(c).ok())
        .map(Sample::decode)
        .collect();
    (samples, remainder)
}

/// Encode samples back-to-back, oldest first.
pub fn encode_records<'a>(samples: impl IntoIterator<Item = &'a Sample>) -> Vec<u8> {
    samples.into_iter().flat_map(|s| s.encode()).collect()
}
