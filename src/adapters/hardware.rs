//! Hardware adapter — bridges the DHT11 to the [`SensorPort`] trait.
//!
//! This is the only module in the system that touches the sensor. On
//! non-espidf targets the driver uses its cfg-gated simulation stub.

use crate::app::ports::{SensorPort, SensorReading};
use crate::sensors::DhtSensor;

/// The DHT11 needs at least a second between measurements; back-to-back
/// reads inside that window return the previous result.
const MIN_READ_INTERVAL_MS: u64 = 1_000;

pub struct HardwareAdapter<'d> {
    dht: DhtSensor<'d>,
    last: Option<(u64, SensorReading)>,
    uptime_ms: fn() -> u64,
}

impl<'d> HardwareAdapter<'d> {
    pub fn new(dht: DhtSensor<'d>) -> Self {
        Self::with_uptime(dht, uptime_ms)
    }

    fn with_uptime(dht: DhtSensor<'d>, uptime_ms: fn() -> u64) -> Self {
        Self {
            dht,
            last: None,
            uptime_ms,
        }
    }
}

#[cfg(target_os = "espidf")]
fn uptime_ms() -> u64 {
    // SAFETY: esp_timer_get_time is a thread-safe read of the system timer.
    (unsafe { esp_idf_sys::esp_timer_get_time() }) as u64 / 1_000
}

#[cfg(not(target_os = "espidf"))]
fn uptime_ms() -> u64 {
    use std::sync::OnceLock;
    use std::time::Instant;
    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_millis() as u64
}

// ── SensorPort implementation ─────────────────────────────────

impl SensorPort for HardwareAdapter<'_> {
    fn read(&mut self) -> SensorReading {
        let now = (self.uptime_ms)();
        if let Some((at, reading)) = self.last {
            if now.saturating_sub(at) < MIN_READ_INTERVAL_MS {
                return reading;
            }
        }
        let reading = self.dht.read();
        self.last = Some((now, reading));
        reading
    }
}
