//! DHT11 single-wire temperature/humidity sensor.
//!
//! The sensor answers with both channels at once; a checksum or timing
//! failure loses the whole measurement, which shows up here as a reading
//! with neither channel set.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: bit-banged through the `dht11` crate on an open-drain GPIO.
//! On host/test: reads from static atomics for injection. A NaN injected
//! into either channel reads back as a missing value.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::app::ports::SensorReading;

static SIM_TEMP_BITS: AtomicU32 = AtomicU32::new(0x41B0_0000); // 22.0
static SIM_HUMIDITY_BITS: AtomicU32 = AtomicU32::new(0x4248_0000); // 50.0

/// Inject the next host-side measurement. Use `f32::NAN` to simulate a
/// failed channel.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_reading(temperature: f32, humidity: f32) {
    SIM_TEMP_BITS.store(temperature.to_bits(), Ordering::Relaxed);
    SIM_HUMIDITY_BITS.store(humidity.to_bits(), Ordering::Relaxed);
}

fn channel(value: f32) -> Option<f32> {
    (!value.is_nan()).then_some(value)
}

#[cfg(target_os = "espidf")]
type DhtPin<'d> =
    esp_idf_hal::gpio::PinDriver<'d, esp_idf_hal::gpio::AnyIOPin, esp_idf_hal::gpio::InputOutput>;

pub struct DhtSensor<'d> {
    #[cfg(target_os = "espidf")]
    device: dht11::Dht11<DhtPin<'d>>,
    #[cfg(not(target_os = "espidf"))]
    _pin: core::marker::PhantomData<&'d ()>,
}

impl<'d> DhtSensor<'d> {
    #[cfg(target_os = "espidf")]
    pub fn new(pin: DhtPin<'d>) -> Self {
        Self {
            device: dht11::Dht11::new(pin),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            _pin: core::marker::PhantomData,
        }
    }

    /// Raw measurement in °C and %RH; NaN marks a failed channel.
    #[cfg(target_os = "espidf")]
    fn measure(&mut self) -> (f32, f32) {
        let mut delay = esp_idf_hal::delay::Ets;
        match self.device.perform_measurement(&mut delay) {
            // The driver reports tenths of a unit.
            Ok(m) => (f32::from(m.temperature) / 10.0, f32::from(m.humidity) / 10.0),
            Err(e) => {
                log::warn!("DHT11: measurement failed: {:?}", e);
                (f32::NAN, f32::NAN)
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn measure(&mut self) -> (f32, f32) {
        (
            f32::from_bits(SIM_TEMP_BITS.load(Ordering::Relaxed)),
            f32::from_bits(SIM_HUMIDITY_BITS.load(Ordering::Relaxed)),
        )
    }

    pub fn read(&mut self) -> SensorReading {
        let (temperature, humidity) = self.measure();
        SensorReading {
            temperature: channel(temperature),
            humidity: channel(humidity),
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for DhtSensor<'_> {
    fn default() -> Self {
        Self::new()
    }
}
