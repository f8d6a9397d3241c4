//! Sensor drivers.
//!
//! The logger has a single combined temperature/humidity sensor; see
//! [`dht::DhtSensor`].

pub mod dht;

pub use dht::DhtSensor;
