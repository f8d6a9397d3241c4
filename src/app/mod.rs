//! Application core — pure domain logic, zero I/O.
//!
//! This module wires the history core into a tick handler. All interaction
//! with the sensor, the wall clock and flash storage happens through
//! **port traits** defined in [`ports`], keeping this layer fully testable
//! without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
