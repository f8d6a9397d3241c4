//! CLIMA firmware library.
//!
//! Exposes the pure-logic modules for integration testing and the host
//! maintenance tool. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod history;
pub mod pins;

pub mod adapters;
pub mod sensors;
