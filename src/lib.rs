//! gpionode firmware core library.
//!
//! Exposes the configuration/calibration core and the actuator command
//! model for integration testing and for the request layer. All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod actuator;
pub mod calibration;
pub mod config;
pub mod error;
pub mod ports;

pub mod adapters;
pub mod drivers;
