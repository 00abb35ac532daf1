//! Hardware-independent core library for flightbox
//!
//! This crate contains the peripheral drivers of the flightbox controller:
//! the BMP180 barometer with its calibration-based compensation engine, the
//! ITG-3205 rate gyroscope, and the dual H-bridge motor driver. Drivers are
//! written against the `embedded-hal` 1.0 traits and take their bus, delay
//! and PWM channels by value, so there is no global peripheral state.
//!
//! It is `#![no_std]` so it compiles on both embedded targets and desktop
//! hosts (for the simulator and tests).

#![no_std]

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod altitude;
pub mod bus;
pub mod config;
pub mod motors;
pub mod sensors;
pub mod shared_bus;

pub use config::Config;
pub use sensors::SensorError;
