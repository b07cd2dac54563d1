//! Peripheral timing-automaton simulator library.
//!
//! This crate implements nanosecond-resolution models of board peripherals with the following:
//! 1. **Common:** Virtual clock, pin words, CRC-8, violations, and error types.
//! 2. **SoC:** The device contract, one-wire and SPI flash models, telemetry, and the platform arena.
//! 3. **Simulation:** Tick scheduler and bus-master waveforms.
//! 4. **Configuration:** JSON board descriptions with per-field defaults.

/// Common types (time, pins, checksums, violations, errors).
pub mod common;
/// Board configuration (defaults, device descriptions, JSON loading).
pub mod config;
/// Scheduler and bus drivers.
pub mod sim;
/// Board components (device trait, devices, telemetry, platform).
pub mod soc;

/// Root configuration type; use `Config::default()` or `Config::from_json_str`.
pub use crate::config::Config;
/// Tick scheduler owning the clock and the platform.
pub use crate::sim::Simulator;
/// Device arena and its handles.
pub use crate::soc::{DeviceHandle, Platform};
/// The lifecycle contract every device implements.
pub use crate::soc::traits::Device;
