//! Simulation scheduling and bus drivers.
//!
//! Provides the tick scheduler that owns the clock and the platform, and the
//! bus-master waveforms that stand in for the MCU.

/// One-wire and SPI bus masters.
pub mod driver;
/// Tick scheduler.
pub mod simulator;

pub use driver::{OneWireMaster, PresenceReport, SpiMaster};
pub use simulator::Simulator;
