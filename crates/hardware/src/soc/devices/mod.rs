//! Pin-bus peripheral models.
//!
//! This module contains the concrete chips attached to the pin bus: a one-wire
//! serial-number device and an SPI NOR flash.

/// One-wire bus devices (DS2401 class).
pub mod onewire;

/// SPI NOR flash (M25P class).
pub mod spi_flash;

pub use onewire::OneWireDevice;
pub use spi_flash::SpiFlash;

pub use crate::soc::traits::Device;
