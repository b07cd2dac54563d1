//! Configuration system for the peripheral simulator.
//!
//! This module defines the structures used to describe a simulated board. It provides:
//! 1. **Defaults:** Baseline constants (scheduler tick, M25P80 geometry, default ROM ID).
//! 2. **Structures:** General scheduler settings and a list of device descriptions.
//! 3. **Loading:** JSON parsing from strings or files, plus validation.
//!
//! Configuration is supplied as JSON (for the CLI and tests) or built with `Config::default()`.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::common::{ConfigError, Nanos};
use crate::soc::devices::spi_flash::{FlashTimings, Geometry, opcodes};

/// Default configuration constants for the simulator.
mod defaults {
    use crate::common::Nanos;

    /// Scheduler tick (1 µs).
    ///
    /// Fine enough to resolve the narrowest one-wire window (5 µs) several times over.
    pub const TICK_NS: Nanos = 1_000;

    /// Erase sectors in an M25P80.
    pub const SECTORS: usize = 16;

    /// Bytes per M25P80 sector (64 KiB).
    pub const SECTOR_SIZE: usize = 64 * 1024;

    /// Bytes per M25P80 program page.
    pub const PAGE_SIZE: usize = 256;

    /// Text form of the built-in one-wire ROM ID.
    pub const ROM_ID: &str = "0f:07:06:05:04:03:02:01";
}

/// Top-level board configuration.
///
/// # Examples
///
/// ```
/// use periphsim_core::config::{Config, DeviceConfig};
///
/// let json = r#"{
///     "general": { "tick_ns": 500 },
///     "devices": [
///         { "type": "one_wire", "name": "ds2401" },
///         { "type": "spi_flash", "name": "flash0", "sectors": 4 }
///     ]
/// }"#;
///
/// let config = Config::from_json_str(json).unwrap();
/// assert_eq!(config.general.tick_ns, 500);
/// assert!(matches!(&config.devices[1], DeviceConfig::SpiFlash(f) if f.sectors == 4));
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Scheduler settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Devices attached to the pin bus, in arena order.
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

impl Config {
    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a JSON configuration file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Checks device names are unique and flash geometries usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for device in &self.devices {
            if !names.insert(device.name()) {
                return Err(ConfigError::DuplicateDevice(device.name().to_owned()));
            }
            if let DeviceConfig::SpiFlash(flash) = device {
                flash
                    .geometry()
                    .validate()
                    .map_err(|reason| ConfigError::Geometry {
                        name: flash.name.clone(),
                        reason,
                    })?;
            }
        }
        Ok(())
    }
}

/// Scheduler settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Nanoseconds the clock advances per scheduler step.
    #[serde(default = "GeneralConfig::default_tick_ns")]
    pub tick_ns: Nanos,
    /// Forward device telemetry to `tracing` (target `periphsim::telemetry`).
    #[serde(default)]
    pub trace_telemetry: bool,
}

impl GeneralConfig {
    fn default_tick_ns() -> Nanos {
        defaults::TICK_NS
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            tick_ns: defaults::TICK_NS,
            trace_telemetry: false,
        }
    }
}

/// One device on the bus.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceConfig {
    /// DS2401-class one-wire serial number.
    OneWire(OneWireConfig),
    /// M25P-class SPI flash.
    SpiFlash(SpiFlashConfig),
}

impl DeviceConfig {
    /// Instance name.
    pub fn name(&self) -> &str {
        match self {
            Self::OneWire(c) => &c.name,
            Self::SpiFlash(c) => &c.name,
        }
    }
}

/// One-wire device settings.
#[derive(Debug, Clone, Deserialize)]
pub struct OneWireConfig {
    /// Instance name.
    pub name: String,
    /// ROM ID in `crc:serial5:...:serial0:family` form; malformed text falls back to the default.
    #[serde(default = "OneWireConfig::default_rom_id")]
    pub rom_id: String,
}

impl OneWireConfig {
    fn default_rom_id() -> String {
        defaults::ROM_ID.to_owned()
    }
}

/// SPI flash settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SpiFlashConfig {
    /// Instance name.
    pub name: String,
    /// Erase sectors.
    #[serde(default = "SpiFlashConfig::default_sectors")]
    pub sectors: usize,
    /// Bytes per sector.
    #[serde(default = "SpiFlashConfig::default_sector_size")]
    pub sector_size: usize,
    /// Bytes per program page.
    #[serde(default = "SpiFlashConfig::default_page_size")]
    pub page_size: usize,
    /// Image loaded at construction; the array is erased if absent or unusable.
    #[serde(default)]
    pub load_image: Option<PathBuf>,
    /// Image written on power-down.
    #[serde(default)]
    pub dump_image: Option<PathBuf>,
    /// Electronic signature returned by RES.
    #[serde(default = "SpiFlashConfig::default_signature")]
    pub signature: u8,
    /// Busy times of write-class instructions.
    #[serde(default)]
    pub timings: FlashTimings,
}

impl SpiFlashConfig {
    fn default_sectors() -> usize {
        defaults::SECTORS
    }

    fn default_sector_size() -> usize {
        defaults::SECTOR_SIZE
    }

    fn default_page_size() -> usize {
        defaults::PAGE_SIZE
    }

    fn default_signature() -> u8 {
        opcodes::M25P80_SIGNATURE
    }

    /// Array layout described by this entry.
    pub const fn geometry(&self) -> Geometry {
        Geometry {
            sectors: self.sectors,
            sector_size: self.sector_size,
            page_size: self.page_size,
        }
    }
}
