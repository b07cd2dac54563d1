//! Platform construction and the device arena.
//!
//! This module builds the board from configuration. It performs:
//! 1. **Ownership:** Every device lives in one arena and is addressed by an opaque `DeviceHandle`.
//! 2. **Construction:** `Platform::from_config` instantiates one-wire and flash devices.
//! 3. **Broadcast:** Reset, power, and update calls fan out to every device in arena order.
//! 4. **Access:** Pin reads and writes by handle, lookup by name, and typed downcasts.

use std::fmt;

use crate::common::{ConfigError, PinWord, VirtualClock, ViolationRecord};
use crate::config::{Config, DeviceConfig, OneWireConfig, SpiFlashConfig};
use crate::soc::devices::{Device, OneWireDevice, SpiFlash};
use crate::soc::telemetry::TracingTelemetry;

/// Opaque index of a device in a [`Platform`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceHandle(usize);

impl DeviceHandle {
    /// Arena position.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Arena of devices attached to the pin bus.
#[derive(Debug, Default)]
pub struct Platform {
    devices: Vec<Box<dyn Device>>,
}

impl Platform {
    /// Creates an empty platform.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds every device described by `config`.
    ///
    /// # Arguments
    ///
    /// * `config` - Board description; validated again here.
    /// * `clock` - Clock whose read-only handle every device receives.
    ///
    /// # Returns
    ///
    /// The populated platform, or the first configuration error. Bad ROM IDs
    /// and unreadable images are not errors; those devices fall back to defaults.
    pub fn from_config(config: &Config, clock: &VirtualClock) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut platform = Self::new();
        let trace = config.general.trace_telemetry;
        for device in &config.devices {
            let handle = match device {
                DeviceConfig::OneWire(c) => {
                    let mut dev = one_wire_from(c, clock);
                    if trace {
                        dev = dev.with_telemetry(TracingTelemetry);
                    }
                    platform.add(Box::new(dev))
                }
                DeviceConfig::SpiFlash(c) => {
                    let mut dev = spi_flash_from(c, clock);
                    if trace {
                        dev = dev.with_telemetry(TracingTelemetry);
                    }
                    platform.add(Box::new(dev))
                }
            };
            tracing::debug!(device = device.name(), %handle, "device attached");
        }
        Ok(platform)
    }

    /// Takes ownership of a device and returns its handle.
    pub fn add(&mut self, device: Box<dyn Device>) -> DeviceHandle {
        self.devices.push(device);
        DeviceHandle(self.devices.len() - 1)
    }

    /// Number of devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Returns `true` if no device is attached.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Handles of all devices in arena order.
    pub fn handles(&self) -> impl Iterator<Item = DeviceHandle> + '_ {
        (0..self.devices.len()).map(DeviceHandle)
    }

    /// Finds a device by instance name.
    pub fn handle_by_name(&self, name: &str) -> Option<DeviceHandle> {
        self.devices
            .iter()
            .position(|d| d.name() == name)
            .map(DeviceHandle)
    }

    /// Device behind `handle`.
    pub fn get(&self, handle: DeviceHandle) -> Option<&dyn Device> {
        self.devices.get(handle.0).map(|d| &**d)
    }

    /// Device behind `handle`, mutable.
    pub fn get_mut(&mut self, handle: DeviceHandle) -> Option<&mut (dyn Device + 'static)> {
        self.devices.get_mut(handle.0).map(|d| &mut **d)
    }

    /// One-wire device behind `handle`.
    pub fn one_wire(&self, handle: DeviceHandle) -> Option<&OneWireDevice> {
        self.get(handle)?.as_one_wire()
    }

    /// One-wire device behind `handle`, mutable.
    pub fn one_wire_mut(&mut self, handle: DeviceHandle) -> Option<&mut OneWireDevice> {
        self.get_mut(handle)?.as_one_wire_mut()
    }

    /// SPI flash behind `handle`.
    pub fn spi_flash(&self, handle: DeviceHandle) -> Option<&SpiFlash> {
        self.get(handle)?.as_spi_flash()
    }

    /// SPI flash behind `handle`, mutable.
    pub fn spi_flash_mut(&mut self, handle: DeviceHandle) -> Option<&mut SpiFlash> {
        self.get_mut(handle)?.as_spi_flash_mut()
    }

    /// Samples the pins `handle` drives; unknown handles read as all unknown.
    pub fn read(&mut self, handle: DeviceHandle) -> PinWord {
        self.get_mut(handle).map_or(PinWord::UNKNOWN, |d| d.read())
    }

    /// Drives pins into `handle`; unknown handles are ignored.
    pub fn write(&mut self, handle: DeviceHandle, pins: PinWord) {
        if let Some(device) = self.get_mut(handle) {
            device.write(pins);
        }
    }

    /// Calls `update` on every device.
    pub fn update_all(&mut self) {
        for device in &mut self.devices {
            device.update();
        }
    }

    /// Resets every device (MCU reset).
    pub fn reset_all(&mut self) {
        for device in &mut self.devices {
            device.reset();
        }
    }

    /// Powers every device up.
    pub fn power_up_all(&mut self) {
        for device in &mut self.devices {
            device.power_up();
        }
    }

    /// Powers every device down.
    pub fn power_down_all(&mut self) {
        for device in &mut self.devices {
            device.power_down();
        }
    }

    /// Drains every device's violation log, tagging records with the device handle.
    pub fn drain_violations(&mut self) -> Vec<(DeviceHandle, ViolationRecord)> {
        let mut out = Vec::new();
        for (index, device) in self.devices.iter_mut().enumerate() {
            out.extend(
                device
                    .violations_mut()
                    .drain()
                    .into_iter()
                    .map(|r| (DeviceHandle(index), r)),
            );
        }
        out
    }
}

fn one_wire_from(config: &OneWireConfig, clock: &VirtualClock) -> OneWireDevice {
    OneWireDevice::from_id_string(config.name.clone(), clock.handle(), &config.rom_id)
}

fn spi_flash_from(config: &SpiFlashConfig, clock: &VirtualClock) -> SpiFlash {
    let mut flash = SpiFlash::new(config.name.clone(), clock.handle(), config.geometry())
        .with_timings(config.timings)
        .with_signature(config.signature);
    if let Some(path) = &config.load_image {
        flash = flash.with_load_image(path);
    }
    if let Some(path) = &config.dump_image {
        flash = flash.with_dump_image(path.clone());
    }
    flash
}
