//! Device lifecycle contract.
//!
//! This module defines the `Device` trait implemented by every peripheral model. It provides:
//! 1. **Identification:** `name` for arena lookup and log fields.
//! 2. **Lifecycle:** `reset`, `power_up`, `power_down`.
//! 3. **Pin Access:** `read` (device drives outward) and `write` (MCU drives inward).
//! 4. **Time:** `update`, called unconditionally once per scheduler tick.
//! 5. **Downcasting:** Optional casts to the concrete device types for device-specific access.
//!
//! The scheduler knows nothing about one-wire or SPI semantics; this trait is the
//! whole seam between them.

use crate::common::{PinWord, ViolationLog};
use crate::soc::devices::{OneWireDevice, SpiFlash};

/// Trait for peripherals attached to the pin bus.
///
/// `read`, `write`, and `update` operate on one internal representation, so a write
/// that changes a level is visible to the `update` of the same tick.
pub trait Device: Send + std::fmt::Debug {
    /// Returns the instance name (e.g., `"ds2401"`, `"flash0"`).
    fn name(&self) -> &str;

    /// Returns the automaton to its idle state without touching persistent contents.
    fn reset(&mut self);
    /// Applies power; the device starts from reset.
    fn power_up(&mut self);
    /// Removes power; subsequent reads report every pin unknown.
    fn power_down(&mut self);

    /// Returns the pins this device currently drives.
    ///
    /// Bits outside the returned mask are not driven by the device.
    fn read(&mut self) -> PinWord;
    /// Applies pin levels driven by the MCU.
    ///
    /// Only bits in `pins.mask` are considered, and only a change against the
    /// last-known level triggers edge logic.
    fn write(&mut self, pins: PinWord);
    /// Re-evaluates the automaton against the current time.
    ///
    /// This is the only chance to notice elapsed time with no bus activity.
    fn update(&mut self);

    /// Returns the device's violation history.
    fn violations(&self) -> &ViolationLog;
    /// Returns the device's violation history mutably (for draining).
    fn violations_mut(&mut self) -> &mut ViolationLog;

    /// Returns `true` if the device's output changed since the last `read`.
    fn output_pending(&self) -> bool {
        false
    }

    /// Returns a reference as `OneWireDevice` if this device is one; otherwise `None`.
    fn as_one_wire(&self) -> Option<&OneWireDevice> {
        None
    }
    /// Returns a mutable reference as `OneWireDevice` if this device is one; otherwise `None`.
    fn as_one_wire_mut(&mut self) -> Option<&mut OneWireDevice> {
        None
    }
    /// Returns a reference as `SpiFlash` if this device is one; otherwise `None`.
    fn as_spi_flash(&self) -> Option<&SpiFlash> {
        None
    }
    /// Returns a mutable reference as `SpiFlash` if this device is one; otherwise `None`.
    fn as_spi_flash_mut(&mut self) -> Option<&mut SpiFlash> {
        None
    }
}
