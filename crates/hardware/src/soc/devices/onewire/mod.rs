//! One-wire bus devices.
//!
//! This module implements a DS2401-class serial-number chip on a single open-drain
//! line. It provides:
//! 1. **Timing:** Standard-speed reset, presence, and slot windows.
//! 2. **Slots:** A shared bit-transfer automaton for both transfer directions.
//! 3. **ROM:** The 64-bit identifier, its text form, and ROM function commands.
//! 4. **Device:** The phase automaton tying them together.

/// One-wire slave device.
pub mod device;
/// ROM ID and ROM function commands.
pub mod rom;
/// Bit-slot automaton.
pub mod slot;
/// Timing windows.
pub mod timing;

pub use device::{DQ_BIT, Function, OneWireDevice, Phase, ResetState};
pub use rom::{ROM_LEN, RomCommand, RomId};
pub use slot::{Signal, SlotEngine, SlotEvent};
pub use timing::Speed;
