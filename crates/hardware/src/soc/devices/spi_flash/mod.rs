//! SPI NOR flash (M25P class).
//!
//! This module implements a serial flash driven through S#, C, HOLD#, W#, and an
//! 8-bit data lane. It provides:
//! 1. **Opcodes:** The instruction set and argument counts.
//! 2. **Status:** WIP, WEL, block protect, and SRWD.
//! 3. **Memory:** The array with sector and page views, image load and dump.
//! 4. **Timing:** Busy durations of write-class instructions.
//! 5. **Device:** The command automaton.

/// SPI flash device.
pub mod device;
/// Flash array storage.
pub mod memory;
/// Instruction set.
pub mod opcodes;
/// Status register.
pub mod status;
/// Busy times.
pub mod timing;

pub use device::{CLK_BIT, CommandPhase, DATA_MASK, HOLD_BIT, PowerMode, S_BIT, SpiFlash, W_BIT};
pub use memory::{ERASED, FlashArray, Geometry};
pub use status::StatusRegister;
pub use timing::FlashTimings;
