//! Common utilities and types used throughout the peripheral simulator.
//!
//! This module provides the building blocks shared by every device model. It includes:
//! 1. **Time:** The virtual nanosecond clock, read-only handles, and tolerance windows.
//! 2. **Pins:** The (mask, value) pin word exchanged on the bus.
//! 3. **Checksums:** The Dallas/Maxim CRC-8 used by one-wire ROM IDs.
//! 4. **Error Handling:** Violation taxonomy, violation log, and configuration errors.

/// Dallas/Maxim CRC-8.
pub mod checksum;

/// Error, violation, and violation log types.
pub mod error;

/// Pin bus word.
pub mod pins;

/// Virtual clock and time units.
pub mod time;

pub use checksum::crc8;
pub use error::{ConfigError, ImageError, RomIdError, Violation, ViolationLog, ViolationRecord};
pub use pins::PinWord;
pub use time::{ClockHandle, Nanos, VirtualClock, Window, ms, s, us};
