//! Standard-speed one-wire timing windows.
//!
//! All windows are inclusive and measured from the edge that opened them.

use crate::common::{Nanos, Window, us};

/// Master reset pulse (low).
pub const RESET_LOW: Window = Window::from_us(480, 640);

/// Wait between the master releasing the reset pulse and the presence pulse.
pub const PRESENCE_HIGH: Window = Window::from_us(15, 60);

/// Earliest point after release at which a master may sample for presence.
pub const PRESENCE_SAMPLE_MIN: Nanos = us(6);

/// Presence pulse (device holds the line low).
pub const PRESENCE_LOW: Window = Window::from_us(60, 240);

/// How long this device holds the presence pulse.
pub const PRESENCE_LOW_HOLD: Nanos = us(120);

/// Master low time that encodes a 0 bit.
pub const WRITE0_LOW: Window = Window::from_us(60, 120);

/// Master low time that encodes a 1 bit or requests a read slot.
pub const WRITE1_LOW: Window = Window::from_us(5, 15);

/// Device hold time in a read slot, measured from the master's falling edge.
///
/// The device drives its bit from the master's release until `min`, then holds
/// it to `max` where the master samples.
pub const READ_LOW: Window = Window::from_us(6, 15);

/// Minimum high time between slots.
pub const RECOVERY_MIN: Nanos = us(5);

/// Bit slot length.
pub const SLOT: Window = Window::from_us(65, 70);

/// Longest gap between master edges before a mid-protocol device gives up.
pub const WATCHDOG: Nanos = RESET_LOW.max;

/// Bus speed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Speed {
    /// Standard speed (the windows in this module).
    #[default]
    Standard,
    /// Overdrive speed; recognized, never entered.
    Overdrive,
}
