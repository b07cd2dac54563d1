//! Shared one-wire bit-transfer automaton.
//!
//! One engine serves both directions. In receive mode it decodes master write
//! slots into an LSB-first byte; in transmit mode it answers master read slots
//! from a loaded byte. The engine never decides what a finished byte means;
//! its owner checks [`BitShift::is_full`] after each completed bit.
//!
//! ```text
//! WAITING_LOW --master low--> WAITING_HIGH --release--+--5..15us--> WRITE_ENDSLOT (rx) / READ_VAL (tx)
//!                                                     +--60..120us-> WRITE_ENDSLOT (rx, bit 0)
//!                                                     +--480..640us> reset redirect
//! READ_VAL --6us--> READ_HOLD --15us, verify, release--> READ_REC --5us--> WAITING_LOW
//! ```

use crate::common::{Nanos, Violation};

use super::timing::{READ_LOW, RECOVERY_MIN, RESET_LOW, SLOT, WRITE0_LOW, WRITE1_LOW};

/// LSB-first byte assembly shared by both directions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BitShift {
    buffer: u8,
    count: u8,
}

impl BitShift {
    /// An empty shift register.
    pub const fn new() -> Self {
        Self {
            buffer: 0,
            count: 0,
        }
    }

    /// A shift register loaded with `byte` for transmission.
    pub const fn loaded(byte: u8) -> Self {
        Self {
            buffer: byte,
            count: 0,
        }
    }

    /// Appends a received bit at position `count`.
    pub const fn push(&mut self, bit: bool) {
        if bit {
            self.buffer |= 1 << self.count;
        }
        self.count += 1;
    }

    /// Bit to transmit next.
    pub const fn next_bit(&self) -> bool {
        (self.buffer >> self.count) & 1 != 0
    }

    /// Marks the next bit as transmitted.
    pub const fn advance(&mut self) {
        self.count += 1;
    }

    /// Returns `true` once eight bits moved.
    pub const fn is_full(&self) -> bool {
        self.count >= 8
    }

    /// Assembled (or loaded) byte.
    pub const fn byte(&self) -> u8 {
        self.buffer
    }

    /// Bits moved so far.
    pub const fn count(&self) -> u8 {
        self.count
    }
}

/// Direction of the slots an engine serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotMode {
    /// Master writes, device decodes.
    Receive,
    /// Master reads, device drives.
    Transmit,
}

/// Bit-transfer automaton state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    /// Idle high, waiting for the master to open a slot.
    WaitingLow,
    /// Master holds the line low.
    WaitingHigh {
        /// Master falling edge.
        fell_at: Nanos,
    },
    /// Write bit decoded; waiting out the rest of the slot.
    WriteEndSlot {
        /// Decoded bit.
        bit: bool,
        /// Time at which the bit is committed.
        commit_at: Nanos,
    },
    /// Read slot open; device drives its bit until the sample window opens.
    ReadVal {
        /// Master falling edge that opened the slot.
        fell_at: Nanos,
        /// Bit being sent.
        bit: bool,
    },
    /// Device holds its bit through the master's sample point.
    ReadHold {
        /// Master falling edge that opened the slot.
        fell_at: Nanos,
        /// Bit being sent.
        bit: bool,
    },
    /// Device released the line; recovery time running.
    ReadRec {
        /// Time the device released.
        released_at: Nanos,
        /// Bit that was sent.
        bit: bool,
    },
}

impl Signal {
    /// State name used in violation reports.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::WaitingLow => "WAITING_LOW",
            Self::WaitingHigh { .. } => "WAITING_HIGH",
            Self::WriteEndSlot { .. } => "WRITE_ENDSLOT",
            Self::ReadVal { .. } => "READ_VAL",
            Self::ReadHold { .. } => "READ_HOLD",
            Self::ReadRec { .. } => "READ_REC",
        }
    }
}

/// What a call into the engine produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlotEvent {
    /// Nothing the owner needs to act on.
    Idle,
    /// A write slot committed this bit into the shift register.
    BitWritten(bool),
    /// A read slot finished sending this bit.
    BitRead(bool),
    /// The low pulse had reset length; the owner must redirect to presence.
    Reset,
    /// The slot was malformed; the owner must abandon the transfer.
    Violation(Violation),
}

/// The bit-transfer automaton plus its shift register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotEngine {
    mode: SlotMode,
    signal: Signal,
    shift: BitShift,
}

impl SlotEngine {
    /// An engine decoding master writes into a fresh byte.
    pub const fn receive() -> Self {
        Self {
            mode: SlotMode::Receive,
            signal: Signal::WaitingLow,
            shift: BitShift::new(),
        }
    }

    /// An engine answering master reads with `byte`, LSB first.
    pub const fn transmit(byte: u8) -> Self {
        Self {
            mode: SlotMode::Transmit,
            signal: Signal::WaitingLow,
            shift: BitShift::loaded(byte),
        }
    }

    /// Current automaton state.
    pub const fn signal(&self) -> Signal {
        self.signal
    }

    /// Slot direction.
    pub const fn mode(&self) -> SlotMode {
        self.mode
    }

    /// Shift register.
    pub const fn shift(&self) -> &BitShift {
        &self.shift
    }

    /// Starts a new byte in the same direction, keeping the automaton state.
    pub const fn reload(&mut self, byte: u8) {
        self.shift = match self.mode {
            SlotMode::Receive => BitShift::new(),
            SlotMode::Transmit => BitShift::loaded(byte),
        };
    }

    /// Returns `true` while the device pulls the line low.
    pub const fn drives_low(&self) -> bool {
        matches!(
            self.signal,
            Signal::ReadVal { bit: false, .. } | Signal::ReadHold { bit: false, .. }
        )
    }

    /// Returns `true` between a slot opening and its completion.
    pub const fn in_slot(&self) -> bool {
        !matches!(self.signal, Signal::WaitingLow)
    }

    /// Master pulled the line low.
    ///
    /// Call [`SlotEngine::poll`] first so timers that already expired are applied.
    pub fn on_falling(&mut self, now: Nanos) -> SlotEvent {
        match self.signal {
            Signal::WaitingLow => {
                self.signal = Signal::WaitingHigh { fell_at: now };
                SlotEvent::Idle
            }
            Signal::WaitingHigh { .. } => SlotEvent::Idle,
            Signal::WriteEndSlot { commit_at, .. } => {
                let elapsed = SLOT.min.saturating_sub(commit_at.saturating_sub(now));
                self.abandon("WRITE_ENDSLOT", "next slot opened before the slot ended", elapsed)
            }
            Signal::ReadVal { fell_at, .. } | Signal::ReadHold { fell_at, .. } => {
                let name = self.signal.name();
                self.abandon(name, "master drove the line during a read slot", now - fell_at)
            }
            Signal::ReadRec { released_at, .. } => {
                self.abandon("READ_REC", "recovery time too short", now - released_at)
            }
        }
    }

    /// Master released the line.
    pub fn on_rising(&mut self, now: Nanos) -> SlotEvent {
        let Signal::WaitingHigh { fell_at } = self.signal else {
            return SlotEvent::Idle;
        };
        let low = now - fell_at;
        if WRITE1_LOW.contains(low) {
            match self.mode {
                SlotMode::Receive => self.end_write_slot(true, fell_at, now),
                SlotMode::Transmit => {
                    self.signal = Signal::ReadVal {
                        fell_at,
                        bit: self.shift.next_bit(),
                    };
                    SlotEvent::Idle
                }
            }
        } else if WRITE0_LOW.contains(low) {
            match self.mode {
                SlotMode::Receive => self.end_write_slot(false, fell_at, now),
                SlotMode::Transmit => {
                    self.abandon("WAITING_HIGH", "write-0 slot while the device transmits", low)
                }
            }
        } else if RESET_LOW.contains(low) {
            self.signal = Signal::WaitingLow;
            SlotEvent::Reset
        } else {
            self.abandon("WAITING_HIGH", "low pulse outside every slot window", low)
        }
    }

    /// Applies expired deadlines.
    ///
    /// # Arguments
    ///
    /// * `now` - Current simulated time.
    /// * `master_low` - Whether the master currently drives the line low.
    pub fn poll(&mut self, now: Nanos, master_low: bool) -> SlotEvent {
        loop {
            match self.signal {
                Signal::WriteEndSlot { bit, commit_at } if now >= commit_at => {
                    self.shift.push(bit);
                    self.signal = Signal::WaitingLow;
                    tracing::trace!(bit, count = self.shift.count(), "write slot committed");
                    return SlotEvent::BitWritten(bit);
                }
                Signal::ReadVal { fell_at, bit } if now >= fell_at + READ_LOW.min => {
                    self.signal = Signal::ReadHold { fell_at, bit };
                }
                Signal::ReadHold { fell_at, bit } if now >= fell_at + READ_LOW.max => {
                    // A master edge after the release abandons the slot, so the
                    // level passed in is the level held at the sample point.
                    let sample_at = fell_at + READ_LOW.max;
                    let line_high = !master_low && bit;
                    if line_high != bit {
                        return self.abandon(
                            "READ_HOLD",
                            "line does not match the transmitted bit",
                            READ_LOW.max,
                        );
                    }
                    self.signal = Signal::ReadRec {
                        released_at: sample_at,
                        bit,
                    };
                }
                Signal::ReadRec { released_at, bit } if now >= released_at + RECOVERY_MIN => {
                    self.shift.advance();
                    self.signal = Signal::WaitingLow;
                    tracing::trace!(bit, count = self.shift.count(), "read slot complete");
                    return SlotEvent::BitRead(bit);
                }
                _ => return SlotEvent::Idle,
            }
        }
    }

    fn end_write_slot(&mut self, bit: bool, fell_at: Nanos, now: Nanos) -> SlotEvent {
        let commit_at = (fell_at + SLOT.min).max(now + RECOVERY_MIN);
        self.signal = Signal::WriteEndSlot { bit, commit_at };
        SlotEvent::Idle
    }

    fn abandon(&mut self, state: &'static str, detail: &'static str, elapsed_ns: Nanos) -> SlotEvent {
        self.signal = Signal::WaitingLow;
        SlotEvent::Violation(Violation::Timing {
            state,
            detail,
            elapsed_ns,
        })
    }
}
