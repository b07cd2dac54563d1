//! One-wire serial-number device (DS2401 class).
//!
//! The device is a three-layer automaton:
//! 1. **Reset:** Detects a reset-length low pulse and answers with a presence pulse.
//! 2. **Read Command:** Decodes eight write slots into a ROM function command.
//! 3. **Device:** Executes the command (streams the ROM, matches an ID, or idles selected).
//!
//! Only the layer matching the active phase advances. Timers are evaluated lazily
//! against the shared clock on every `write`, `read`, and `update`.

use crate::common::{ClockHandle, Nanos, PinWord, RomIdError, Violation, ViolationLog};
use crate::soc::telemetry::{NullTelemetry, TelemetrySink};
use crate::soc::traits::Device;

use super::rom::{ROM_LEN, RomCommand, RomId};
use super::slot::{Signal, SlotEngine, SlotEvent};
use super::timing::{PRESENCE_HIGH, PRESENCE_LOW_HOLD, RECOVERY_MIN, RESET_LOW, Speed, WATCHDOG};

/// Bus bit carrying the DQ line.
pub const DQ_BIT: u32 = 0;

/// Reset and presence sub-automaton.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResetState {
    /// Idle, waiting for the master to pull the line low.
    Wait,
    /// Master holds the line low.
    ResetPulse {
        /// Master falling edge.
        since: Nanos,
    },
    /// Reset accepted; waiting before driving presence.
    PresencePulse {
        /// Master release.
        since: Nanos,
    },
    /// Device drives the presence pulse.
    PresencePulseEnd {
        /// Start of the presence pulse.
        since: Nanos,
    },
    /// Presence released; recovery running.
    PresencePulseRec {
        /// End of the presence pulse.
        since: Nanos,
    },
}

impl ResetState {
    /// State name used in violation reports.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Wait => "WAIT",
            Self::ResetPulse { .. } => "RESET_PULSE",
            Self::PresencePulse { .. } => "PRESENCE_PULSE",
            Self::PresencePulseEnd { .. } => "PRESENCE_PULSE_END",
            Self::PresencePulseRec { .. } => "PRESENCE_PULSE_REC",
        }
    }
}

/// Command being executed in the device phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Function {
    /// Streaming ROM byte `index`.
    ReadRom {
        /// Transmit engine loaded with the current byte.
        engine: SlotEngine,
        /// Position in the ROM ID.
        index: usize,
    },
    /// Comparing received byte `index` against the ROM ID.
    MatchRom {
        /// Receive engine.
        engine: SlotEngine,
        /// Position in the ROM ID.
        index: usize,
    },
    /// Addressed and idle until the next reset.
    Selected,
}

/// Top-level phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Reset and presence handling.
    Reset(ResetState),
    /// Receiving the ROM function command.
    ReadCommand(SlotEngine),
    /// Executing a ROM function command.
    Device(Function),
}

impl Phase {
    /// Phase name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Reset(_) => "RESET",
            Self::ReadCommand(_) => "READ_COMMAND",
            Self::Device(_) => "DEVICE",
        }
    }
}

/// A one-wire slave exposing a 64-bit ROM ID.
#[derive(Debug)]
pub struct OneWireDevice {
    name: String,
    clock: ClockHandle,
    telemetry: Box<dyn TelemetrySink>,
    violations: ViolationLog,
    rom: RomId,
    speed: Speed,
    powered: bool,
    phase: Phase,
    entered_at: Nanos,
    last_command: Option<RomCommand>,
    master_high: bool,
    low_since: Nanos,
    last_edge_at: Nanos,
    driving_low: bool,
    output_pending: bool,
}

impl OneWireDevice {
    /// Creates a powered device in `RESET/WAIT`.
    ///
    /// An ID whose CRC does not match is kept and reported as a violation.
    ///
    /// # Arguments
    ///
    /// * `name` - Instance name.
    /// * `clock` - Read-only handle to the shared clock.
    /// * `rom` - ROM ID answered by READ_ROM.
    pub fn new(name: impl Into<String>, clock: ClockHandle, rom: RomId) -> Self {
        let now = clock.now();
        let mut device = Self {
            name: name.into(),
            clock,
            telemetry: Box::new(NullTelemetry),
            violations: ViolationLog::new(),
            rom,
            speed: Speed::Standard,
            powered: true,
            phase: Phase::Reset(ResetState::Wait),
            entered_at: now,
            last_command: None,
            master_high: true,
            low_since: now,
            last_edge_at: now,
            driving_low: false,
            output_pending: false,
        };
        device.check_rom_crc(now);
        device
    }

    /// Creates a device from the persisted text form of its ID.
    ///
    /// Malformed text falls back to [`RomId::DEFAULT`].
    pub fn from_id_string(name: impl Into<String>, clock: ClockHandle, text: &str) -> Self {
        let name = name.into();
        let rom = text.parse::<RomId>().unwrap_or_else(|e: RomIdError| {
            tracing::warn!(device = %name, input = text, error = %e, "bad ROM ID, using default");
            RomId::DEFAULT
        });
        Self::new(name, clock, rom)
    }

    /// Replaces the telemetry sink.
    #[must_use]
    pub fn with_telemetry(mut self, sink: impl TelemetrySink + 'static) -> Self {
        self.telemetry = Box::new(sink);
        self
    }

    /// Current top-level phase.
    pub const fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Reset sub-state, if the device is in the reset phase.
    pub const fn reset_state(&self) -> Option<ResetState> {
        match self.phase {
            Phase::Reset(state) => Some(state),
            _ => None,
        }
    }

    /// Bit-transfer state, if a slot engine is active.
    pub fn signal(&self) -> Option<Signal> {
        self.engine().map(SlotEngine::signal)
    }

    /// Time the current phase was entered.
    pub const fn entered_at(&self) -> Nanos {
        self.entered_at
    }

    /// Last decoded ROM function command.
    pub const fn last_command(&self) -> Option<RomCommand> {
        self.last_command
    }

    /// ROM ID.
    pub const fn rom_id(&self) -> RomId {
        self.rom
    }

    /// Replaces the ROM ID, reporting a CRC mismatch.
    pub fn set_rom_id(&mut self, rom: RomId) {
        self.rom = rom;
        self.check_rom_crc(self.clock.now());
    }

    /// Bus speed.
    pub const fn speed(&self) -> Speed {
        self.speed
    }

    /// Returns `true` while power is applied.
    pub const fn is_powered(&self) -> bool {
        self.powered
    }

    /// Returns `true` while the device pulls DQ low.
    pub const fn drives_low(&self) -> bool {
        self.driving_low
    }

    /// Wired-AND level of DQ as seen by both sides.
    pub const fn wire_level(&self) -> bool {
        self.master_high && !self.driving_low
    }

    fn check_rom_crc(&mut self, now: Nanos) {
        if !self.rom.crc_valid() {
            let violation = Violation::RomCrc {
                stored: self.rom.crc(),
                computed: self.rom.computed_crc(),
            };
            self.violations.record(&self.name, now, violation);
        }
    }

    fn engine(&self) -> Option<&SlotEngine> {
        match &self.phase {
            Phase::ReadCommand(engine)
            | Phase::Device(Function::ReadRom { engine, .. } | Function::MatchRom { engine, .. }) => {
                Some(engine)
            }
            _ => None,
        }
    }

    fn engine_mut(&mut self) -> Option<&mut SlotEngine> {
        match &mut self.phase {
            Phase::ReadCommand(engine)
            | Phase::Device(Function::ReadRom { engine, .. } | Function::MatchRom { engine, .. }) => {
                Some(engine)
            }
            _ => None,
        }
    }

    fn enter(&mut self, phase: Phase, now: Nanos) {
        self.phase = phase;
        self.entered_at = now;
    }

    fn report(&mut self, now: Nanos, violation: Violation) {
        self.violations.record(&self.name, now, violation);
    }

    /// Abandons whatever is in progress.
    ///
    /// A master still holding the line low may be starting a reset, so the
    /// low time is tracked from its falling edge.
    fn abort(&mut self, now: Nanos) {
        let state = if self.master_high {
            ResetState::Wait
        } else {
            ResetState::ResetPulse {
                since: self.low_since,
            }
        };
        self.enter(Phase::Reset(state), now);
    }

    fn begin_presence(&mut self, now: Nanos) {
        tracing::debug!(device = %self.name, at_ns = now, "reset detected");
        self.speed = Speed::Standard;
        self.enter(Phase::Reset(ResetState::PresencePulse { since: now }), now);
    }

    /// Applies every deadline that expired at or before `now`.
    fn service(&mut self, now: Nanos) {
        loop {
            match self.phase {
                Phase::Reset(ResetState::PresencePulse { since })
                    if now >= since + PRESENCE_HIGH.min =>
                {
                    let at = since + PRESENCE_HIGH.min;
                    self.enter(Phase::Reset(ResetState::PresencePulseEnd { since: at }), at);
                }
                Phase::Reset(ResetState::PresencePulseEnd { since })
                    if now >= since + PRESENCE_LOW_HOLD =>
                {
                    let at = since + PRESENCE_LOW_HOLD;
                    self.enter(Phase::Reset(ResetState::PresencePulseRec { since: at }), at);
                }
                Phase::Reset(ResetState::PresencePulseRec { since }) if now >= since + RECOVERY_MIN => {
                    let at = since + RECOVERY_MIN;
                    tracing::debug!(device = %self.name, at_ns = at, "presence complete");
                    self.enter(Phase::ReadCommand(SlotEngine::receive()), at);
                }
                _ => {
                    let master_low = !self.master_high;
                    let Some(engine) = self.engine_mut() else {
                        return;
                    };
                    let event = engine.poll(now, master_low);
                    if event == SlotEvent::Idle {
                        return;
                    }
                    self.handle_slot_event(event, now);
                }
            }
        }
    }

    fn handle_slot_event(&mut self, event: SlotEvent, now: Nanos) {
        match event {
            SlotEvent::Idle => {}
            SlotEvent::BitWritten(_) | SlotEvent::BitRead(_) => self.on_bit(now),
            SlotEvent::Reset => self.begin_presence(now),
            SlotEvent::Violation(violation) => {
                self.report(now, violation);
                self.abort(now);
            }
        }
    }

    /// Acts on a byte completed by the active engine.
    fn on_bit(&mut self, now: Nanos) {
        match self.phase {
            Phase::ReadCommand(engine) if engine.shift().is_full() => {
                self.dispatch(engine.shift().byte(), now);
            }
            Phase::Device(Function::ReadRom { mut engine, index }) if engine.shift().is_full() => {
                let next = index + 1;
                if next == ROM_LEN {
                    tracing::debug!(device = %self.name, at_ns = now, "ROM streamed");
                    self.enter(Phase::Reset(ResetState::Wait), now);
                } else {
                    engine.reload(self.rom.byte(next));
                    self.phase = Phase::Device(Function::ReadRom {
                        engine,
                        index: next,
                    });
                }
            }
            Phase::Device(Function::MatchRom { mut engine, index }) if engine.shift().is_full() => {
                let got = engine.shift().byte();
                if got != self.rom.byte(index) {
                    tracing::debug!(device = %self.name, index, got, "MATCH_ROM mismatch");
                    self.enter(Phase::Reset(ResetState::Wait), now);
                } else if index + 1 == ROM_LEN {
                    tracing::debug!(device = %self.name, at_ns = now, "selected by MATCH_ROM");
                    self.enter(Phase::Device(Function::Selected), now);
                } else {
                    engine.reload(0);
                    self.phase = Phase::Device(Function::MatchRom {
                        engine,
                        index: index + 1,
                    });
                }
            }
            _ => {}
        }
    }

    fn dispatch(&mut self, opcode: u8, now: Nanos) {
        let command = RomCommand::decode(opcode);
        self.last_command = Some(command);
        tracing::debug!(
            device = %self.name,
            opcode,
            command = command.mnemonic(),
            "ROM command"
        );
        let function = match command {
            RomCommand::ReadRom => Function::ReadRom {
                engine: SlotEngine::transmit(self.rom.byte(0)),
                index: 0,
            },
            RomCommand::MatchRom => Function::MatchRom {
                engine: SlotEngine::receive(),
                index: 0,
            },
            RomCommand::SkipRom => Function::Selected,
            unsupported => {
                self.report(
                    now,
                    Violation::Unsupported {
                        opcode,
                        name: unsupported.mnemonic(),
                    },
                );
                self.abort(now);
                return;
            }
        };
        self.enter(Phase::Device(function), now);
    }

    fn on_falling(&mut self, now: Nanos) {
        if let Some(engine) = self.engine_mut() {
            let event = engine.on_falling(now);
            self.handle_slot_event(event, now);
            return;
        }
        match self.phase {
            Phase::Reset(ResetState::Wait) => {
                self.enter(Phase::Reset(ResetState::ResetPulse { since: now }), now);
            }
            Phase::Reset(
                state @ (ResetState::PresencePulse { .. }
                | ResetState::PresencePulseEnd { .. }
                | ResetState::PresencePulseRec { .. }),
            ) => {
                self.report(
                    now,
                    Violation::Timing {
                        state: state.name(),
                        detail: "master drove the line during presence",
                        elapsed_ns: now - self.entered_at,
                    },
                );
                self.abort(now);
            }
            _ => {}
        }
    }

    fn on_rising(&mut self, now: Nanos) {
        if let Some(engine) = self.engine_mut() {
            let event = engine.on_rising(now);
            self.handle_slot_event(event, now);
            return;
        }
        let low = now - self.low_since;
        match self.phase {
            Phase::Reset(ResetState::ResetPulse { .. }) => {
                if RESET_LOW.contains(low) {
                    self.begin_presence(now);
                } else {
                    if low > RESET_LOW.max {
                        self.report(
                            now,
                            Violation::Timing {
                                state: "RESET_PULSE",
                                detail: "reset pulse too long",
                                elapsed_ns: low,
                            },
                        );
                    } else {
                        tracing::trace!(device = %self.name, low_ns = low, "short pulse ignored");
                    }
                    self.enter(Phase::Reset(ResetState::Wait), now);
                }
            }
            Phase::Device(Function::Selected) if RESET_LOW.contains(low) => self.begin_presence(now),
            _ => {}
        }
    }

    fn watchdog(&mut self, now: Nanos) {
        if self.phase == Phase::Reset(ResetState::Wait) {
            return;
        }
        let idle = now - self.last_edge_at;
        if idle <= WATCHDOG {
            return;
        }
        let mid_slot = matches!(self.phase, Phase::Reset(ResetState::ResetPulse { .. }))
            || self.engine().is_some_and(SlotEngine::in_slot);
        if mid_slot {
            let state = match self.phase {
                Phase::Reset(state) => state.name(),
                _ => self.engine().map_or("DEVICE", |e| e.signal().name()),
            };
            self.report(
                now,
                Violation::Timing {
                    state,
                    detail: "no master edge within the watchdog period",
                    elapsed_ns: idle,
                },
            );
        } else {
            tracing::debug!(device = %self.name, phase = self.phase.name(), "idle timeout");
        }
        self.enter(Phase::Reset(ResetState::Wait), now);
    }

    fn sync_output(&mut self, now: Nanos) {
        let low = self.powered
            && match self.phase {
                Phase::Reset(ResetState::PresencePulseEnd { .. }) => true,
                _ => self.engine().is_some_and(SlotEngine::drives_low),
            };
        if low != self.driving_low {
            self.driving_low = low;
            self.output_pending = true;
            self.telemetry.signal(&self.name, "dq", u64::from(!low), now);
        }
    }
}

impl Device for OneWireDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn reset(&mut self) {
        let now = self.clock.now();
        tracing::debug!(device = %self.name, at_ns = now, "reset");
        self.speed = Speed::Standard;
        self.last_command = None;
        self.last_edge_at = now;
        self.enter(Phase::Reset(ResetState::Wait), now);
        self.sync_output(now);
    }

    fn power_up(&mut self) {
        let now = self.clock.now();
        tracing::debug!(device = %self.name, at_ns = now, "power up");
        self.powered = true;
        self.master_high = true;
        self.reset();
        self.telemetry.power_mode(&self.name, "on", now);
    }

    fn power_down(&mut self) {
        let now = self.clock.now();
        tracing::debug!(device = %self.name, at_ns = now, "power down");
        self.powered = false;
        self.enter(Phase::Reset(ResetState::Wait), now);
        self.sync_output(now);
        self.telemetry.power_mode(&self.name, "off", now);
    }

    fn read(&mut self) -> PinWord {
        if !self.powered {
            return PinWord::UNKNOWN;
        }
        let now = self.clock.now();
        self.service(now);
        self.sync_output(now);
        self.output_pending = false;
        PinWord::new(1 << DQ_BIT, u32::from(!self.driving_low) << DQ_BIT)
    }

    fn write(&mut self, pins: PinWord) {
        if !self.powered {
            return;
        }
        let Some(high) = pins.level(DQ_BIT) else {
            return;
        };
        if high == self.master_high {
            return;
        }
        let now = self.clock.now();
        self.service(now);
        self.master_high = high;
        self.last_edge_at = now;
        if high {
            self.on_rising(now);
        } else {
            self.low_since = now;
            self.on_falling(now);
        }
        self.sync_output(now);
    }

    fn update(&mut self) {
        if !self.powered {
            return;
        }
        let now = self.clock.now();
        self.service(now);
        self.watchdog(now);
        self.sync_output(now);
    }

    fn violations(&self) -> &ViolationLog {
        &self.violations
    }

    fn violations_mut(&mut self) -> &mut ViolationLog {
        &mut self.violations
    }

    fn output_pending(&self) -> bool {
        self.output_pending
    }

    fn as_one_wire(&self) -> Option<&OneWireDevice> {
        Some(self)
    }

    fn as_one_wire_mut(&mut self) -> Option<&mut OneWireDevice> {
        Some(self)
    }
}
