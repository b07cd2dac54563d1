//! M25P-class SPI flash.
//!
//! The model works at byte granularity: a rising edge on C with all eight data
//! pins known clocks one instruction byte in and may present one byte out. It
//! provides:
//! 1. **Gating:** S# selects, HOLD# pauses, W# guards the status register.
//! 2. **Dispatch:** Opcode decode, argument accumulation, data streaming.
//! 3. **Interlocks:** WEL and WIP checks; violations are advisory and execution proceeds.
//! 4. **Busy Timing:** Write-class commands hold WIP until `end_of_busy`, cleared by `update`.

use std::path::{Path, PathBuf};

use crate::common::{ClockHandle, ImageError, Nanos, PinWord, Violation, ViolationLog};
use crate::soc::telemetry::{NullTelemetry, TelemetrySink};
use crate::soc::traits::Device;

use super::memory::{FlashArray, Geometry};
use super::opcodes::{self, BE, DP, FAST_READ, PP, RDSR, READ, RES, SE, WRDI, WREN, WRSR};
use super::status::StatusRegister;
use super::timing::FlashTimings;

/// Data pins D0..D7.
pub const DATA_MASK: u32 = 0xFF;
/// W# (write protect, active low).
pub const W_BIT: u32 = 8;
/// S# (chip select, active low).
pub const S_BIT: u32 = 9;
/// HOLD# (active low).
pub const HOLD_BIT: u32 = 10;
/// C (serial clock, rising edge).
pub const CLK_BIT: u32 = 11;

/// Power state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PowerMode {
    /// Deep power-down; only RES is accepted.
    DeepDown,
    /// Deselected and idle.
    Standby,
    /// Selected or finishing a write cycle.
    Active,
}

impl PowerMode {
    /// Name reported to telemetry.
    pub const fn name(self) -> &'static str {
        match self {
            Self::DeepDown => "deep-down",
            Self::Standby => "standby",
            Self::Active => "active",
        }
    }
}

/// Progress of the instruction in the current select cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandPhase {
    /// Waiting for an opcode.
    Nop,
    /// Collecting address, data, or dummy bytes.
    Arguments {
        /// Instruction.
        opcode: u8,
        /// Bytes received so far.
        args: [u8; 4],
        /// Number of bytes received.
        have: u8,
        /// Number of bytes required.
        need: u8,
    },
    /// Arguments satisfied; further clocks move data.
    Streaming {
        /// Instruction.
        opcode: u8,
        /// Current array address (unused by RDSR and RES).
        address: u32,
        /// Whether PP changed any byte.
        programmed: bool,
    },
    /// Complete; executes when S# rises.
    AwaitDeselect {
        /// Instruction.
        opcode: u8,
        /// WRSR value or SE address.
        arg: u32,
        /// Clocks arrived after the instruction was complete.
        overrun: bool,
    },
    /// Rejected; clocks are ignored until deselect.
    Ignored,
}

/// An SPI NOR flash device.
#[derive(Debug)]
pub struct SpiFlash {
    name: String,
    clock: ClockHandle,
    telemetry: Box<dyn TelemetrySink>,
    violations: ViolationLog,
    array: FlashArray,
    timings: FlashTimings,
    signature: u8,
    dump_path: Option<PathBuf>,
    powered: bool,
    power: PowerMode,
    status: StatusRegister,
    selected: bool,
    held: bool,
    write_protect: bool,
    clk_high: bool,
    command: CommandPhase,
    end_of_busy: Nanos,
    data_out: Option<u8>,
    output_pending: bool,
}

impl SpiFlash {
    /// Creates a powered, erased, deselected flash in standby.
    ///
    /// # Arguments
    ///
    /// * `name` - Instance name.
    /// * `clock` - Read-only handle to the shared clock.
    /// * `geometry` - Array layout. An invalid layout falls back to [`Geometry::M25P80`].
    pub fn new(name: impl Into<String>, clock: ClockHandle, geometry: Geometry) -> Self {
        let now = clock.now();
        let name = name.into();
        if let Err(reason) = geometry.validate() {
            tracing::warn!(device = %name, ?geometry, reason, "bad flash geometry, using M25P80");
        }
        Self {
            name,
            clock,
            telemetry: Box::new(NullTelemetry),
            violations: ViolationLog::new(),
            array: FlashArray::new(geometry),
            timings: FlashTimings::default(),
            signature: opcodes::M25P80_SIGNATURE,
            dump_path: None,
            powered: true,
            power: PowerMode::Standby,
            status: StatusRegister::default(),
            selected: false,
            held: false,
            write_protect: false,
            clk_high: false,
            command: CommandPhase::Nop,
            end_of_busy: now,
            data_out: None,
            output_pending: false,
        }
    }

    /// Replaces the busy times.
    #[must_use]
    pub fn with_timings(mut self, timings: FlashTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Replaces the electronic signature returned by RES.
    #[must_use]
    pub fn with_signature(mut self, signature: u8) -> Self {
        self.signature = signature;
        self
    }

    /// Replaces the telemetry sink.
    #[must_use]
    pub fn with_telemetry(mut self, sink: impl TelemetrySink + 'static) -> Self {
        self.telemetry = Box::new(sink);
        self
    }

    /// Loads an image; on failure the array stays erased and a warning is logged.
    #[must_use]
    pub fn with_load_image(mut self, path: impl AsRef<Path>) -> Self {
        if let Err(e) = self.load_image(path.as_ref()) {
            tracing::warn!(device = %self.name, error = %e, "flash image not loaded, array erased");
        }
        self
    }

    /// Sets the file written by `power_down` and [`SpiFlash::dump_image`].
    #[must_use]
    pub fn with_dump_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.dump_path = Some(path.into());
        self
    }

    /// Replaces the array contents with an image file.
    ///
    /// # Returns
    ///
    /// An error if the file is unreadable or not exactly the array size; the
    /// array is then fully erased.
    pub fn load_image(&mut self, path: &Path) -> Result<(), ImageError> {
        self.array.load(path)?;
        tracing::debug!(device = %self.name, path = %path.display(), "flash image loaded");
        Ok(())
    }

    /// Writes the array to the configured dump path, if any.
    pub fn dump_image(&self) -> Result<(), ImageError> {
        let Some(path) = &self.dump_path else {
            return Ok(());
        };
        self.array.dump(path)?;
        tracing::debug!(device = %self.name, path = %path.display(), "flash image dumped");
        Ok(())
    }

    /// Status register as software would read it.
    pub const fn status(&self) -> StatusRegister {
        self.status
    }

    /// Power state.
    pub const fn power_mode(&self) -> PowerMode {
        self.power
    }

    /// Instruction progress.
    pub const fn command(&self) -> CommandPhase {
        self.command
    }

    /// Time at which the current write cycle ends.
    pub const fn end_of_busy(&self) -> Nanos {
        self.end_of_busy
    }

    /// Array contents.
    pub const fn array(&self) -> &FlashArray {
        &self.array
    }

    /// Array contents, mutable (backdoor access for tests and loaders).
    pub const fn array_mut(&mut self) -> &mut FlashArray {
        &mut self.array
    }

    /// Busy times.
    pub const fn timings(&self) -> &FlashTimings {
        &self.timings
    }

    /// Electronic signature.
    pub const fn signature(&self) -> u8 {
        self.signature
    }

    /// Returns `true` while S# is asserted.
    pub const fn is_selected(&self) -> bool {
        self.selected
    }

    /// Returns `true` while HOLD# is asserted.
    pub const fn is_held(&self) -> bool {
        self.held
    }

    /// Returns `true` while W# is asserted.
    pub const fn is_write_protected(&self) -> bool {
        self.write_protect
    }

    /// Returns `true` while the device is powered.
    pub const fn is_powered(&self) -> bool {
        self.powered
    }

    fn report(&mut self, now: Nanos, violation: Violation) {
        self.violations.record(&self.name, now, violation);
    }

    fn set_power(&mut self, mode: PowerMode, now: Nanos) {
        if self.power != mode {
            tracing::debug!(device = %self.name, from = self.power.name(), to = mode.name(), "power mode");
            self.power = mode;
            self.telemetry.power_mode(&self.name, mode.name(), now);
        }
    }

    fn set_output(&mut self, byte: Option<u8>) {
        if self.data_out != byte {
            self.data_out = byte;
            self.output_pending = true;
        }
    }

    fn sector_protected(&self, address: u32) -> bool {
        let geometry = self.array.geometry();
        let protected = self.status.protected_sectors(geometry.sectors);
        let sector = geometry.sector_of(address as usize % geometry.size());
        sector >= geometry.sectors - protected
    }

    fn require_wel(&mut self, opcode: u8, now: Nanos) {
        if !self.status.wel() {
            self.report(
                now,
                Violation::Logical {
                    opcode,
                    reason: "write enable latch not set",
                },
            );
        }
    }

    fn start_busy(&mut self, opcode: u8, duration: Nanos, now: Nanos) {
        self.status.set_wip(true);
        self.status.set_wel(false);
        self.end_of_busy = now + duration;
        tracing::debug!(
            device = %self.name,
            command = opcodes::mnemonic(opcode),
            until_ns = self.end_of_busy,
            "write cycle started"
        );
        self.telemetry.signal(&self.name, "wip", 1, now);
    }

    fn select(&mut self, now: Nanos) {
        self.selected = true;
        self.command = CommandPhase::Nop;
        self.set_output(None);
        if self.power == PowerMode::Standby {
            self.set_power(PowerMode::Active, now);
        }
    }

    fn deselect(&mut self, now: Nanos) {
        self.selected = false;
        match self.command {
            CommandPhase::Arguments {
                opcode, have, need, ..
            } => self.report(
                now,
                Violation::Truncated {
                    opcode,
                    missing: need - have,
                },
            ),
            CommandPhase::AwaitDeselect {
                opcode,
                overrun: true,
                ..
            } => self.report(
                now,
                Violation::Logical {
                    opcode,
                    reason: "S# did not rise on the last byte boundary",
                },
            ),
            CommandPhase::AwaitDeselect { opcode, arg, .. } => self.finalize(opcode, arg, now),
            CommandPhase::Streaming {
                opcode: PP,
                programmed: true,
                ..
            } => self.start_busy(PP, self.timings.page_program_ns, now),
            _ => {}
        }
        self.command = CommandPhase::Nop;
        self.set_output(None);
        if !self.status.wip() && self.power == PowerMode::Active {
            self.set_power(PowerMode::Standby, now);
        }
    }

    /// Executes an instruction that takes effect on S# rising.
    fn finalize(&mut self, opcode: u8, arg: u32, now: Nanos) {
        match opcode {
            WREN => self.status.set_wel(true),
            WRDI => self.status.set_wel(false),
            DP => {
                tracing::debug!(device = %self.name, "entering deep power-down");
                self.set_power(PowerMode::DeepDown, now);
            }
            WRSR => {
                self.require_wel(opcode, now);
                if self.status.srwd() && self.write_protect {
                    self.report(now, Violation::Protection { opcode, address: 0 });
                }
                self.status.write(arg as u8);
                self.start_busy(opcode, self.timings.write_status_ns, now);
            }
            SE => {
                self.require_wel(opcode, now);
                if self.sector_protected(arg) {
                    self.report(now, Violation::Protection { opcode, address: arg });
                }
                self.array.erase_sector(arg);
                self.start_busy(opcode, self.timings.sector_erase_ns, now);
            }
            BE => {
                self.require_wel(opcode, now);
                if self.status.block_protect() != 0 {
                    self.report(now, Violation::Protection { opcode, address: 0 });
                }
                self.array.erase_all();
                self.start_busy(opcode, self.timings.bulk_erase_ns, now);
            }
            _ => {}
        }
    }

    /// Consumes one byte clocked in while selected and not held.
    fn clock_byte(&mut self, byte: u8, now: Nanos) {
        if self.power == PowerMode::DeepDown {
            if self.command == CommandPhase::Nop && byte == RES {
                tracing::debug!(device = %self.name, "released from deep power-down");
                self.set_power(PowerMode::Active, now);
                self.start_command(byte, now);
            } else if self.command == CommandPhase::Nop {
                self.report(
                    now,
                    Violation::Logical {
                        opcode: byte,
                        reason: "only RES is accepted in deep power-down",
                    },
                );
                self.command = CommandPhase::Ignored;
            }
            return;
        }
        match self.command {
            CommandPhase::Nop => self.start_command(byte, now),
            CommandPhase::Arguments {
                opcode,
                mut args,
                have,
                need,
            } => {
                args[usize::from(have)] = byte;
                let have = have + 1;
                if have == need {
                    self.arguments_complete(opcode, args, now);
                } else {
                    self.command = CommandPhase::Arguments {
                        opcode,
                        args,
                        have,
                        need,
                    };
                }
            }
            CommandPhase::Streaming {
                opcode,
                address,
                programmed,
            } => self.stream(opcode, address, programmed, byte),
            CommandPhase::AwaitDeselect { opcode, arg, .. } => {
                self.command = CommandPhase::AwaitDeselect {
                    opcode,
                    arg,
                    overrun: true,
                };
            }
            CommandPhase::Ignored => {}
        }
    }

    fn start_command(&mut self, opcode: u8, now: Nanos) {
        tracing::debug!(device = %self.name, opcode, command = opcodes::mnemonic(opcode), "instruction");
        if self.status.wip() && opcode != RDSR {
            self.report(
                now,
                Violation::Logical {
                    opcode,
                    reason: "instruction issued while a write is in progress",
                },
            );
        }
        self.command = match opcodes::argument_bytes(opcode) {
            None => {
                self.report(
                    now,
                    Violation::Unsupported {
                        opcode,
                        name: opcodes::mnemonic(opcode),
                    },
                );
                CommandPhase::Ignored
            }
            Some(0) if opcode == RDSR => {
                self.set_output(Some(self.status.bits()));
                CommandPhase::Streaming {
                    opcode,
                    address: 0,
                    programmed: false,
                }
            }
            Some(0) => CommandPhase::AwaitDeselect {
                opcode,
                arg: 0,
                overrun: false,
            },
            Some(need) => CommandPhase::Arguments {
                opcode,
                args: [0; 4],
                have: 0,
                need,
            },
        };
    }

    fn arguments_complete(&mut self, opcode: u8, args: [u8; 4], now: Nanos) {
        let address = u32::from_be_bytes([0, args[0], args[1], args[2]]);
        self.command = match opcode {
            WRSR => CommandPhase::AwaitDeselect {
                opcode,
                arg: u32::from(args[0]),
                overrun: false,
            },
            SE => CommandPhase::AwaitDeselect {
                opcode,
                arg: address,
                overrun: false,
            },
            PP => {
                self.require_wel(opcode, now);
                if self.sector_protected(address) {
                    self.report(now, Violation::Protection { opcode, address });
                }
                CommandPhase::Streaming {
                    opcode,
                    address,
                    programmed: false,
                }
            }
            _ => CommandPhase::Streaming {
                opcode,
                address,
                programmed: false,
            },
        };
    }

    /// Moves one data byte of a streaming instruction.
    fn stream(&mut self, opcode: u8, address: u32, programmed: bool, byte: u8) {
        let (address, programmed) = match opcode {
            RDSR => {
                self.set_output(Some(self.status.bits()));
                (address, programmed)
            }
            READ | FAST_READ => {
                self.set_output(Some(self.array.read(address)));
                (self.array.next_read_address(address), programmed)
            }
            PP => {
                self.array.program(address, byte);
                (self.array.next_program_address(address), true)
            }
            RES => {
                self.set_output(Some(self.signature));
                (address, programmed)
            }
            _ => (address, programmed),
        };
        self.command = CommandPhase::Streaming {
            opcode,
            address,
            programmed,
        };
    }
}

impl Device for SpiFlash {
    fn name(&self) -> &str {
        &self.name
    }

    fn reset(&mut self) {
        let now = self.clock.now();
        tracing::debug!(device = %self.name, at_ns = now, "reset");
        self.selected = false;
        self.held = false;
        self.clk_high = false;
        self.command = CommandPhase::Nop;
        self.status.set_wip(false);
        self.status.set_wel(false);
        self.end_of_busy = now;
        self.set_output(None);
        self.set_power(PowerMode::Standby, now);
    }

    fn power_up(&mut self) {
        let now = self.clock.now();
        tracing::debug!(device = %self.name, at_ns = now, "power up");
        self.powered = true;
        self.reset();
        self.telemetry.power_mode(&self.name, self.power.name(), now);
    }

    fn power_down(&mut self) {
        let now = self.clock.now();
        tracing::debug!(device = %self.name, at_ns = now, "power down");
        if let Err(e) = self.dump_image() {
            tracing::warn!(device = %self.name, error = %e, "flash image dump failed");
        }
        self.powered = false;
        self.selected = false;
        self.set_output(None);
        self.telemetry.power_mode(&self.name, "off", now);
    }

    fn read(&mut self) -> PinWord {
        self.output_pending = false;
        if !self.powered || !self.selected || self.held {
            return PinWord::UNKNOWN;
        }
        self.data_out
            .map_or(PinWord::UNKNOWN, |b| PinWord::new(DATA_MASK, u32::from(b)))
    }

    fn write(&mut self, pins: PinWord) {
        if !self.powered {
            return;
        }
        let now = self.clock.now();
        if let Some(level) = pins.level(W_BIT) {
            self.write_protect = !level;
        }
        if let Some(level) = pins.level(HOLD_BIT) {
            self.held = !level;
        }
        let select = pins.level(S_BIT).map(|level| !level);
        if select == Some(true) && !self.selected {
            self.select(now);
        }
        if let Some(clk) = pins.level(CLK_BIT) {
            let rising = clk && !self.clk_high;
            self.clk_high = clk;
            if rising && self.selected && !self.held {
                match pins.field(0, DATA_MASK) {
                    Some(byte) => self.clock_byte(byte as u8, now),
                    None => tracing::trace!(device = %self.name, "clock with unknown data ignored"),
                }
            }
        }
        if select == Some(false) && self.selected {
            self.deselect(now);
        }
    }

    fn update(&mut self) {
        if !self.powered {
            return;
        }
        let now = self.clock.now();
        if self.status.wip() && now >= self.end_of_busy {
            self.status.set_wip(false);
            tracing::debug!(device = %self.name, at_ns = now, "write cycle complete");
            self.telemetry.signal(&self.name, "wip", 0, now);
            if !self.selected {
                self.command = CommandPhase::Nop;
                if self.power == PowerMode::Active {
                    self.set_power(PowerMode::Standby, now);
                }
            }
        }
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

    fn as_spi_flash(&self) -> Option<&SpiFlash> {
        Some(self)
    }

    fn as_spi_flash_mut(&mut self) -> Option<&mut SpiFlash> {
        Some(self)
    }
}
