//! Bus-master waveforms.
//!
//! The MCU side of each bus, expressed as pin writes against a [`Simulator`].
//! It provides:
//! 1. **One-Wire Master:** Reset with presence sampling, write and read slots, ROM commands.
//! 2. **SPI Master:** Select, byte transfer, deselect, and the common flash instructions.
//!
//! Waveforms use standard-speed timings centered in their windows and advance
//! the simulator between edges, so devices see realistic elapsed times.

use crate::common::{Nanos, PinWord, us};
use crate::soc::DeviceHandle;
use crate::soc::devices::onewire::{DQ_BIT, ROM_LEN, RomId, rom::opcodes as rom_ops};
use crate::soc::devices::spi_flash::{
    CLK_BIT, DATA_MASK, HOLD_BIT, S_BIT, StatusRegister, W_BIT, opcodes as spi_ops,
};

use super::simulator::Simulator;

/// Master reset low time.
const RESET_LOW: Nanos = us(500);
/// Presence observation window after releasing reset.
const PRESENCE_WINDOW: Nanos = us(480);
/// Low time of a write-1 slot and of a read slot.
const SHORT_LOW: Nanos = us(6);
/// Low time of a write-0 slot.
const LONG_LOW: Nanos = us(64);
/// Read-slot sample point, from the falling edge.
const SAMPLE_AT: Nanos = us(12);
/// Full slot length including recovery.
const SLOT: Nanos = us(70);

/// What the master saw after a reset pulse.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PresenceReport {
    /// A device pulled the line low.
    pub present: bool,
    /// Release to start of presence.
    pub wait_ns: Nanos,
    /// Duration of the presence pulse.
    pub low_ns: Nanos,
}

/// One-wire bus master bound to one device.
#[derive(Clone, Copy, Debug)]
pub struct OneWireMaster {
    handle: DeviceHandle,
}

impl OneWireMaster {
    /// Creates a master driving `handle`.
    pub const fn new(handle: DeviceHandle) -> Self {
        Self { handle }
    }

    fn drive(self, sim: &mut Simulator, high: bool) {
        sim.write(self.handle, PinWord::new(1 << DQ_BIT, u32::from(high) << DQ_BIT));
    }

    fn line(self, sim: &mut Simulator) -> bool {
        sim.read(self.handle).level(DQ_BIT).unwrap_or(true)
    }

    /// Issues a reset pulse and samples the line every tick for the presence window.
    pub fn reset(self, sim: &mut Simulator) -> PresenceReport {
        self.drive(sim, false);
        let _ = sim.advance_by(RESET_LOW);
        self.drive(sim, true);
        let released = sim.now();
        let end = released + PRESENCE_WINDOW;
        let mut fell = None;
        let mut report = PresenceReport::default();
        while sim.now() < end {
            let _ = sim.step();
            let high = self.line(sim);
            match (fell, high) {
                (None, false) => fell = Some(sim.now()),
                (Some(at), true) if !report.present => {
                    report = PresenceReport {
                        present: true,
                        wait_ns: at - released,
                        low_ns: sim.now() - at,
                    };
                }
                _ => {}
            }
        }
        report
    }

    /// Sends one bit in a write slot.
    pub fn write_bit(self, sim: &mut Simulator, bit: bool) {
        let start = sim.now();
        self.drive(sim, false);
        let _ = sim.advance_by(if bit { SHORT_LOW } else { LONG_LOW });
        self.drive(sim, true);
        let _ = sim.advance_to(start + SLOT);
    }

    /// Sends one byte, LSB first.
    pub fn write_byte(self, sim: &mut Simulator, byte: u8) {
        for i in 0..8 {
            self.write_bit(sim, (byte >> i) & 1 != 0);
        }
    }

    /// Reads one bit in a read slot.
    pub fn read_bit(self, sim: &mut Simulator) -> bool {
        let start = sim.now();
        self.drive(sim, false);
        let _ = sim.advance_by(SHORT_LOW);
        self.drive(sim, true);
        let _ = sim.advance_to(start + SAMPLE_AT);
        let bit = self.line(sim);
        let _ = sim.advance_to(start + SLOT);
        bit
    }

    /// Reads one byte, LSB first.
    pub fn read_byte(self, sim: &mut Simulator) -> u8 {
        (0..8).fold(0, |acc, i| acc | (u8::from(self.read_bit(sim)) << i))
    }

    /// Reset followed by READ_ROM.
    ///
    /// # Returns
    ///
    /// The streamed bytes in transmission order, or `None` when no device answered the reset.
    pub fn read_rom(self, sim: &mut Simulator) -> Option<[u8; ROM_LEN]> {
        if !self.reset(sim).present {
            return None;
        }
        self.write_byte(sim, rom_ops::READ_ROM);
        let mut bytes = [0u8; ROM_LEN];
        for b in &mut bytes {
            *b = self.read_byte(sim);
        }
        Some(bytes)
    }

    /// Reset followed by MATCH_ROM with `rom`.
    pub fn match_rom(self, sim: &mut Simulator, rom: &RomId) -> bool {
        if !self.reset(sim).present {
            return false;
        }
        self.write_byte(sim, rom_ops::MATCH_ROM);
        for &b in rom.bytes() {
            self.write_byte(sim, b);
        }
        true
    }
}

/// SPI bus master bound to one flash.
#[derive(Clone, Copy, Debug)]
pub struct SpiMaster {
    handle: DeviceHandle,
    write_protect: bool,
    hold: bool,
    selected: bool,
}

impl SpiMaster {
    /// Creates a deselected master with W# and HOLD# released.
    pub const fn new(handle: DeviceHandle) -> Self {
        Self {
            handle,
            write_protect: false,
            hold: false,
            selected: false,
        }
    }

    fn pins(&self, clk: bool, data: u8) -> PinWord {
        let value = u32::from(data)
            | u32::from(!self.write_protect) << W_BIT
            | u32::from(!self.selected) << S_BIT
            | u32::from(!self.hold) << HOLD_BIT
            | u32::from(clk) << CLK_BIT;
        PinWord::new(DATA_MASK | 1 << W_BIT | 1 << S_BIT | 1 << HOLD_BIT | 1 << CLK_BIT, value)
    }

    fn apply(&self, sim: &mut Simulator) {
        sim.write(self.handle, self.pins(false, 0xFF));
    }

    /// Drives W# (`true` asserts write protect).
    pub fn set_write_protect(&mut self, sim: &mut Simulator, asserted: bool) {
        self.write_protect = asserted;
        self.apply(sim);
    }

    /// Drives HOLD# (`true` pauses the device).
    pub fn set_hold(&mut self, sim: &mut Simulator, asserted: bool) {
        self.hold = asserted;
        self.apply(sim);
    }

    /// Asserts S#.
    pub fn select(&mut self, sim: &mut Simulator) {
        self.selected = true;
        self.apply(sim);
    }

    /// Releases S#.
    pub fn deselect(&mut self, sim: &mut Simulator) {
        self.selected = false;
        self.apply(sim);
    }

    /// Clocks one byte out and samples the byte the device presents.
    ///
    /// Undriven data lines read as `0xFF`.
    pub fn transfer(&self, sim: &mut Simulator, byte: u8) -> u8 {
        sim.write(self.handle, self.pins(true, byte));
        let out = sim.read(self.handle).field(0, DATA_MASK).map_or(0xFF, |b| b as u8);
        sim.write(self.handle, self.pins(false, byte));
        out
    }

    /// Runs one select cycle sending `bytes`, then `read_len` dummy bytes.
    ///
    /// # Returns
    ///
    /// The bytes sampled during the dummy clocks.
    pub fn command(&mut self, sim: &mut Simulator, bytes: &[u8], read_len: usize) -> Vec<u8> {
        self.select(sim);
        for &b in bytes {
            let _ = self.transfer(sim, b);
        }
        let out = (0..read_len).map(|_| self.transfer(sim, 0xFF)).collect();
        self.deselect(sim);
        out
    }

    /// WREN.
    pub fn write_enable(&mut self, sim: &mut Simulator) {
        let _ = self.command(sim, &[spi_ops::WREN], 0);
    }

    /// WRDI.
    pub fn write_disable(&mut self, sim: &mut Simulator) {
        let _ = self.command(sim, &[spi_ops::WRDI], 0);
    }

    /// RDSR.
    pub fn read_status(&mut self, sim: &mut Simulator) -> StatusRegister {
        let out = self.command(sim, &[spi_ops::RDSR], 1);
        StatusRegister::from_bits(out.first().copied().unwrap_or(0xFF))
    }

    /// WRSR.
    pub fn write_status(&mut self, sim: &mut Simulator, value: u8) {
        let _ = self.command(sim, &[spi_ops::WRSR, value], 0);
    }

    /// PP at `address` with `data`.
    pub fn page_program(&mut self, sim: &mut Simulator, address: u32, data: &[u8]) {
        let mut bytes = with_address(spi_ops::PP, address);
        bytes.extend_from_slice(data);
        let _ = self.command(sim, &bytes, 0);
    }

    /// SE on the sector containing `address`.
    pub fn sector_erase(&mut self, sim: &mut Simulator, address: u32) {
        let _ = self.command(sim, &with_address(spi_ops::SE, address), 0);
    }

    /// BE.
    pub fn bulk_erase(&mut self, sim: &mut Simulator) {
        let _ = self.command(sim, &[spi_ops::BE], 0);
    }

    /// READ of `len` bytes from `address`.
    pub fn read(&mut self, sim: &mut Simulator, address: u32, len: usize) -> Vec<u8> {
        self.command(sim, &with_address(spi_ops::READ, address), len)
    }

    /// FAST_READ of `len` bytes from `address`.
    pub fn fast_read(&mut self, sim: &mut Simulator, address: u32, len: usize) -> Vec<u8> {
        let mut bytes = with_address(spi_ops::FAST_READ, address);
        bytes.push(0xFF);
        self.command(sim, &bytes, len)
    }

    /// DP.
    pub fn deep_power_down(&mut self, sim: &mut Simulator) {
        let _ = self.command(sim, &[spi_ops::DP], 0);
    }

    /// RES; returns the electronic signature.
    pub fn release_power_down(&mut self, sim: &mut Simulator) -> u8 {
        let out = self.command(sim, &[spi_ops::RES, 0xFF, 0xFF, 0xFF], 1);
        out.first().copied().unwrap_or(0xFF)
    }

    /// Polls RDSR until WIP clears.
    ///
    /// # Arguments
    ///
    /// * `poll_every` - Simulated time between polls.
    /// * `timeout` - Give up after this much simulated time.
    ///
    /// # Returns
    ///
    /// `true` if WIP cleared before the timeout.
    pub fn wait_while_busy(&mut self, sim: &mut Simulator, poll_every: Nanos, timeout: Nanos) -> bool {
        let deadline = sim.now() + timeout;
        loop {
            if !self.read_status(sim).wip() {
                return true;
            }
            if sim.now() >= deadline {
                return false;
            }
            let _ = sim.advance_by(poll_every);
        }
    }
}

fn with_address(opcode: u8, address: u32) -> Vec<u8> {
    let [_, a2, a1, a0] = address.to_be_bytes();
    vec![opcode, a2, a1, a0]
}
