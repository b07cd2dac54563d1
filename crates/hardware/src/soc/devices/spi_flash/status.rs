//! Status register.

/// Write In Progress.
pub const WIP: u8 = 0x01;
/// Write Enable Latch.
pub const WEL: u8 = 0x02;
/// Block Protect bits BP2..BP0.
pub const BP_MASK: u8 = 0x1C;
/// Status Register Write Disable.
pub const SRWD: u8 = 0x80;
/// Bits WRSR may change.
pub const WRITABLE: u8 = SRWD | BP_MASK;

const BP_SHIFT: u8 = 2;

/// The flash status register.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatusRegister(u8);

impl StatusRegister {
    /// Wraps a raw register value.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Raw register value.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Write In Progress.
    pub const fn wip(self) -> bool {
        self.0 & WIP != 0
    }

    /// Write Enable Latch.
    pub const fn wel(self) -> bool {
        self.0 & WEL != 0
    }

    /// Status Register Write Disable.
    pub const fn srwd(self) -> bool {
        self.0 & SRWD != 0
    }

    /// BP2..BP0 as a number.
    pub const fn block_protect(self) -> u8 {
        (self.0 & BP_MASK) >> BP_SHIFT
    }

    /// Sets or clears WIP.
    pub const fn set_wip(&mut self, on: bool) {
        self.set(WIP, on);
    }

    /// Sets or clears WEL.
    pub const fn set_wel(&mut self, on: bool) {
        self.set(WEL, on);
    }

    /// Applies a WRSR data byte; only SRWD and BP2..BP0 change.
    pub const fn write(&mut self, value: u8) {
        self.0 = (self.0 & !WRITABLE) | (value & WRITABLE);
    }

    /// Number of top sectors reserved by the block-protect bits.
    ///
    /// BP = 0 protects nothing; each step doubles the protected area, saturating
    /// at the whole array.
    pub fn protected_sectors(self, sectors: usize) -> usize {
        match self.block_protect() {
            0 => 0,
            bp => sectors.min(1 << (bp - 1)),
        }
    }

    const fn set(&mut self, bit: u8, on: bool) {
        if on {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
    }
}
