//! 64-bit one-wire ROM identifier and ROM function commands.
//!
//! The ID is stored in transmission order: family code, six serial bytes
//! (least significant first), CRC. The persisted text form is the reverse,
//! most significant byte first: `crc:serial5:...:serial0:family`.

use std::fmt;
use std::str::FromStr;

use crate::common::{RomIdError, crc8};

/// Bytes in a ROM ID.
pub const ROM_LEN: usize = 8;

/// A one-wire ROM identifier in transmission order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RomId([u8; ROM_LEN]);

impl RomId {
    /// The built-in identifier, `0f:07:06:05:04:03:02:01`.
    pub const DEFAULT: Self = Self([0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x0F]);

    /// Builds an ID from family and serial, computing the CRC byte.
    ///
    /// # Arguments
    ///
    /// * `family` - Family code (0x01 for a DS2401).
    /// * `serial` - Serial number, least significant byte first.
    pub fn from_parts(family: u8, serial: [u8; 6]) -> Self {
        let mut bytes = [0u8; ROM_LEN];
        bytes[0] = family;
        bytes[1..7].copy_from_slice(&serial);
        bytes[7] = crc8(&bytes[..7]);
        Self(bytes)
    }

    /// Wraps raw bytes in transmission order without checking the CRC.
    pub const fn from_bytes(bytes: [u8; ROM_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns the bytes in transmission order.
    pub const fn bytes(&self) -> &[u8; ROM_LEN] {
        &self.0
    }

    /// Returns the byte streamed at position `index` (0 = family, 7 = CRC).
    #[inline]
    pub const fn byte(&self, index: usize) -> u8 {
        self.0[index]
    }

    /// Family code.
    pub const fn family(&self) -> u8 {
        self.0[0]
    }

    /// Serial bytes, least significant first.
    pub fn serial(&self) -> [u8; 6] {
        let mut serial = [0u8; 6];
        serial.copy_from_slice(&self.0[1..7]);
        serial
    }

    /// Stored CRC byte.
    pub const fn crc(&self) -> u8 {
        self.0[7]
    }

    /// CRC computed over family and serial.
    pub fn computed_crc(&self) -> u8 {
        crc8(&self.0[..7])
    }

    /// Returns `true` if the stored CRC matches the payload.
    pub fn crc_valid(&self) -> bool {
        self.crc() == self.computed_crc()
    }
}

impl Default for RomId {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl FromStr for RomId {
    type Err = RomIdError;

    /// Parses `crc:serial5:serial4:serial3:serial2:serial1:serial0:family`.
    ///
    /// The CRC is taken as given; check [`RomId::crc_valid`] afterwards.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let groups: Vec<&str> = s.trim().split(':').collect();
        if groups.len() != ROM_LEN {
            return Err(RomIdError::GroupCount(groups.len()));
        }
        let mut bytes = [0u8; ROM_LEN];
        for (index, group) in groups.iter().enumerate() {
            let valid = group.len() == 2 && group.bytes().all(|b| b.is_ascii_hexdigit());
            let byte = if valid {
                u8::from_str_radix(group, 16).ok()
            } else {
                None
            };
            let Some(byte) = byte else {
                return Err(RomIdError::BadGroup {
                    index,
                    group: (*group).to_owned(),
                });
            };
            bytes[ROM_LEN - 1 - index] = byte;
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for RomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().rev().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// ROM function command byte.
pub mod opcodes {
    /// Read the 64-bit ROM ID.
    pub const READ_ROM: u8 = 0x33;
    /// Legacy READ_ROM code still accepted by the DS2401.
    pub const READ_ROM_LEGACY: u8 = 0x0F;
    /// Address one device by its full ROM ID.
    pub const MATCH_ROM: u8 = 0x55;
    /// Address the only device on the bus.
    pub const SKIP_ROM: u8 = 0xCC;
    /// Enumerate devices by ROM ID bits.
    pub const SEARCH_ROM: u8 = 0xF0;
    /// Enumerate devices in alarm state.
    pub const CONDITIONAL_SEARCH: u8 = 0xEC;
    /// Skip ROM and switch to overdrive speed.
    pub const OVERDRIVE_SKIP_ROM: u8 = 0x3C;
    /// Match ROM and switch to overdrive speed.
    pub const OVERDRIVE_MATCH_ROM: u8 = 0x69;
}

/// A decoded ROM function command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RomCommand {
    /// READ_ROM (0x33 or legacy 0x0F).
    ReadRom,
    /// MATCH_ROM.
    MatchRom,
    /// SKIP_ROM.
    SkipRom,
    /// SEARCH_ROM (recognized, unsupported).
    SearchRom,
    /// Conditional search (recognized, unsupported).
    ConditionalSearch,
    /// Overdrive skip ROM (recognized, unsupported).
    OverdriveSkipRom,
    /// Overdrive match ROM (recognized, unsupported).
    OverdriveMatchRom,
    /// Anything else.
    Unknown(u8),
}

impl RomCommand {
    /// Decodes an opcode byte.
    pub const fn decode(byte: u8) -> Self {
        match byte {
            opcodes::READ_ROM | opcodes::READ_ROM_LEGACY => Self::ReadRom,
            opcodes::MATCH_ROM => Self::MatchRom,
            opcodes::SKIP_ROM => Self::SkipRom,
            opcodes::SEARCH_ROM => Self::SearchRom,
            opcodes::CONDITIONAL_SEARCH => Self::ConditionalSearch,
            opcodes::OVERDRIVE_SKIP_ROM => Self::OverdriveSkipRom,
            opcodes::OVERDRIVE_MATCH_ROM => Self::OverdriveMatchRom,
            other => Self::Unknown(other),
        }
    }

    /// Mnemonic for logs.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::ReadRom => "READ_ROM",
            Self::MatchRom => "MATCH_ROM",
            Self::SkipRom => "SKIP_ROM",
            Self::SearchRom => "SEARCH_ROM",
            Self::ConditionalSearch => "CONDITIONAL_SEARCH",
            Self::OverdriveSkipRom => "OVERDRIVE_SKIP_ROM",
            Self::OverdriveMatchRom => "OVERDRIVE_MATCH_ROM",
            Self::Unknown(_) => "UNKNOWN",
        }
    }
}
