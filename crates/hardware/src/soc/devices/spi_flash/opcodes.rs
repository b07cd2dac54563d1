//! M25P-class SPI flash instruction set.

/// Write Enable; sets WEL.
pub const WREN: u8 = 0x06;
/// Write Disable; clears WEL.
pub const WRDI: u8 = 0x04;
/// Read Status Register.
pub const RDSR: u8 = 0x05;
/// Write Status Register.
pub const WRSR: u8 = 0x01;
/// Read Data Bytes.
pub const READ: u8 = 0x03;
/// Read Data Bytes at higher speed (one dummy byte).
pub const FAST_READ: u8 = 0x0B;
/// Page Program.
pub const PP: u8 = 0x02;
/// Sector Erase.
pub const SE: u8 = 0xD8;
/// Bulk Erase.
pub const BE: u8 = 0xC7;
/// Deep Power-down.
pub const DP: u8 = 0xB9;
/// Release from Deep Power-down and Read Electronic Signature.
pub const RES: u8 = 0xAB;

/// Electronic signature of the M25P80.
pub const M25P80_SIGNATURE: u8 = 0x13;

/// Argument bytes `opcode` expects before data streams, or `None` if unknown.
///
/// Addresses are three bytes, big-endian. FAST_READ adds a dummy byte and RES
/// takes three dummy bytes.
pub const fn argument_bytes(opcode: u8) -> Option<u8> {
    match opcode {
        WREN | WRDI | RDSR | BE | DP => Some(0),
        WRSR => Some(1),
        READ | PP | SE | RES => Some(3),
        FAST_READ => Some(4),
        _ => None,
    }
}

/// Mnemonic for logs and violation reports.
pub const fn mnemonic(opcode: u8) -> &'static str {
    match opcode {
        WREN => "WREN",
        WRDI => "WRDI",
        RDSR => "RDSR",
        WRSR => "WRSR",
        READ => "READ",
        FAST_READ => "FAST_READ",
        PP => "PP",
        SE => "SE",
        BE => "BE",
        DP => "DP",
        RES => "RES",
        _ => "UNKNOWN",
    }
}
