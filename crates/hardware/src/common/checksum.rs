//! Dallas/Maxim CRC-8.
//!
//! Polynomial x⁸ + x⁵ + x⁴ + 1, processed LSB-first, initial value zero. This
//! is the checksum stored in the last byte of a one-wire ROM ID.

use crc::{CRC_8_MAXIM_DOW, Crc, Digest};

/// CRC-8/MAXIM-DOW engine.
pub const DOW_CRC: Crc<u8> = Crc::<u8>::new(&CRC_8_MAXIM_DOW);

/// Computes the CRC-8 of `data`.
///
/// Appending the result to `data` and running the CRC again yields zero.
pub fn crc8(data: &[u8]) -> u8 {
    DOW_CRC.checksum(data)
}

/// Running CRC for data that arrives a byte at a time.
pub fn crc8_digest() -> Digest<'static, u8> {
    DOW_CRC.digest()
}
