//! # CRC-8 Tests
//!
//! Known vectors and the append-and-recheck property of the Dallas/Maxim CRC.

use periphsim_core::common::checksum::crc8_digest;
use periphsim_core::common::crc8;
use proptest::prelude::*;

#[test]
fn test_default_rom_payload_crc() {
    assert_eq!(crc8(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07]), 0x0F);
}

#[test]
fn test_ds18b20_datasheet_vector() {
    assert_eq!(crc8(&[0x28, 0xFF, 0x4C, 0x6D, 0x80, 0x16, 0x03]), 0x4B);
}

#[test]
fn test_incremental_update_matches_slice() {
    let data = [0xA5, 0x5A, 0x00, 0xFF];
    let mut digest = crc8_digest();
    for b in data {
        digest.update(&[b]);
    }
    assert_eq!(digest.finalize(), crc8(&data));
}

proptest! {
    #[test]
    fn prop_appending_crc_yields_zero(payload in proptest::collection::vec(any::<u8>(), 0..32)) {
        let mut framed = payload.clone();
        framed.push(crc8(&payload));
        prop_assert_eq!(crc8(&framed), 0);
    }
}
