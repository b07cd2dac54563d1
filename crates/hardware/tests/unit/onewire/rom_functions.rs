//! # ROM Function Tests
//!
//! This module covers addressing (MATCH_ROM, SKIP_ROM) and the recognized but
//! unsupported ROM commands.

use periphsim_core::common::Violation;
use periphsim_core::soc::devices::onewire::rom::opcodes;
use periphsim_core::soc::devices::onewire::{Function, Phase, ResetState, RomCommand, RomId, Speed};
use rstest::rstest;

use crate::common::harness::OneWireBench;

fn custom_rom() -> RomId {
    RomId::from_parts(0x01, [0x10, 0x20, 0x30, 0x40, 0x50, 0x60])
}

#[test]
fn test_match_rom_selects() {
    let rom = custom_rom();
    let mut bench = OneWireBench::with_rom(rom);
    assert!(bench.master.match_rom(&mut bench.sim, &rom));
    assert_eq!(bench.device().phase(), &Phase::Device(Function::Selected));
    assert_eq!(bench.device().last_command(), Some(RomCommand::MatchRom));
    assert!(bench.violations().is_empty());
}

#[rstest]
#[case::family(0)]
#[case::serial(3)]
#[case::crc(7)]
fn test_match_rom_mismatch_deselects(#[case] wrong: usize) {
    let rom = custom_rom();
    let mut other = *rom.bytes();
    other[wrong] ^= 0x80;
    let mut bench = OneWireBench::with_rom(rom);
    assert!(bench.master.match_rom(&mut bench.sim, &RomId::from_bytes(other)));
    assert_eq!(bench.device().reset_state(), Some(ResetState::Wait));
    assert!(bench.violations().is_empty());
}

#[test]
fn test_skip_rom_selects() {
    let mut bench = OneWireBench::new();
    bench.reset();
    bench.write_byte(opcodes::SKIP_ROM);
    assert_eq!(bench.device().phase(), &Phase::Device(Function::Selected));
}

#[test]
fn test_selected_device_answers_next_reset() {
    let mut bench = OneWireBench::new();
    bench.reset();
    bench.write_byte(opcodes::SKIP_ROM);
    // selected devices ignore slots until the next reset
    bench.write_byte(0x00);
    assert_eq!(bench.device().phase(), &Phase::Device(Function::Selected));
    let rom = bench.master.read_rom(&mut bench.sim);
    assert_eq!(rom, Some(*RomId::DEFAULT.bytes()));
}

#[rstest]
#[case::search(opcodes::SEARCH_ROM, "SEARCH_ROM")]
#[case::conditional(opcodes::CONDITIONAL_SEARCH, "CONDITIONAL_SEARCH")]
#[case::overdrive_skip(opcodes::OVERDRIVE_SKIP_ROM, "OVERDRIVE_SKIP_ROM")]
#[case::overdrive_match(opcodes::OVERDRIVE_MATCH_ROM, "OVERDRIVE_MATCH_ROM")]
#[case::unknown(0xA5, "UNKNOWN")]
fn test_unsupported_commands_abort(#[case] opcode: u8, #[case] name: &'static str) {
    let mut bench = OneWireBench::new();
    bench.reset();
    bench.write_byte(opcode);
    let violations = bench.violations();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].violation, Violation::Unsupported { opcode, name });
    assert_eq!(bench.device().reset_state(), Some(ResetState::Wait));
    assert_eq!(bench.device().speed(), Speed::Standard);
}
