//! # Bit Slot Tests
//!
//! This module drives hand-shaped write slots at the device and checks how the
//! low time is classified, including malformed and overlapping slots.

use periphsim_core::common::{Violation, us};
use periphsim_core::soc::devices::onewire::rom::opcodes;
use periphsim_core::soc::devices::onewire::{Phase, ResetState, RomCommand, RomId};
use proptest::prelude::*;
use rstest::rstest;

use crate::common::harness::OneWireBench;

/// Sends one write slot with an explicit low time; the slot is padded to 70 µs.
fn slot(bench: &mut OneWireBench, low_us: u64) {
    bench.hold(false, us(low_us));
    bench.hold(true, us(70u64.saturating_sub(low_us).max(10)));
}

/// Sends `byte` LSB first with the given low times for 1 and 0 bits.
fn send(bench: &mut OneWireBench, byte: u8, one_us: u64, zero_us: u64) {
    for i in 0..8 {
        let low = if (byte >> i) & 1 == 1 { one_us } else { zero_us };
        slot(bench, low);
    }
}

#[rstest]
#[case::write1_min(5, 64)]
#[case::write1_mid(10, 64)]
#[case::write1_max(15, 64)]
#[case::write0_min(6, 60)]
#[case::write0_mid(6, 90)]
#[case::write0_max(6, 120)]
fn test_low_time_windows(#[case] one_us: u64, #[case] zero_us: u64) {
    let mut bench = OneWireBench::new();
    bench.reset();
    send(&mut bench, opcodes::READ_ROM, one_us, zero_us);
    assert_eq!(bench.device().last_command(), Some(RomCommand::ReadRom));
    assert!(bench.violations().is_empty());
}

#[rstest]
#[case(30)]
#[case(45)]
#[case(200)]
fn test_low_time_outside_every_window(#[case] low_us: u64) {
    let mut bench = OneWireBench::new();
    bench.reset();
    slot(&mut bench, low_us);
    let violations = bench.violations();
    assert_eq!(violations.len(), 1);
    assert!(matches!(
        violations[0].violation,
        Violation::Timing { state: "WAITING_HIGH", .. }
    ));
    assert_eq!(bench.device().reset_state(), Some(ResetState::Wait));
    assert_eq!(bench.device().last_command(), None);
}

#[test]
fn test_next_slot_before_previous_ends() {
    let mut bench = OneWireBench::new();
    bench.reset();
    bench.hold(false, us(6));
    bench.hold(true, us(10));
    bench.drive(false);
    let violations = bench.violations();
    assert_eq!(violations.len(), 1);
    assert!(matches!(
        violations[0].violation,
        Violation::Timing { state: "WRITE_ENDSLOT", .. }
    ));
    // the early edge may be the start of a reset
    assert!(matches!(
        bench.device().reset_state(),
        Some(ResetState::ResetPulse { .. })
    ));
}

#[test]
fn test_slot_violation_then_reset_recovers() {
    let mut bench = OneWireBench::new();
    bench.reset();
    slot(&mut bench, 40);
    assert_eq!(bench.violations().len(), 1);
    let rom = bench.master.read_rom(&mut bench.sim);
    assert_eq!(rom, Some(*RomId::DEFAULT.bytes()));
    assert!(bench.violations().is_empty());
}

#[test]
fn test_reset_length_low_inside_command() {
    let mut bench = OneWireBench::new();
    bench.reset();
    for low in [6, 64, 6] {
        slot(&mut bench, low);
    }
    bench.reset();
    assert!(matches!(bench.device().phase(), Phase::ReadCommand(_)));
    assert!(bench.violations().is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_command_byte_decodes(opcode in any::<u8>()) {
        let mut bench = OneWireBench::new();
        bench.reset();
        bench.write_byte(opcode);
        prop_assert_eq!(bench.device().last_command(), Some(RomCommand::decode(opcode)));
    }
}
