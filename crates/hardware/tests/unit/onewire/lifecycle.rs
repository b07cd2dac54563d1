//! # Lifecycle Tests
//!
//! This module covers the idle watchdog, MCU reset, power cycling, and the
//! output-pending flag.

use periphsim_core::Device;
use periphsim_core::common::{PinWord, Violation, us};
use periphsim_core::soc::devices::onewire::rom::opcodes;
use periphsim_core::soc::devices::onewire::{Phase, ResetState, RomId};

use crate::common::harness::OneWireBench;

#[test]
fn test_idle_read_command_times_out_quietly() {
    let mut bench = OneWireBench::new();
    bench.reset();
    let _ = bench.sim.advance_by(us(700));
    assert_eq!(bench.device().reset_state(), Some(ResetState::Wait));
    assert!(bench.violations().is_empty());
}

#[test]
fn test_stuck_low_mid_slot_is_a_violation() {
    let mut bench = OneWireBench::new();
    bench.reset();
    bench.write_byte(opcodes::READ_ROM);
    // open a read slot and never release it
    bench.hold(false, us(700));
    let violations = bench.violations();
    assert_eq!(violations.len(), 1);
    assert!(matches!(
        violations[0].violation,
        Violation::Timing { state: "WAITING_HIGH", .. }
    ));
    assert_eq!(bench.device().reset_state(), Some(ResetState::Wait));
}

#[test]
fn test_watchdog_leaves_idle_wait_alone() {
    let mut bench = OneWireBench::new();
    let _ = bench.sim.advance_by(us(5_000));
    assert_eq!(bench.device().reset_state(), Some(ResetState::Wait));
    assert!(bench.violations().is_empty());
}

#[test]
fn test_mcu_reset_abandons_stream() {
    let mut bench = OneWireBench::new();
    bench.reset();
    bench.write_byte(opcodes::READ_ROM);
    let _ = bench.read_byte();
    bench.sim.reset();
    assert_eq!(bench.device().reset_state(), Some(ResetState::Wait));
    assert_eq!(bench.device().last_command(), None);
    assert_eq!(bench.master.read_rom(&mut bench.sim), Some(*RomId::DEFAULT.bytes()));
}

#[test]
fn test_power_cycle() {
    let mut bench = OneWireBench::new();
    bench.reset();
    bench.device_mut().power_down();
    assert!(!bench.device().is_powered());
    assert_eq!(bench.sim.read(bench.handle), PinWord::UNKNOWN);

    // edges while unpowered are ignored
    bench.hold(false, us(500));
    bench.hold(true, us(50));
    assert!(bench.violations().is_empty());

    bench.device_mut().power_up();
    assert!(bench.device().is_powered());
    assert_eq!(bench.device().reset_state(), Some(ResetState::Wait));
    bench.reset();
    assert!(matches!(bench.device().phase(), Phase::ReadCommand(_)));
    assert_eq!(bench.telemetry.power_modes(), vec!["off", "on"]);
}

#[test]
fn test_output_pending_tracks_line_changes() {
    let mut bench = OneWireBench::new();
    bench.hold(false, us(500));
    bench.hold(true, us(20));
    assert!(bench.device().output_pending());
    assert!(!bench.line());
    assert!(!bench.device().output_pending());
}

#[test]
fn test_replacing_rom_id_checks_crc() {
    let mut bench = OneWireBench::new();
    bench.device_mut().set_rom_id(RomId::from_bytes([0x01; 8]));
    let violations = bench.violations();
    assert!(matches!(violations[0].violation, Violation::RomCrc { stored: 0x01, .. }));
}

#[test]
fn test_write_without_dq_in_mask_is_ignored() {
    let mut bench = OneWireBench::new();
    // other bits low, DQ unknown: no reset pulse
    bench.sim.write(bench.handle, PinWord::new(0b1110, 0));
    let _ = bench.sim.advance_by(us(500));
    bench.sim.write(bench.handle, PinWord::new(0, 0));
    let _ = bench.sim.advance_by(us(100));
    assert_eq!(bench.device().reset_state(), Some(ResetState::Wait));
    assert!(!bench.device().drives_low());

    bench.reset();
    bench.write_byte(opcodes::READ_ROM);
    // unknown DQ mid-stream must not open a read slot
    bench.sim.write(bench.handle, PinWord::new(0, 0));
    assert_eq!(bench.read_byte(), RomId::DEFAULT.family());
    assert!(bench.violations().is_empty());
}
