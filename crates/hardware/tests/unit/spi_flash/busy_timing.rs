//! # Busy Timing Tests
//!
//! This module checks that WIP is set exactly from the completing S# edge to
//! `end_of_busy`, and that `update` is what clears it.

use periphsim_core::common::{ms, s, us};
use periphsim_core::soc::devices::spi_flash::opcodes::{BE, PP, RDSR, SE, WRSR};
use periphsim_core::soc::devices::spi_flash::{CommandPhase, ERASED, PowerMode};
use rstest::rstest;

use crate::common::harness::{FAST_TIMINGS, FlashBench, SMALL_FLASH};

#[test]
fn test_sector_erase_busy_window() {
    let mut bench = FlashBench::new();
    bench.program(0x1010, &[0x00; 16]);
    bench.master.write_enable(&mut bench.sim);
    let issued = bench.sim.now();
    bench.master.sector_erase(&mut bench.sim, 0x1010);
    let end = bench.device().end_of_busy();
    assert_eq!(end, issued + s(1));

    let _ = bench.sim.advance_to(end - 1);
    assert!(bench.master.read_status(&mut bench.sim).wip());
    let _ = bench.sim.advance_by(1);
    assert!(!bench.master.read_status(&mut bench.sim).wip());

    let sector = bench.device().array().sector(1).to_vec();
    assert!(sector.iter().all(|&b| b == ERASED));
    assert!(bench.violations().is_empty());
}

#[rstest]
#[case::page_program(PP, us(100))]
#[case::write_status(WRSR, us(200))]
#[case::sector_erase(SE, us(1_000))]
#[case::bulk_erase(BE, us(2_000))]
fn test_busy_time_per_instruction(#[case] opcode: u8, #[case] expected: u64) {
    let mut bench = FlashBench::with(SMALL_FLASH, FAST_TIMINGS, us(10));
    bench.master.write_enable(&mut bench.sim);
    let bytes = match opcode {
        PP => vec![PP, 0x00, 0x00, 0x00, 0x55],
        WRSR => vec![WRSR, 0x00],
        SE => vec![SE, 0x00, 0x00, 0x00],
        other => vec![other],
    };
    let issued = bench.sim.now();
    let _ = bench.master.command(&mut bench.sim, &bytes, 0);
    assert_eq!(bench.device().end_of_busy() - issued, expected);
    assert!(bench.device().status().wip());
    bench.wait_idle();
    assert_eq!(bench.sim.now(), issued + expected);
}

#[test]
fn test_wait_while_busy_polls_until_done() {
    let mut bench = FlashBench::new();
    bench.master.write_enable(&mut bench.sim);
    bench.master.page_program(&mut bench.sim, 0, &[0x01]);
    let end = bench.device().end_of_busy();
    assert!(bench.master.wait_while_busy(&mut bench.sim, us(100), ms(10)));
    assert!(bench.sim.now() >= end);
}

#[test]
fn test_wait_while_busy_times_out() {
    let mut bench = FlashBench::new();
    bench.master.write_enable(&mut bench.sim);
    bench.master.sector_erase(&mut bench.sim, 0);
    assert!(!bench.master.wait_while_busy(&mut bench.sim, us(100), ms(1)));
    assert!(bench.device().status().wip());
}

#[test]
fn test_wip_telemetry() {
    let mut bench = FlashBench::with(SMALL_FLASH, FAST_TIMINGS, us(10));
    bench.master.write_enable(&mut bench.sim);
    let issued = bench.sim.now();
    bench.master.sector_erase(&mut bench.sim, 0);
    bench.wait_idle();
    assert_eq!(
        bench.telemetry.signal_samples("wip"),
        vec![(issued, 1), (issued + us(1_000), 0)]
    );
}

#[test]
fn test_standby_after_busy_completes() {
    let mut bench = FlashBench::with(SMALL_FLASH, FAST_TIMINGS, us(10));
    bench.master.write_enable(&mut bench.sim);
    bench.master.sector_erase(&mut bench.sim, 0);
    assert_eq!(bench.device().power_mode(), PowerMode::Active);
    bench.wait_idle();
    assert_eq!(bench.device().power_mode(), PowerMode::Standby);
    assert_eq!(bench.device().command(), CommandPhase::Nop);
    assert_eq!(
        bench.telemetry.power_modes(),
        vec!["active", "standby", "active", "standby"]
    );
}

#[test]
fn test_status_polling_in_one_select_cycle() {
    let mut bench = FlashBench::with(SMALL_FLASH, FAST_TIMINGS, us(10));
    bench.master.write_enable(&mut bench.sim);
    bench.master.sector_erase(&mut bench.sim, 0);

    bench.master.select(&mut bench.sim);
    let _ = bench.master.transfer(&mut bench.sim, RDSR);
    assert_eq!(bench.master.transfer(&mut bench.sim, 0xFF) & 0x01, 0x01);
    let _ = bench.sim.advance_by(us(1_000));
    // completion while selected leaves the RDSR stream running
    assert_eq!(bench.master.transfer(&mut bench.sim, 0xFF) & 0x01, 0x00);
    assert!(matches!(
        bench.device().command(),
        CommandPhase::Streaming { opcode: RDSR, .. }
    ));
    assert_eq!(bench.device().power_mode(), PowerMode::Active);
    bench.master.deselect(&mut bench.sim);
    assert_eq!(bench.device().command(), CommandPhase::Nop);
    assert_eq!(bench.device().power_mode(), PowerMode::Standby);
    assert!(bench.violations().is_empty());
}
