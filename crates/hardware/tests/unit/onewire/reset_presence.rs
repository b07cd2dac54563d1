//! # Reset and Presence Tests
//!
//! This module checks the reset-pulse windows and the shape of the presence
//! pulse, including recovery from arbitrary prior bus activity.

use periphsim_core::common::{Violation, us};
use periphsim_core::soc::devices::onewire::{Phase, ResetState};
use periphsim_core::soc::devices::onewire::timing::{PRESENCE_HIGH, PRESENCE_LOW, PRESENCE_SAMPLE_MIN};
use proptest::prelude::*;
use rstest::rstest;

use crate::common::harness::OneWireBench;

#[test]
fn test_presence_pulse_shape() {
    let mut bench = OneWireBench::new();
    let report = bench.master.reset(&mut bench.sim);
    assert!(report.present);
    assert!(report.wait_ns >= PRESENCE_SAMPLE_MIN);
    assert!(PRESENCE_HIGH.contains(report.wait_ns));
    assert!(PRESENCE_LOW.contains(report.low_ns));
    assert!(matches!(bench.device().phase(), Phase::ReadCommand(_)));
    assert!(bench.violations().is_empty());
}

#[test]
fn test_presence_is_reported_to_telemetry() {
    let mut bench = OneWireBench::new();
    bench.reset();
    let samples = bench.telemetry.signal_samples("dq");
    assert_eq!(samples.len(), 2);
    assert_eq!(samples[0].1, 0);
    assert_eq!(samples[1].1, 1);
    assert_eq!(samples[1].0 - samples[0].0, us(120));
}

#[rstest]
#[case(480, true)]
#[case(520, true)]
#[case(640, true)]
#[case(300, false)]
#[case(479, false)]
fn test_reset_window(#[case] low_us: u64, #[case] presence: bool) {
    let mut bench = OneWireBench::new();
    bench.hold(false, us(low_us));
    bench.drive(true);
    let mut saw_low = false;
    for _ in 0..300 {
        let _ = bench.sim.step();
        saw_low |= !bench.line();
    }
    assert_eq!(saw_low, presence);
    assert!(bench.violations().is_empty());
}

#[test]
fn test_overlong_reset_is_a_violation() {
    let mut bench = OneWireBench::new();
    bench.hold(false, us(700));
    bench.drive(true);
    let _ = bench.sim.advance_by(us(300));
    assert_eq!(bench.device().reset_state(), Some(ResetState::Wait));
    let violations = bench.violations();
    assert!(violations.iter().any(|r| matches!(
        r.violation,
        Violation::Timing { state: "RESET_PULSE", .. }
    )));
}

#[test]
fn test_master_driving_during_presence_aborts() {
    let mut bench = OneWireBench::new();
    bench.hold(false, us(500));
    bench.hold(true, us(30));
    // device is driving presence now
    bench.drive(false);
    let violations = bench.violations();
    assert_eq!(violations.len(), 1);
    assert!(matches!(
        bench.device().reset_state(),
        Some(ResetState::ResetPulse { .. })
    ));
    // the aborting low counts as the start of a new reset
    let _ = bench.sim.advance_by(us(500));
    bench.drive(true);
    let _ = bench.sim.advance_by(us(20));
    assert!(!bench.line());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_reset_recovers_from_any_history(
        history in proptest::collection::vec((any::<bool>(), 1u64..800), 0..12)
    ) {
        let mut bench = OneWireBench::new();
        for (high, duration_us) in history {
            bench.hold(high, us(duration_us));
        }
        bench.drive(true);
        let report = bench.master.reset(&mut bench.sim);
        prop_assert!(report.present);
        prop_assert!(report.wait_ns >= PRESENCE_SAMPLE_MIN);
        prop_assert!(PRESENCE_LOW.contains(report.low_ns));
        prop_assert!(matches!(bench.device().phase(), Phase::ReadCommand(_)));
    }
}

#[test]
fn test_repeated_low_write_keeps_reset_timer() {
    let mut bench = OneWireBench::new();
    bench.hold(false, us(300));
    bench.hold(false, us(200));
    bench.hold(true, us(300));
    assert!(matches!(bench.device().phase(), Phase::ReadCommand(_)));
    assert!(bench.violations().is_empty());
}
