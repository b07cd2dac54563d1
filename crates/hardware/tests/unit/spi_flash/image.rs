//! # Image Tests
//!
//! This module checks loading an array image at construction and dumping it
//! on power-down.

use std::fs;

use periphsim_core::common::{ImageError, us};
use periphsim_core::soc::devices::spi_flash::{ERASED, SpiFlash};
use periphsim_core::soc::telemetry::RecordingTelemetry;
use periphsim_core::{Device, Simulator};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

use crate::common::harness::{FAST_TIMINGS, FlashBench, SMALL_FLASH};

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 251) as u8).collect()
}

fn bench_with(build: impl FnOnce(SpiFlash) -> SpiFlash) -> FlashBench {
    let sim = Simulator::new(us(10));
    let telemetry = RecordingTelemetry::new();
    let flash = SpiFlash::new("flash0", sim.clock_handle(), SMALL_FLASH)
        .with_timings(FAST_TIMINGS)
        .with_telemetry(telemetry.clone());
    FlashBench::attach(sim, build(flash), telemetry)
}

#[test]
fn test_image_is_loaded_at_construction() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("flash.bin");
    let image = pattern(SMALL_FLASH.size());
    fs::write(&path, &image).expect("write image");

    let mut bench = bench_with(|flash| flash.with_load_image(&path));
    assert_eq!(bench.device().array().raw(), image.as_slice());
    assert_eq!(bench.read(0x1234, 4), image[0x1234..0x1238].to_vec());
}

#[test]
fn test_wrong_size_image_leaves_array_erased() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("short.bin");
    fs::write(&path, pattern(100)).expect("write image");

    let mut bench = bench_with(|flash| flash.with_load_image(&path));
    assert!(bench.device().array().raw().iter().all(|&b| b == ERASED));

    let err = bench.device_mut().load_image(&path).unwrap_err();
    assert!(matches!(
        err,
        ImageError::SizeMismatch {
            expected: 16_384,
            actual: 100,
            ..
        }
    ));
}

#[test]
fn test_missing_image_is_an_io_error() {
    let dir = tempdir().expect("tempdir");
    let mut bench = bench_with(|flash| flash);
    bench.program(0, &[0x00]);
    let err = bench
        .device_mut()
        .load_image(&dir.path().join("absent.bin"))
        .unwrap_err();
    assert!(matches!(err, ImageError::Io { .. }));
    assert_eq!(bench.device().array().read(0), ERASED);
}

#[test]
fn test_power_down_dumps_the_array() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("dump.bin");
    let mut bench = bench_with(|flash| flash.with_dump_image(&path));
    bench.program(0x0800, &[0x12, 0x34, 0x56]);
    bench.device_mut().power_down();

    let dumped = fs::read(&path).expect("dump written");
    assert_eq!(dumped.len(), SMALL_FLASH.size());
    assert_eq!(&dumped[0x0800..0x0803], &[0x12, 0x34, 0x56]);
    assert!(dumped[..0x0800].iter().all(|&b| b == ERASED));
}

#[test]
fn test_dump_then_reload() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("cycle.bin");
    let mut first = bench_with(|flash| flash.with_dump_image(&path));
    first.program(0x3000, &[0xC0, 0xFF, 0xEE]);
    first.device_mut().power_down();

    let mut second = bench_with(|flash| flash.with_load_image(&path));
    assert_eq!(second.read(0x3000, 3), vec![0xC0, 0xFF, 0xEE]);
}

#[test]
fn test_dump_without_path_is_a_no_op() {
    let bench = bench_with(|flash| flash);
    assert!(bench.device().dump_image().is_ok());
}
