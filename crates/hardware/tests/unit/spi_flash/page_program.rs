//! # Page Program Tests
//!
//! This module covers the AND-only semantics of programming and the in-page
//! address wrap.

use periphsim_core::common::us;
use periphsim_core::soc::devices::spi_flash::ERASED;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use crate::common::harness::{FAST_TIMINGS, FlashBench, SMALL_FLASH};

fn fast_bench() -> FlashBench {
    FlashBench::with(SMALL_FLASH, FAST_TIMINGS, us(10))
}

#[test]
fn test_program_only_clears_bits() {
    let mut bench = fast_bench();
    bench.program(0x100, &[0xF0]);
    bench.program(0x100, &[0x0F]);
    assert_eq!(bench.read(0x100, 1), vec![0x00]);
}

#[test]
fn test_program_wraps_within_page() {
    let mut bench = fast_bench();
    bench.program(0x1FE, &[0x01, 0x02, 0x03, 0x04]);
    assert_eq!(bench.read(0x1FE, 2), vec![0x01, 0x02]);
    assert_eq!(bench.read(0x100, 2), vec![0x03, 0x04]);
    assert_eq!(bench.read(0x200, 1), vec![ERASED]);
}

#[test]
fn test_program_longer_than_page_folds_over() {
    let mut bench = fast_bench();
    let mut data = vec![0xFF; 257];
    data[0] = 0xF0;
    data[256] = 0x0F;
    bench.program(0x300, &data);
    assert_eq!(bench.read(0x300, 2), vec![0x00, 0xFF]);
    assert_eq!(bench.read(0x400, 1), vec![ERASED]);
}

#[test]
fn test_erase_restores_programmed_bytes() {
    let mut bench = fast_bench();
    bench.program(0x2000, &[0x00; 8]);
    bench.master.write_enable(&mut bench.sim);
    bench.master.sector_erase(&mut bench.sim, 0x2FFF);
    bench.wait_idle();
    assert_eq!(bench.read(0x2000, 8), vec![ERASED; 8]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_program_is_bitwise_and(
        old in any::<u8>(),
        new in any::<u8>(),
        offset in 0u32..0x4000,
    ) {
        let mut bench = fast_bench();
        bench.device_mut().array_mut().raw_mut()[offset as usize] = old;
        bench.program(offset, &[new]);
        prop_assert_eq!(bench.device().array().read(offset), old & new);
    }
}
