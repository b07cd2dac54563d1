//! # Platform Tests
//!
//! This module checks the device arena: construction from configuration,
//! handle and name lookup, typed access, and broadcast calls.

use periphsim_core::common::{PinWord, Violation, VirtualClock};
use periphsim_core::config::Config;
use periphsim_core::soc::devices::onewire::RomId;
use periphsim_core::soc::devices::spi_flash::{Geometry, PowerMode, SpiFlash};
use periphsim_core::soc::devices::OneWireDevice;
use periphsim_core::{DeviceHandle, Platform};
use pretty_assertions::assert_eq;

const BOARD: &str = r#"{
    "devices": [
        { "type": "one_wire", "name": "serial", "rom_id": "8f:f6:e5:d4:c3:b2:a1:01" },
        { "type": "spi_flash", "name": "boot", "sectors": 2, "sector_size": 4096 },
        { "type": "one_wire", "name": "broken", "rom_id": "zz" }
    ]
}"#;

fn board() -> (VirtualClock, Platform) {
    let clock = VirtualClock::new();
    let config = Config::from_json_str(BOARD).expect("valid board");
    let platform = Platform::from_config(&config, &clock).expect("platform");
    (clock, platform)
}

#[test]
fn test_from_config_builds_in_order() {
    let (_clock, platform) = board();
    assert_eq!(platform.len(), 3);
    let names: Vec<&str> = platform
        .handles()
        .filter_map(|h| platform.get(h).map(|d| d.name()))
        .collect();
    assert_eq!(names, vec!["serial", "boot", "broken"]);
}

#[test]
fn test_typed_access() {
    let (_clock, platform) = board();
    let serial = platform.handle_by_name("serial").expect("serial");
    let boot = platform.handle_by_name("boot").expect("boot");
    assert_eq!(serial.index(), 0);
    assert_eq!(boot.to_string(), "#1");

    let rom = platform.one_wire(serial).expect("one-wire").rom_id();
    assert_eq!(rom.to_string(), "8f:f6:e5:d4:c3:b2:a1:01");
    assert!(platform.spi_flash(serial).is_none());

    let flash = platform.spi_flash(boot).expect("flash");
    assert_eq!(flash.array().geometry().size(), 8192);
    assert!(platform.one_wire(boot).is_none());
    assert!(platform.handle_by_name("missing").is_none());
}

#[test]
fn test_bad_rom_id_falls_back_to_default() {
    let (_clock, mut platform) = board();
    let broken = platform.handle_by_name("broken").expect("broken");
    assert_eq!(platform.one_wire(broken).map(OneWireDevice::rom_id), Some(RomId::DEFAULT));
    assert!(platform.drain_violations().is_empty());
}

#[test]
fn test_unknown_handle_reads_unknown() {
    let mut platform = Platform::new();
    assert!(platform.is_empty());
    let stray = {
        let clock = VirtualClock::new();
        let mut other = Platform::new();
        let _ = other.add(Box::new(SpiFlash::new("x", clock.handle(), Geometry::M25P80)));
        other.handles().next().expect("one handle")
    };
    assert_eq!(platform.read(stray), PinWord::UNKNOWN);
    platform.write(stray, PinWord::new(1, 0));
}

#[test]
fn test_broadcast_power_and_reset() {
    let (_clock, mut platform) = board();
    platform.power_down_all();
    let handles: Vec<DeviceHandle> = platform.handles().collect();
    assert!(handles.iter().all(|&h| platform.read(h) == PinWord::UNKNOWN));

    platform.power_up_all();
    let boot = platform.handle_by_name("boot").expect("boot");
    assert_eq!(
        platform.spi_flash(boot).map(SpiFlash::power_mode),
        Some(PowerMode::Standby)
    );
    let serial = platform.handle_by_name("serial").expect("serial");
    assert_eq!(platform.read(serial), PinWord::new(1, 1));

    platform.reset_all();
    platform.update_all();
    assert!(platform.drain_violations().is_empty());
}

#[test]
fn test_drain_violations_tags_devices() {
    let clock = VirtualClock::new();
    let mut platform = Platform::new();
    let good = platform.add(Box::new(OneWireDevice::new("good", clock.handle(), RomId::DEFAULT)));
    let bad = platform.add(Box::new(OneWireDevice::new(
        "bad",
        clock.handle(),
        RomId::from_bytes([0, 0, 0, 0, 0, 0, 0, 0xAA]),
    )));
    let drained = platform.drain_violations();
    assert_eq!(drained.len(), 1);
    assert_eq!(drained[0].0, bad);
    assert_ne!(drained[0].0, good);
    assert!(matches!(drained[0].1.violation, Violation::RomCrc { stored: 0xAA, .. }));
    assert!(platform.drain_violations().is_empty());
}
