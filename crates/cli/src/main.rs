//! Peripheral simulator CLI.
//!
//! This binary drives the simulated peripherals from the command line. It performs:
//! 1. **ROM read:** Reset and READ_ROM against a one-wire device; prints the streamed ID.
//! 2. **Flash access:** Erase, program, and read a range of an SPI flash, with optional images.
//! 3. **Config run:** Load a JSON board description, run it for a while, print the inventory.
//!
//! Logging goes through `tracing`; set `RUST_LOG` (e.g. `RUST_LOG=periphsim_core=debug`).
//! Bus waveforms are traced under `periphsim::telemetry` at `trace` level.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use periphsim_core::common::{PinWord, ViolationRecord, us};
use periphsim_core::config::Config;
use periphsim_core::sim::{OneWireMaster, SpiMaster};
use periphsim_core::soc::devices::onewire::RomId;
use periphsim_core::soc::devices::spi_flash::{Geometry, SpiFlash};
use periphsim_core::soc::devices::{Device, OneWireDevice};
use periphsim_core::soc::telemetry::TracingTelemetry;
use periphsim_core::{DeviceHandle, Simulator};

#[derive(Parser, Debug)]
#[command(
    name = "periphsim",
    author,
    version,
    about = "Nanosecond-resolution peripheral simulator",
    long_about = "Drive one-wire and SPI flash models through real bus waveforms.\n\nExamples:\n  periphsim rom --id 0f:07:06:05:04:03:02:01\n  periphsim flash --address 0x1000 --erase --program deadbeef --read 8\n  periphsim run board.json --for-us 2000"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reset a one-wire device and read its ROM ID.
    Rom {
        /// ROM ID in `crc:serial5:...:serial0:family` form.
        #[arg(long, default_value = "0f:07:06:05:04:03:02:01")]
        id: String,

        /// Scheduler tick in nanoseconds.
        #[arg(long, default_value_t = 1_000)]
        tick_ns: u64,
    },

    /// Erase, program, and read an SPI flash range.
    Flash {
        /// Start address (decimal or 0x-prefixed hex).
        #[arg(long, default_value = "0", value_parser = parse_u32)]
        address: u32,

        /// Erase the sector containing the address first.
        #[arg(long)]
        erase: bool,

        /// Hex bytes to page-program at the address.
        #[arg(long)]
        program: Option<String>,

        /// Number of bytes to read back.
        #[arg(long, default_value_t = 16)]
        read: usize,

        /// Image to load into the array before starting.
        #[arg(long)]
        load: Option<PathBuf>,

        /// Image to write when the device powers down.
        #[arg(long)]
        dump: Option<PathBuf>,
    },

    /// Load a JSON board description and run it.
    Run {
        /// Configuration file.
        config: PathBuf,

        /// Simulated time to run, in microseconds.
        #[arg(long, default_value_t = 1_000)]
        for_us: u64,

        /// Print the inventory as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Rom { id, tick_ns } => cmd_rom(&id, tick_ns),
        Commands::Flash {
            address,
            erase,
            program,
            read,
            load,
            dump,
        } => cmd_flash(address, erase, program.as_deref(), read, load, dump),
        Commands::Run {
            config,
            for_us,
            json,
        } => cmd_run(&config, for_us, json),
    };
    process::exit(code);
}

/// Parses `123` or `0x7b`.
fn parse_u32(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid address {s:?}: {e}"))
}

/// Parses an even-length string of hex digits.
fn parse_hex_bytes(s: &str) -> Result<Vec<u8>, String> {
    if s.len() % 2 != 0 {
        return Err(format!("odd number of hex digits in {s:?}"));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            s.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| format!("bad hex byte at offset {i} in {s:?}"))
        })
        .collect()
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_violations(records: &[(DeviceHandle, ViolationRecord)], sim: &Simulator) {
    for (handle, record) in records {
        let name = sim.platform().get(*handle).map_or("?", |d| d.name());
        println!("  [{} ns] {name}: {}", record.at, record.violation);
    }
}

/// Reads the ROM of a single one-wire device.
fn cmd_rom(id: &str, tick_ns: u64) -> i32 {
    let mut sim = Simulator::new(tick_ns);
    let device = OneWireDevice::from_id_string("ds2401", sim.clock_handle(), id)
        .with_telemetry(TracingTelemetry);
    let handle = sim.platform_mut().add(Box::new(device));
    sim.write(handle, PinWord::new(1, 1));

    let master = OneWireMaster::new(handle);
    let Some(bytes) = master.read_rom(&mut sim) else {
        eprintln!("Error: no presence pulse");
        return 1;
    };
    let rom = RomId::from_bytes(bytes);
    println!("Streamed : {}", hex(&bytes));
    println!("ROM ID   : {rom}");
    println!("Family   : {:#04x}", rom.family());
    println!(
        "CRC      : {:#04x} ({})",
        rom.crc(),
        if rom.crc_valid() { "ok" } else { "MISMATCH" }
    );

    let violations = sim.platform_mut().drain_violations();
    if !violations.is_empty() {
        println!("Violations:");
        print_violations(&violations, &sim);
    }
    i32::from(!rom.crc_valid())
}

/// Runs erase, program, and read against a default-geometry flash.
fn cmd_flash(
    address: u32,
    erase: bool,
    program: Option<&str>,
    read: usize,
    load: Option<PathBuf>,
    dump: Option<PathBuf>,
) -> i32 {
    let data = match program.map(parse_hex_bytes).transpose() {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Error: {e}");
            return 2;
        }
    };

    let mut sim = Simulator::new(us(10));
    let mut flash = SpiFlash::new("flash0", sim.clock_handle(), Geometry::M25P80)
        .with_telemetry(TracingTelemetry);
    if let Some(path) = load {
        if let Err(e) = flash.load_image(&path) {
            eprintln!("Error: {e}");
            return 1;
        }
    }
    if let Some(path) = dump {
        flash = flash.with_dump_image(path);
    }
    let handle = sim.platform_mut().add(Box::new(flash));
    let mut master = SpiMaster::new(handle);
    master.deselect(&mut sim);

    let timeout = periphsim_core::common::s(20);
    if erase {
        master.write_enable(&mut sim);
        master.sector_erase(&mut sim, address);
        if !master.wait_while_busy(&mut sim, us(1_000), timeout) {
            eprintln!("Error: sector erase did not complete");
            return 1;
        }
        println!("Erased sector at {address:#08x} (t = {} ns)", sim.now());
    }
    if let Some(data) = data {
        master.write_enable(&mut sim);
        master.page_program(&mut sim, address, &data);
        if !master.wait_while_busy(&mut sim, us(100), timeout) {
            eprintln!("Error: page program did not complete");
            return 1;
        }
        println!("Programmed {} byte(s) (t = {} ns)", data.len(), sim.now());
    }
    let bytes = master.read(&mut sim, address, read);
    println!("{address:#08x}: {}", hex(&bytes));

    let violations = sim.platform_mut().drain_violations();
    if !violations.is_empty() {
        println!("Violations:");
        print_violations(&violations, &sim);
    }
    sim.platform_mut().power_down_all();
    0
}

/// Loads a board description, runs it, and prints what it contains.
fn cmd_run(path: &std::path::Path, for_us: u64, json: bool) -> i32 {
    let config = match Config::from_path(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };
    let mut sim = match Simulator::from_config(&config) {
        Ok(sim) => sim,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };
    tracing::info!(
        config = %path.display(),
        devices = sim.platform().len(),
        tick_ns = sim.tick_ns(),
        "board loaded"
    );
    sim.platform_mut().power_up_all();
    let _ = sim.advance_by(us(for_us));

    let handles: Vec<DeviceHandle> = sim.platform().handles().collect();
    let mut inventory = Vec::new();
    for handle in handles {
        let Some(device) = sim.platform().get(handle) else {
            continue;
        };
        let entry = if let Some(ow) = device.as_one_wire() {
            serde_json::json!({
                "handle": handle.index(),
                "name": device.name(),
                "kind": "one_wire",
                "rom_id": ow.rom_id().to_string(),
                "phase": ow.phase().name(),
                "violations": device.violations().total(),
            })
        } else if let Some(flash) = device.as_spi_flash() {
            serde_json::json!({
                "handle": handle.index(),
                "name": device.name(),
                "kind": "spi_flash",
                "size": flash.array().geometry().size(),
                "status": flash.status().bits(),
                "power": flash.power_mode().name(),
                "violations": device.violations().total(),
            })
        } else {
            serde_json::json!({ "handle": handle.index(), "name": device.name() })
        };
        inventory.push(entry);
    }

    if json {
        let doc = serde_json::json!({ "now_ns": sim.now(), "devices": inventory });
        match serde_json::to_string_pretty(&doc) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("Error: {e}");
                return 1;
            }
        }
    } else {
        println!("t = {} ns, {} device(s)", sim.now(), inventory.len());
        for entry in &inventory {
            println!("  {entry}");
        }
    }
    sim.platform_mut().power_down_all();
    0
}
