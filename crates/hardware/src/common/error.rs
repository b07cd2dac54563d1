//! Error and violation types.
//!
//! This module defines the error handling vocabulary for the peripheral core. It provides:
//! 1. **Violations:** Non-fatal protocol problems (timing, unsupported opcode, logical state,
//!    protection, truncation) that devices report and then recover from.
//! 2. **Violation Log:** A bounded per-device record that tests and the platform can drain.
//! 3. **Configuration Errors:** Fallible parsing/loading results for ROM IDs, flash images,
//!    and JSON configuration. Devices fall back to safe defaults when these occur.
//!
//! Nothing in this module is fatal to the simulation.

use std::collections::VecDeque;
use std::path::PathBuf;

use thiserror::Error;

use super::time::Nanos;

/// Maximum number of violations retained per device.
pub const VIOLATION_LOG_CAPACITY: usize = 64;

/// A non-fatal protocol violation observed by a device.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Violation {
    /// An edge or level fell outside its tolerance window.
    ///
    /// Recovery is always to abandon the current sub-automaton.
    #[error("timing violation in {state}: {detail} after {elapsed_ns} ns")]
    Timing {
        /// Automaton state in which the violation was seen.
        state: &'static str,
        /// What went wrong.
        detail: &'static str,
        /// Time spent in `state` when the violation occurred.
        elapsed_ns: Nanos,
    },

    /// A recognized but unimplemented command.
    #[error("unsupported command {opcode:#04x} ({name})")]
    Unsupported {
        /// Raw opcode byte.
        opcode: u8,
        /// Mnemonic of the command.
        name: &'static str,
    },

    /// A command issued in a state where the part would not accept it.
    ///
    /// Execution still proceeds; software is expected to poll status itself.
    #[error("logical violation on {opcode:#04x}: {reason}")]
    Logical {
        /// Raw opcode byte.
        opcode: u8,
        /// Why the command was out of order.
        reason: &'static str,
    },

    /// A write or erase touched a block-protected region (advisory, still performed).
    #[error("protection violation on {opcode:#04x} at {address:#08x}")]
    Protection {
        /// Raw opcode byte.
        opcode: u8,
        /// Address the command targeted.
        address: u32,
    },

    /// Chip select was released before all argument bytes arrived.
    #[error("command {opcode:#04x} truncated, {missing} argument byte(s) missing")]
    Truncated {
        /// Raw opcode byte.
        opcode: u8,
        /// Argument bytes still expected at deselect.
        missing: u8,
    },

    /// A persisted identifier whose checksum does not match its payload.
    #[error("ROM ID CRC mismatch: stored {stored:#04x}, computed {computed:#04x}")]
    RomCrc {
        /// CRC byte found in the identifier.
        stored: u8,
        /// CRC computed from family and serial bytes.
        computed: u8,
    },
}

/// One logged violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViolationRecord {
    /// Simulated time at which the violation was reported.
    pub at: Nanos,
    /// The violation itself.
    pub violation: Violation,
}

/// Bounded, oldest-first violation history.
#[derive(Clone, Debug, Default)]
pub struct ViolationLog {
    records: VecDeque<ViolationRecord>,
    total: u64,
}

impl ViolationLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a violation and emits it as a `warn` event.
    ///
    /// # Arguments
    ///
    /// * `device` - Name of the reporting device, used as a tracing field.
    /// * `at` - Simulated time of the violation.
    /// * `violation` - What happened.
    pub fn record(&mut self, device: &str, at: Nanos, violation: Violation) {
        tracing::warn!(device, at_ns = at, %violation, "device violation");
        if self.records.len() == VIOLATION_LOG_CAPACITY {
            let _ = self.records.pop_front();
        }
        self.records.push_back(ViolationRecord { at, violation });
        self.total += 1;
    }

    /// Returns the retained records, oldest first.
    pub fn records(&self) -> impl Iterator<Item = &ViolationRecord> {
        self.records.iter()
    }

    /// Returns `true` if any retained record matches `pred`.
    pub fn any(&self, pred: impl Fn(&Violation) -> bool) -> bool {
        self.records.iter().any(|r| pred(&r.violation))
    }

    /// Removes and returns all retained records.
    pub fn drain(&mut self) -> Vec<ViolationRecord> {
        self.records.drain(..).collect()
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no records are retained.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of violations ever recorded, including evicted ones.
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Forgets all retained records without resetting the total.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

/// Failure to parse a textual one-wire ROM ID.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RomIdError {
    /// The string did not split into eight colon-separated groups.
    #[error("expected 8 colon-separated groups, found {0}")]
    GroupCount(usize),
    /// A group was not exactly two hexadecimal digits.
    #[error("group {index} ({group:?}) is not a 2-digit hex byte")]
    BadGroup {
        /// Zero-based position of the group in the string.
        index: usize,
        /// The offending text.
        group: String,
    },
}

/// Failure to load or dump a flash backing image.
#[derive(Debug, Error)]
pub enum ImageError {
    /// The file could not be read or written.
    #[error("image I/O on {}: {source}", .path.display())]
    Io {
        /// Image path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file length differs from the flash array size.
    #[error("image {} is {actual} bytes, array is {expected} bytes", .path.display())]
    SizeMismatch {
        /// Image path.
        path: PathBuf,
        /// Array size in bytes.
        expected: usize,
        /// File size in bytes.
        actual: usize,
    },
}

/// Failure to load a platform configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("reading config {}: {source}", .path.display())]
    Io {
        /// Configuration path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration was not valid JSON for [`crate::config::Config`].
    #[error("parsing config: {0}")]
    Parse(#[from] serde_json::Error),
    /// Two devices share a name.
    #[error("duplicate device name {0:?}")]
    DuplicateDevice(String),
    /// Flash geometry is unusable.
    #[error("device {name:?}: {reason}")]
    Geometry {
        /// Device name.
        name: String,
        /// What is wrong with the geometry.
        reason: &'static str,
    },
}
