//! Board components.
//!
//! This module organizes the pieces of the simulated board: the device
//! contract, the concrete device models, the telemetry seam, and the platform
//! arena that owns them.

/// Platform arena that owns every device.
pub mod builder;

/// Pin-bus device implementations.
pub mod devices;

/// Telemetry sinks.
pub mod telemetry;

/// Device trait definitions.
pub mod traits;

pub use builder::{DeviceHandle, Platform};
