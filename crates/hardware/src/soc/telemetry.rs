//! Telemetry sink.
//!
//! Devices report power-mode transitions and named signal samples at fixed call
//! points. The sink is an external collaborator (trace writers, GUIs); the core
//! behaves identically with [`NullTelemetry`].

use std::sync::{Arc, Mutex};

use crate::common::Nanos;

/// Receiver for device telemetry.
pub trait TelemetrySink: Send + std::fmt::Debug {
    /// A device entered a new power mode.
    fn power_mode(&mut self, device: &str, mode: &'static str, at: Nanos);
    /// A named signal took a new value.
    fn signal(&mut self, device: &str, signal: &'static str, value: u64, at: Nanos);
}

/// Sink that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullTelemetry;

impl TelemetrySink for NullTelemetry {
    fn power_mode(&mut self, _device: &str, _mode: &'static str, _at: Nanos) {}
    fn signal(&mut self, _device: &str, _signal: &'static str, _value: u64, _at: Nanos) {}
}

/// Sink that forwards samples to `tracing` at `trace` level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn power_mode(&mut self, device: &str, mode: &'static str, at: Nanos) {
        tracing::trace!(target: "periphsim::telemetry", device, mode, at_ns = at, "power mode");
    }

    fn signal(&mut self, device: &str, signal: &'static str, value: u64, at: Nanos) {
        tracing::trace!(target: "periphsim::telemetry", device, signal, value, at_ns = at, "signal");
    }
}

/// One recorded telemetry sample.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TelemetryEvent {
    /// Power-mode transition.
    PowerMode {
        /// Reporting device.
        device: String,
        /// New mode name.
        mode: &'static str,
        /// Simulated time of the transition.
        at: Nanos,
    },
    /// Signal sample.
    Signal {
        /// Reporting device.
        device: String,
        /// Signal name.
        signal: &'static str,
        /// Sampled value.
        value: u64,
        /// Simulated time of the sample.
        at: Nanos,
    },
}

/// Sink that keeps every sample in memory.
///
/// Clones share the same buffer, so a test can keep one clone and hand the other
/// to a device.
#[derive(Clone, Debug, Default)]
pub struct RecordingTelemetry {
    events: Arc<Mutex<Vec<TelemetryEvent>>>,
}

impl RecordingTelemetry {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Returns the `(time, value)` samples of one signal.
    pub fn signal_samples(&self, signal: &str) -> Vec<(Nanos, u64)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                TelemetryEvent::Signal {
                    signal: s,
                    value,
                    at,
                    ..
                } if s == signal => Some((at, value)),
                _ => None,
            })
            .collect()
    }

    /// Returns the sequence of power modes reported.
    pub fn power_modes(&self) -> Vec<&'static str> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                TelemetryEvent::PowerMode { mode, .. } => Some(mode),
                TelemetryEvent::Signal { .. } => None,
            })
            .collect()
    }

    fn push(&self, event: TelemetryEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl TelemetrySink for RecordingTelemetry {
    fn power_mode(&mut self, device: &str, mode: &'static str, at: Nanos) {
        self.push(TelemetryEvent::PowerMode {
            device: device.to_owned(),
            mode,
            at,
        });
    }

    fn signal(&mut self, device: &str, signal: &'static str, value: u64, at: Nanos) {
        self.push(TelemetryEvent::Signal {
            device: device.to_owned(),
            signal,
            value,
            at,
        });
    }
}
