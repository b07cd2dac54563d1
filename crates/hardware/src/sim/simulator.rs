//! Simulator: owns the virtual clock and the platform side-by-side.
//!
//! Each step advances the clock by one tick and then updates every device, so
//! all devices observe the same `now` within a tick. Pin writes issued between
//! steps land before the next tick's updates.

use crate::common::{ClockHandle, ConfigError, Nanos, PinWord, VirtualClock};
use crate::config::Config;
use crate::soc::{DeviceHandle, Platform};

/// Top-level scheduler.
#[derive(Debug)]
pub struct Simulator {
    clock: VirtualClock,
    platform: Platform,
    tick_ns: Nanos,
}

impl Simulator {
    /// Creates a simulator with an empty platform at time zero.
    ///
    /// A zero `tick_ns` is raised to one nanosecond.
    pub fn new(tick_ns: Nanos) -> Self {
        Self {
            clock: VirtualClock::new(),
            platform: Platform::new(),
            tick_ns: tick_ns.max(1),
        }
    }

    /// Builds the simulator and its devices from configuration.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let mut sim = Self::new(config.general.tick_ns);
        sim.platform = Platform::from_config(config, &sim.clock)?;
        tracing::debug!(
            devices = sim.platform.len(),
            tick_ns = sim.tick_ns,
            "simulator built"
        );
        Ok(sim)
    }

    /// Current simulated time.
    pub fn now(&self) -> Nanos {
        self.clock.now()
    }

    /// Scheduler tick.
    pub const fn tick_ns(&self) -> Nanos {
        self.tick_ns
    }

    /// Read-only clock handle for constructing devices.
    pub fn clock_handle(&self) -> ClockHandle {
        self.clock.handle()
    }

    /// The device arena.
    pub const fn platform(&self) -> &Platform {
        &self.platform
    }

    /// The device arena, mutable.
    pub const fn platform_mut(&mut self) -> &mut Platform {
        &mut self.platform
    }

    /// Advances one tick and updates every device.
    ///
    /// # Returns
    ///
    /// The time after the step.
    pub fn step(&mut self) -> Nanos {
        let now = self.clock.advance(self.tick_ns);
        self.platform.update_all();
        now
    }

    /// Steps until `delta` nanoseconds have elapsed.
    pub fn advance_by(&mut self, delta: Nanos) -> Nanos {
        let target = self.now() + delta;
        self.advance_to(target)
    }

    /// Steps until the clock reaches `target`; the last step is shortened to land on it.
    ///
    /// Targets in the past leave the clock unchanged.
    pub fn advance_to(&mut self, target: Nanos) -> Nanos {
        let mut now = self.now();
        while now < target {
            now = self.clock.advance(self.tick_ns.min(target - now));
            self.platform.update_all();
        }
        now
    }

    /// Drives pins into a device at the current time.
    pub fn write(&mut self, handle: DeviceHandle, pins: PinWord) {
        self.platform.write(handle, pins);
    }

    /// Samples the pins a device drives at the current time.
    pub fn read(&mut self, handle: DeviceHandle) -> PinWord {
        self.platform.read(handle)
    }

    /// MCU reset: resets every device synchronously.
    pub fn reset(&mut self) {
        tracing::debug!(at_ns = self.now(), "platform reset");
        self.platform.reset_all();
    }
}
