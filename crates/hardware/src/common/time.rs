//! Virtual simulation clock.
//!
//! This module defines the single time source shared by the scheduler and every device. It provides:
//! 1. **Units:** Nanosecond timestamps plus `us`/`ms`/`s` helpers for datasheet windows.
//! 2. **Ownership Split:** `VirtualClock` may advance time; `ClockHandle` may only observe it.
//! 3. **Windows:** Inclusive tolerance windows used to classify how long a line was held.
//!
//! Devices never advance the clock. The scheduler owns the `VirtualClock` and hands
//! each device a `ClockHandle` at construction, so all devices see the same `now`
//! during a tick.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Simulated time in nanoseconds.
pub type Nanos = u64;

/// Nanoseconds per microsecond.
pub const NS_PER_US: Nanos = 1_000;

/// Nanoseconds per millisecond.
pub const NS_PER_MS: Nanos = 1_000_000;

/// Nanoseconds per second.
pub const NS_PER_S: Nanos = 1_000_000_000;

/// Converts microseconds to nanoseconds.
#[inline]
pub const fn us(n: u64) -> Nanos {
    n * NS_PER_US
}

/// Converts milliseconds to nanoseconds.
#[inline]
pub const fn ms(n: u64) -> Nanos {
    n * NS_PER_MS
}

/// Converts seconds to nanoseconds.
#[inline]
pub const fn s(n: u64) -> Nanos {
    n * NS_PER_S
}

/// Inclusive `[min, max]` duration window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    /// Shortest accepted duration.
    pub min: Nanos,
    /// Longest accepted duration.
    pub max: Nanos,
}

impl Window {
    /// Creates a window from microsecond bounds.
    ///
    /// # Arguments
    ///
    /// * `min_us` - Lower bound in microseconds (inclusive).
    /// * `max_us` - Upper bound in microseconds (inclusive).
    pub const fn from_us(min_us: u64, max_us: u64) -> Self {
        Self {
            min: us(min_us),
            max: us(max_us),
        }
    }

    /// Returns `true` if `elapsed` falls inside the window.
    #[inline]
    pub const fn contains(&self, elapsed: Nanos) -> bool {
        elapsed >= self.min && elapsed <= self.max
    }
}

/// The scheduler-owned monotonic clock.
///
/// Cloning a `VirtualClock` shares the same counter; hand devices a
/// [`ClockHandle`] instead so they cannot move time.
#[derive(Clone, Debug, Default)]
pub struct VirtualClock {
    ns: Arc<AtomicU64>,
}

impl VirtualClock {
    /// Creates a clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current simulated time.
    #[inline]
    pub fn now(&self) -> Nanos {
        self.ns.load(Ordering::Relaxed)
    }

    /// Advances the clock by `delta` nanoseconds and returns the new time.
    pub fn advance(&self, delta: Nanos) -> Nanos {
        self.ns.fetch_add(delta, Ordering::Relaxed) + delta
    }

    /// Moves the clock forward to `t`. Earlier targets are ignored.
    ///
    /// # Returns
    ///
    /// The clock value after the call.
    pub fn advance_to(&self, t: Nanos) -> Nanos {
        self.ns.fetch_max(t, Ordering::Relaxed).max(t)
    }

    /// Returns a read-only handle to this clock.
    pub fn handle(&self) -> ClockHandle {
        ClockHandle {
            ns: Arc::clone(&self.ns),
        }
    }
}

/// Read-only view of a [`VirtualClock`] held by devices.
#[derive(Clone, Debug)]
pub struct ClockHandle {
    ns: Arc<AtomicU64>,
}

impl ClockHandle {
    /// Returns the current simulated time.
    #[inline]
    pub fn now(&self) -> Nanos {
        self.ns.load(Ordering::Relaxed)
    }
}
