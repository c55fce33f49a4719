//! Microsecond clock sources.
//!
//! The harness never reads time directly; it asks a [`Clock`] handed to it at
//! composition time. The binary picks a concrete source from the command line,
//! tests use [`crate::testing::FakeClock`].

use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// A non-regressing microsecond counter.
pub trait Clock {
    /// Current reading in microseconds. Only differences between two readings
    /// of the same clock are meaningful.
    fn now_micros(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_micros(&self) -> u64 {
        (**self).now_micros()
    }
}

/// Microseconds elapsed since the clock was created, backed by [`Instant`].
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_micros(&self) -> u64 {
        // u64 microseconds covers ~584k years of uptime.
        self.origin.elapsed().as_micros() as u64
    }
}

/// Microseconds since the Unix epoch.
///
/// Can step backwards if the system time is adjusted mid-run; the executor
/// saturates such intervals to zero.
#[derive(Clone, Copy, Debug, Default)]
pub struct WallClock;

impl Clock for WallClock {
    fn now_micros(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_micros() as u64
    }
}
