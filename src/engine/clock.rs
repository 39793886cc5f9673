//! # Clock
//!
//! Tick pacing for the translation loop, calibration and capture.
//!
//! Everything that waits goes through a [`Clock`], so tests can replace real
//! sleeps with a clock that only records them.

use std::time::Duration;

/// Blocks the calling thread between ticks.
pub trait Clock {
    fn sleep(&self, duration: Duration);
}

/// Real clock: `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadClock;

impl Clock for ThreadClock {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}
