//! # Reconnect Wait
//!
//! Bounded polling for a controller to (re)appear.
//!
//! The wait blocks the worker on purpose: translation pauses, the worker does
//! not exit. The running flag is checked before every poll so a stop request
//! ends the wait within one reconnect interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use crate::controller::device::DeviceSource;
use crate::engine::clock::Clock;

/// Reconnect polling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay between polls
    pub interval: Duration,
    /// Waiting time after which a warning is logged, repeated every further period
    pub warn_after: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            warn_after: Duration::from_secs(10),
        }
    }
}

/// Polls until the device reports at least one controller.
///
/// # Returns
///
/// `true` once a controller is available, `false` if `running` was cleared first.
pub fn wait_for_device<D, C>(
    device: &mut D,
    clock: &C,
    policy: &ReconnectPolicy,
    running: &AtomicBool,
) -> bool
where
    D: DeviceSource + ?Sized,
    C: Clock + ?Sized,
{
    let mut waited = Duration::ZERO;
    let mut next_warning = policy.warn_after;

    loop {
        if !running.load(Ordering::SeqCst) {
            debug!("Reconnect wait cancelled after {:?}", waited);
            return false;
        }

        device.poll_events();
        if device.connected_count() > 0 {
            debug!("Controller available after {:?}", waited);
            return true;
        }

        clock.sleep(policy.interval);
        waited += policy.interval;

        if !policy.warn_after.is_zero() && waited >= next_warning {
            warn!("Still no controller after {}s", waited.as_secs());
            next_warning += policy.warn_after;
        }
    }
}
