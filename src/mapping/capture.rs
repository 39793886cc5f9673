//! # Input Capture
//!
//! Waits for the user to actuate one controller input, for manual binding.
//!
//! A button going down wins. Otherwise the first axis that travels more than
//! the capture threshold away from where it was when the capture started is
//! taken, signed by the direction of travel: a trigger resting at `-1` and
//! pulled captures as `axis:<i>:1`.

use std::time::Duration;
use tracing::info;

use crate::controller::device::DeviceSource;
use crate::engine::clock::Clock;
use crate::error::{PadBridgeError, Result};
use crate::mapping::binding::{InputId, Polarity};

/// Polling parameters of a capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureOptions {
    /// Axis travel needed to register
    pub threshold: f32,
    pub tick: Duration,
    /// `None` waits forever
    pub timeout: Option<Duration>,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            threshold: 0.75,
            tick: Duration::from_millis(10),
            timeout: None,
        }
    }
}

/// Blocks until one input is actuated and returns its id.
///
/// # Errors
///
/// - `Controller`: the controller disconnected
/// - `CaptureTimedOut`: nothing happened within `timeout`
pub fn capture_input<D, C>(device: &mut D, clock: &C, options: &CaptureOptions) -> Result<InputId>
where
    D: DeviceSource + ?Sized,
    C: Clock + ?Sized,
{
    device.poll_events();
    ensure_connected(device)?;

    let baseline: Vec<f32> = device.axis_samples().iter().map(|s| s.value).collect();
    let mut previous = device.button_samples();
    let mut waited = Duration::ZERO;

    loop {
        if let Some(limit) = options.timeout {
            if waited >= limit {
                return Err(PadBridgeError::CaptureTimedOut);
            }
        }

        clock.sleep(options.tick);
        waited += options.tick;

        device.poll_events();
        ensure_connected(device)?;

        let buttons = device.button_samples();
        let pressed = buttons.iter().find(|sample| {
            let was_down = previous
                .get(sample.index as usize)
                .map_or(false, |p| p.pressed);
            sample.pressed && !was_down
        });
        if let Some(sample) = pressed {
            let id = InputId::button(sample.index);
            info!("Captured {}", id);
            return Ok(id);
        }
        previous = buttons;

        for sample in device.axis_samples() {
            let rest = baseline.get(sample.index as usize).copied().unwrap_or(0.0);
            let travel = sample.value - rest;
            if travel.abs() > options.threshold {
                let id = InputId::axis(sample.index, Polarity::of(travel));
                info!("Captured {}", id);
                return Ok(id);
            }
        }
    }
}

fn ensure_connected<D: DeviceSource + ?Sized>(device: &D) -> Result<()> {
    if device.connected_count() == 0 || !device.is_open() {
        return Err(PadBridgeError::Controller(
            "controller disconnected during capture".to_string(),
        ));
    }
    Ok(())
}
