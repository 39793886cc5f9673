//! # Calibration Resolver
//!
//! Interactive sequence that learns which physical input drives each logical
//! control.
//!
//! Each prompt is resolved in order, one at a time:
//! - with a predicate, by the first axis whose value (after the linear
//!   deadzone) satisfies it, recorded with the sign of that value;
//! - without one, by the first button that goes down, recorded with no polarity.
//!
//! An input already satisfying the step when it begins (a trigger resting at
//! an extreme, a button still held from the previous step) is ignored until it
//! leaves that state.
//!
//! The sequence fails as a whole if the controller disappears. Nothing is
//! committed unless every step resolved and the store accepted the new file.

use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

use crate::controller::deadzone;
use crate::controller::device::DeviceSource;
use crate::engine::clock::Clock;
use crate::error::{PadBridgeError, Result};
use crate::mapping::binding::{Binding, LogicalControl, Polarity};
use crate::mapping::profile::Profile;
use crate::mapping::store::ProfileStore;

/// Axis threshold used by the default prompts.
pub const DEFAULT_PROMPT_THRESHOLD: f32 = 0.5;

/// Condition an axis value must meet to resolve a prompt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AxisPredicate {
    Below(f32),
    Above(f32),
}

impl AxisPredicate {
    pub fn matches(&self, value: f32) -> bool {
        match *self {
            AxisPredicate::Below(limit) => value < limit,
            AxisPredicate::Above(limit) => value > limit,
        }
    }
}

/// One calibration step.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationPrompt {
    /// Instruction shown to the user
    pub label: String,
    pub control: LogicalControl,
    /// `None` waits for a button instead of an axis
    pub predicate: Option<AxisPredicate>,
}

impl CalibrationPrompt {
    pub fn axis(label: &str, control: LogicalControl, predicate: AxisPredicate) -> Self {
        Self {
            label: label.to_string(),
            control,
            predicate: Some(predicate),
        }
    }

    pub fn button(label: &str, control: LogicalControl) -> Self {
        Self {
            label: label.to_string(),
            control,
            predicate: None,
        }
    }
}

/// The ten-step pointer calibration sequence.
pub fn default_pointer_prompts() -> Vec<CalibrationPrompt> {
    use AxisPredicate::{Above, Below};
    use LogicalControl::*;

    let t = DEFAULT_PROMPT_THRESHOLD;
    vec![
        CalibrationPrompt::axis("Hold RIGHT stick UP", RightStickVerticalNegative, Below(-t)),
        CalibrationPrompt::axis("Hold RIGHT stick DOWN", RightStickVerticalPositive, Above(t)),
        CalibrationPrompt::axis("Hold RIGHT stick RIGHT", RightStickHorizontalPositive, Above(t)),
        CalibrationPrompt::axis("Hold RIGHT stick LEFT", RightStickHorizontalNegative, Below(-t)),
        CalibrationPrompt::axis("Hold LEFT stick UP", LeftStickVerticalNegative, Below(-t)),
        CalibrationPrompt::axis("Hold LEFT stick DOWN", LeftStickVerticalPositive, Above(t)),
        CalibrationPrompt::axis("Hold the trigger for LEFT click", LeftTriggerClick, Above(t)),
        CalibrationPrompt::axis("Hold the trigger for RIGHT click", RightTriggerClick, Above(t)),
        CalibrationPrompt::button("Press the button for BACK (X1)", ButtonX1),
        CalibrationPrompt::button("Press the button for FORWARD (X2)", ButtonX2),
    ]
}

/// Polling parameters of a calibration run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationOptions {
    pub deadzone: f32,
    /// Delay between polls
    pub tick: Duration,
    /// Give up on a step after this long; `None` waits forever
    pub step_timeout: Option<Duration>,
}

impl Default for CalibrationOptions {
    fn default() -> Self {
        Self {
            deadzone: 0.2,
            tick: Duration::from_millis(10),
            step_timeout: None,
        }
    }
}

/// Runs every prompt in order and returns the resolved bindings in that order.
///
/// `announce` is called with the zero-based step index before each step starts polling.
///
/// # Errors
///
/// Returns `CalibrationAborted` if the controller disconnects or a step times out.
pub fn run_calibration<D, C, F>(
    device: &mut D,
    clock: &C,
    prompts: &[CalibrationPrompt],
    options: &CalibrationOptions,
    mut announce: F,
) -> Result<Vec<(LogicalControl, Binding)>>
where
    D: DeviceSource + ?Sized,
    C: Clock + ?Sized,
    F: FnMut(usize, &CalibrationPrompt),
{
    info!("Calibration started ({} steps) on {}", prompts.len(), device.name());

    let mut resolved = Vec::with_capacity(prompts.len());
    for (step, prompt) in prompts.iter().enumerate() {
        announce(step, prompt);
        let binding = resolve_step(device, clock, prompt, options)?;
        info!("{}: {}", prompt.control, binding);
        resolved.push((prompt.control, binding));
    }

    Ok(resolved)
}

fn resolve_step<D, C>(
    device: &mut D,
    clock: &C,
    prompt: &CalibrationPrompt,
    options: &CalibrationOptions,
) -> Result<Binding>
where
    D: DeviceSource + ?Sized,
    C: Clock + ?Sized,
{
    // Inputs seen outside the resolving state since the step began
    let mut armed: Vec<bool> = Vec::new();
    let mut waited = Duration::ZERO;

    loop {
        device.poll_events();
        if device.connected_count() == 0 || !device.is_open() {
            return Err(PadBridgeError::CalibrationAborted(format!(
                "controller disconnected during \"{}\"",
                prompt.label
            )));
        }

        let found = match prompt.predicate {
            Some(predicate) => {
                armed.resize(device.axis_count(), false);
                first_armed_match(&mut armed, |i| {
                    let value = deadzone::linear(device.axis(i), options.deadzone);
                    predicate
                        .matches(value)
                        .then(|| Binding::axis(i as u16, Polarity::of(value)))
                })
            }
            None => {
                armed.resize(device.button_count(), false);
                first_armed_match(&mut armed, |i| device.button(i).then(|| Binding::button(i as u16)))
            }
        };

        if let Some(binding) = found {
            return Ok(binding);
        }

        if let Some(limit) = options.step_timeout {
            if waited >= limit {
                return Err(PadBridgeError::CalibrationAborted(format!(
                    "timed out waiting for \"{}\"",
                    prompt.label
                )));
            }
        }

        clock.sleep(options.tick);
        waited += options.tick;
    }
}

/// Returns the first input that resolves after having been seen not resolving.
fn first_armed_match<F>(armed: &mut [bool], mut resolve: F) -> Option<Binding>
where
    F: FnMut(usize) -> Option<Binding>,
{
    for (i, seen_idle) in armed.iter_mut().enumerate() {
        match resolve(i) {
            Some(binding) if *seen_idle => return Some(binding),
            Some(_) => {}
            None => *seen_idle = true,
        }
    }
    None
}

/// Calibrates and commits the result to `profile` and `store`.
///
/// Only the calibrated controls of `profile` are replaced; action bindings and
/// tuning survive. On any failure `profile` and the stored file are unchanged.
///
/// # Errors
///
/// Returns `CalibrationAborted` from the sequence, or the store's error if
/// the new mapping cannot be written.
pub fn calibrate_and_save<D, C, F>(
    device: &mut D,
    clock: &C,
    store: &ProfileStore,
    profile: &mut Profile,
    prompts: &[CalibrationPrompt],
    options: &CalibrationOptions,
    announce: F,
) -> Result<()>
where
    D: DeviceSource + ?Sized,
    C: Clock + ?Sized,
    F: FnMut(usize, &CalibrationPrompt),
{
    let resolved = run_calibration(device, clock, prompts, options, announce)?;
    let controls: BTreeMap<LogicalControl, Binding> = resolved.into_iter().collect();

    let mut updated = profile.clone();
    updated.replace_controls(controls);
    store.save(&updated)?;

    debug!("Calibration committed to {}", store.path().display());
    *profile = updated;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::device::mocks::{Frame, ScriptedDevice};
    use crate::engine::clock::mocks::ManualClock;
    use crate::mapping::binding::InputId;
    use tempfile::TempDir;

    fn no_announce(_: usize, _: &CalibrationPrompt) {}

    fn two_prompts() -> Vec<CalibrationPrompt> {
        vec![
            CalibrationPrompt::axis("UP", LogicalControl::RightStickVerticalNegative, AxisPredicate::Below(-0.5)),
            CalibrationPrompt::button("A-button", LogicalControl::ButtonX1),
        ]
    }

    fn up_then_button_device() -> ScriptedDevice {
        let rest = Frame::neutral(2, 4);
        let mut device = ScriptedDevice::new(rest.clone());
        device.push_repeated(rest.clone(), 3);
        device.push_repeated(rest.clone().with_axis(0, -0.7), 2);
        device.push(rest.clone());
        device.push(rest.with_button(2, true));
        device
    }

    // ==================== Predicate Tests ====================

    #[test]
    fn test_predicates() {
        assert!(AxisPredicate::Below(-0.5).matches(-0.7));
        assert!(!AxisPredicate::Below(-0.5).matches(-0.5));
        assert!(AxisPredicate::Above(0.5).matches(0.51));
        assert!(!AxisPredicate::Above(0.5).matches(0.0));
    }

    #[test]
    fn test_default_prompts() {
        let prompts = default_pointer_prompts();
        assert_eq!(prompts.len(), 10);

        let controls: Vec<LogicalControl> = prompts.iter().map(|p| p.control).collect();
        assert_eq!(controls, LogicalControl::ALL.to_vec());

        assert!(prompts[..8].iter().all(|p| p.predicate.is_some()));
        assert!(prompts[8..].iter().all(|p| p.predicate.is_none()));
        assert_eq!(prompts[0].predicate, Some(AxisPredicate::Below(-0.5)));
        assert_eq!(prompts[6].predicate, Some(AxisPredicate::Above(0.5)));
    }

    // ==================== Sequence Tests ====================

    #[test]
    fn test_resolves_axis_then_button_in_order() {
        let mut device = up_then_button_device();
        let clock = ManualClock::new();
        let mut announced = Vec::new();

        let resolved = run_calibration(&mut device, &clock, &two_prompts(), &CalibrationOptions::default(), |i, p| {
            announced.push((i, p.label.clone()))
        })
        .unwrap();

        assert_eq!(resolved, vec![
            (LogicalControl::RightStickVerticalNegative, Binding::axis(0, Polarity::Negative)),
            (LogicalControl::ButtonX1, Binding::button(2)),
        ]);
        assert_eq!(announced, vec![(0, "UP".to_string()), (1, "A-button".to_string())]);
        assert!(clock.sleeps().iter().all(|d| *d == Duration::from_millis(10)));
    }

    #[test]
    fn test_resting_extreme_is_ignored() {
        // Axis 1 rests at -1.0 (a trigger); the user then pushes axis 0
        let rest = Frame::neutral(2, 0).with_axis(1, -1.0);
        let mut device = ScriptedDevice::new(rest.clone());
        device.push_repeated(rest.clone(), 5);
        device.push(rest.with_axis(0, -0.9));

        let prompts = [CalibrationPrompt::axis("UP", LogicalControl::LeftStickVerticalNegative, AxisPredicate::Below(-0.5))];
        let resolved =
            run_calibration(&mut device, &ManualClock::new(), &prompts, &CalibrationOptions::default(), no_announce)
                .unwrap();

        assert_eq!(resolved[0].1, Binding::axis(0, Polarity::Negative));
    }

    #[test]
    fn test_trigger_resolves_after_leaving_rest() {
        // Trigger resting at -1 is pulled to +1
        let rest = Frame::neutral(1, 0).with_axis(0, -1.0);
        let mut device = ScriptedDevice::new(rest.clone());
        device.push(rest.clone());
        device.push(rest.with_axis(0, 1.0));

        let prompts = [CalibrationPrompt::axis("L-click", LogicalControl::LeftTriggerClick, AxisPredicate::Above(0.5))];
        let resolved =
            run_calibration(&mut device, &ManualClock::new(), &prompts, &CalibrationOptions::default(), no_announce)
                .unwrap();

        assert_eq!(resolved[0].1, Binding::axis(0, Polarity::Positive));
    }

    #[test]
    fn test_held_button_must_be_released_first() {
        let rest = Frame::neutral(0, 3);
        let mut device = ScriptedDevice::new(rest.clone());
        device.push_repeated(rest.clone().with_button(0, true), 3);
        device.push(rest.clone().with_button(0, true).with_button(1, true));

        let prompts = [CalibrationPrompt::button("X1", LogicalControl::ButtonX1)];
        let resolved =
            run_calibration(&mut device, &ManualClock::new(), &prompts, &CalibrationOptions::default(), no_announce)
                .unwrap();

        assert_eq!(resolved[0].1, Binding::button(1));
    }

    #[test]
    fn test_deadzone_noise_never_resolves() {
        let mut device = ScriptedDevice::new(Frame::neutral(1, 0).with_axis(0, 0.15));
        let options = CalibrationOptions {
            deadzone: 0.2,
            step_timeout: Some(Duration::from_millis(100)),
            ..CalibrationOptions::default()
        };
        let prompts = [CalibrationPrompt::axis("DOWN", LogicalControl::LeftStickVerticalPositive, AxisPredicate::Above(0.1))];

        let result = run_calibration(&mut device, &ManualClock::new(), &prompts, &options, no_announce);
        assert!(matches!(result, Err(PadBridgeError::CalibrationAborted(msg)) if msg.contains("timed out")));
    }

    #[test]
    fn test_disconnect_aborts_whole_sequence() {
        let rest = Frame::neutral(2, 4);
        let mut device = ScriptedDevice::new(rest.clone());
        device.push(rest.clone());
        device.push(rest.clone().with_axis(0, 0.0));
        device.push(rest.disconnected());

        let result = run_calibration(
            &mut device,
            &ManualClock::new(),
            &two_prompts(),
            &CalibrationOptions::default(),
            no_announce,
        );
        match result {
            Err(PadBridgeError::CalibrationAborted(msg)) => assert!(msg.contains("disconnected"), "{}", msg),
            other => panic!("Expected CalibrationAborted, got {:?}", other),
        }
    }

    #[test]
    fn test_lost_handle_aborts_while_connected() {
        let rest = Frame::neutral(2, 4);
        let mut device = ScriptedDevice::new(rest.clone());
        device.push(rest.clone());
        device.push(rest.lost());

        let result = run_calibration(
            &mut device,
            &ManualClock::new(),
            &two_prompts(),
            &CalibrationOptions::default(),
            no_announce,
        );
        assert!(matches!(result, Err(PadBridgeError::CalibrationAborted(msg)) if msg.contains("disconnected")));
    }

    // ==================== Commit Tests ====================

    #[test]
    fn test_calibrate_and_save_commits_atomically() {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::new(dir.path().join("mapping.json"));
        let mut profile = Profile::default();
        profile.bind(InputId::button(3), "key:space".parse().unwrap());

        let mut device = up_then_button_device();
        calibrate_and_save(
            &mut device,
            &ManualClock::new(),
            &store,
            &mut profile,
            &two_prompts(),
            &CalibrationOptions::default(),
            no_announce,
        )
        .unwrap();

        assert_eq!(profile.controls.len(), 2);
        assert_eq!(profile.actions.len(), 1);
        assert!(profile.calibrated_at.is_some());
        assert_eq!(store.load(), profile);
    }

    #[test]
    fn test_failed_calibration_keeps_previous_mapping() {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::new(dir.path().join("mapping.json"));
        let mut profile = Profile::default();
        profile
            .controls
            .insert(LogicalControl::ButtonX2, Binding::button(7));
        store.save(&profile).unwrap();
        let before = profile.clone();

        let rest = Frame::neutral(2, 4);
        let mut device = ScriptedDevice::new(rest.clone());
        device.push(rest.disconnected());

        let result = calibrate_and_save(
            &mut device,
            &ManualClock::new(),
            &store,
            &mut profile,
            &two_prompts(),
            &CalibrationOptions::default(),
            no_announce,
        );

        assert!(result.is_err());
        assert_eq!(profile, before);
        assert_eq!(store.load(), before);
    }
}
