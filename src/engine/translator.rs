//! # Translator
//!
//! One tick of translation: reads the polled device through the active
//! profile and emits output events.
//!
//! ## Paths
//!
//! - **Continuous**: pointer movement from the right stick (shaped deadzone,
//!   scaled by `mouse_speed`, truncated) and scroll from the left stick
//!   (linear deadzone, scaled by `scroll_clicks_per`).
//! - **Discrete, edge only**: trigger and X1/X2 clicks press on the rising
//!   edge and release on the falling edge.
//! - **Discrete, governed**: keyboard-mapper action bindings go through the
//!   repeat governor.
//!
//! Output is a pure function of the samples and the per-control state, so the
//! same sample sequence from a fresh state always yields the same events.
//!
//! Sink failures are logged and otherwise ignored; the held-output
//! bookkeeping still advances so a later release is not lost.

use std::time::Duration;
use tracing::{debug, warn};

use crate::controller::deadzone;
use crate::controller::device::{read_axis, read_button, DeviceSource};
use crate::controller::edge::{self, Edge};
use crate::controller::repeat::{RepeatDecision, RepeatGovernor};
use crate::engine::state::ControlStates;
use crate::error::Result;
use crate::mapping::action::OutputAction;
use crate::mapping::binding::{Binding, ControlId, InputId, LogicalControl, PhysicalSource};
use crate::mapping::profile::Profile;
use crate::output::{HeldOutput, HeldOutputs, InjectionSink};

/// Click controls and the order they are evaluated in.
const CLICK_CONTROLS: [LogicalControl; 4] = [
    LogicalControl::LeftTriggerClick,
    LogicalControl::RightTriggerClick,
    LogicalControl::ButtonX1,
    LogicalControl::ButtonX2,
];

/// Translates device samples into sink calls for one profile.
#[derive(Debug)]
pub struct Translator {
    profile: Profile,
    states: ControlStates,
    held: HeldOutputs,
    governor: RepeatGovernor,
}

impl Translator {
    /// Creates a translator with fresh state, ticking every `tick`.
    pub fn new(profile: Profile, tick: Duration) -> Self {
        let governor = RepeatGovernor::new(&profile.tuning.repeat, tick);
        Self {
            profile,
            states: ControlStates::new(),
            held: HeldOutputs::new(),
            governor,
        }
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn states(&self) -> &ControlStates {
        &self.states
    }

    /// `true` if any discrete output is currently down.
    pub fn holds_outputs(&self) -> bool {
        !self.held.is_empty()
    }

    /// Runs one tick against the last polled device state.
    pub fn tick<D, S>(&mut self, device: &D, sink: &mut S)
    where
        D: DeviceSource + ?Sized,
        S: InjectionSink + ?Sized,
    {
        self.pointer_motion(device, sink);
        self.scroll(device, sink);
        self.clicks(device, sink);
        self.actions(device, sink);
    }

    /// Releases every held output and forgets all per-control state.
    pub fn release_all<S: InjectionSink + ?Sized>(&mut self, sink: &mut S) {
        for output in self.held.drain() {
            debug!("Releasing held {:?}", output);
            report(output.release(sink), "release");
        }
        self.states.clear();
    }

    /// Forgets per-control state without touching the sink.
    ///
    /// Used after a reconnect, once held outputs were already released.
    pub fn reset(&mut self) {
        self.states.clear();
    }

    /// Swaps in a new profile between ticks.
    pub fn replace_profile<S: InjectionSink + ?Sized>(&mut self, profile: Profile, sink: &mut S) {
        self.release_all(sink);
        self.governor = RepeatGovernor::new(&profile.tuning.repeat, self.governor.tick());
        self.profile = profile;
    }

    fn pointer_motion<D, S>(&self, device: &D, sink: &mut S)
    where
        D: DeviceSource + ?Sized,
        S: InjectionSink + ?Sized,
    {
        let tuning = &self.profile.tuning;
        let x = self.profile.control(LogicalControl::RightStickHorizontalPositive);
        let y = self.profile.control(LogicalControl::RightStickVerticalPositive);
        if x.is_none() && y.is_none() {
            return;
        }

        let delta = |binding: Option<&Binding>| -> i32 {
            binding
                .and_then(|b| axis_reading(device, b))
                .map(|(raw, sign)| (deadzone::shape(raw, tuning.deadzone) * sign * tuning.mouse_speed) as i32)
                .unwrap_or(0)
        };

        let (dx, dy) = (delta(x), delta(y));
        if dx != 0 || dy != 0 {
            report(sink.move_by(dx, dy), "move");
        }
    }

    fn scroll<D, S>(&self, device: &D, sink: &mut S)
    where
        D: DeviceSource + ?Sized,
        S: InjectionSink + ?Sized,
    {
        let tuning = &self.profile.tuning;
        let Some((raw, sign)) = self
            .profile
            .control(LogicalControl::LeftStickVerticalNegative)
            .and_then(|b| axis_reading(device, b))
        else {
            return;
        };

        let mut amount = deadzone::linear(raw, tuning.deadzone) * sign * tuning.scroll_clicks_per;
        if tuning.invert_scroll {
            amount = -amount;
        }
        if amount != 0.0 {
            report(sink.scroll_by(amount), "scroll");
        }
    }

    fn clicks<D, S>(&mut self, device: &D, sink: &mut S)
    where
        D: DeviceSource + ?Sized,
        S: InjectionSink + ?Sized,
    {
        let deadzone = self.profile.tuning.deadzone;

        for control in CLICK_CONTROLS {
            let (Some(binding), Some(button)) = (self.profile.control(control), control.click_button())
            else {
                continue;
            };

            let active = match binding.source {
                PhysicalSource::Axis(i) => read_axis(device, i)
                    .map(|raw| edge::axis_active(raw, binding.polarity.sign(), deadzone))
                    .unwrap_or(false),
                PhysicalSource::Button(i) => read_button(device, i).unwrap_or(false),
            };

            let state = self.states.entry(ControlId::Logical(control));
            let edge = edge::detect(active, state.last_active);
            state.last_active = active;

            let output = HeldOutput::PointerButton(button);
            match edge {
                Some(Edge::Pressed) => {
                    debug!("{} pressed", control);
                    if self.held.acquire(output) {
                        report(output.press(sink), "press");
                    }
                }
                Some(Edge::Released) => {
                    debug!("{} released", control);
                    if self.held.release(output) {
                        report(output.release(sink), "release");
                    }
                }
                None => {}
            }
        }
    }

    fn actions<D, S>(&mut self, device: &D, sink: &mut S)
    where
        D: DeviceSource + ?Sized,
        S: InjectionSink + ?Sized,
    {
        let threshold = self.profile.tuning.axis_threshold;

        for (input, action) in &self.profile.actions {
            let active = input_active(device, input, threshold);
            let state = self.states.entry(ControlId::Input(*input));

            match self.governor.step(state, active) {
                RepeatDecision::Fire { first } => {
                    debug!("{} fired {} (first: {})", input, action, first);
                    fire(action, first, &mut self.held, sink);
                }
                RepeatDecision::Release => {
                    debug!("{} released", input);
                    if let Some(output) = held_output(action) {
                        if self.held.release(output) {
                            report(output.release(sink), "release");
                        }
                    }
                }
                RepeatDecision::Wait | RepeatDecision::Idle => {}
            }
        }
    }
}

/// Raw value and polarity sign of an axis binding, if it reads an axis present on the device.
fn axis_reading<D: DeviceSource + ?Sized>(device: &D, binding: &Binding) -> Option<(f32, f32)> {
    match binding.source {
        PhysicalSource::Axis(i) => read_axis(device, i).map(|raw| (raw, binding.polarity.sign())),
        PhysicalSource::Button(_) => None,
    }
}

/// Activity of a keyboard-mapper input: held button, or axis past the threshold on its side.
fn input_active<D: DeviceSource + ?Sized>(device: &D, input: &InputId, threshold: f32) -> bool {
    let binding = input.binding();
    match binding.source {
        PhysicalSource::Button(i) => read_button(device, i).unwrap_or(false),
        PhysicalSource::Axis(i) => read_axis(device, i)
            .map(|raw| deadzone::linear(raw, threshold) * binding.polarity.sign() > 0.0)
            .unwrap_or(false),
    }
}

fn held_output(action: &OutputAction) -> Option<HeldOutput> {
    match *action {
        OutputAction::KeyboardKey { key } => Some(HeldOutput::Key(key)),
        OutputAction::PointerButton { button } => Some(HeldOutput::PointerButton(button)),
        _ => None,
    }
}

fn fire<S: InjectionSink + ?Sized>(action: &OutputAction, first: bool, held: &mut HeldOutputs, sink: &mut S) {
    match *action {
        OutputAction::KeyboardKey { key } => {
            // Typematic: every fire is a fresh press
            if first {
                held.acquire(HeldOutput::Key(key));
            }
            report(sink.press_key(key), "press");
        }
        OutputAction::PointerButton { button } => {
            let output = HeldOutput::PointerButton(button);
            if first && held.acquire(output) {
                report(output.press(sink), "press");
            }
        }
        OutputAction::PointerDirection { direction } => {
            let (dx, dy) = direction.delta();
            report(sink.move_by(dx, dy), "move");
        }
        OutputAction::PointerMove { dx, dy } => report(sink.move_by(dx, dy), "move"),
        OutputAction::PointerScroll { amount } => report(sink.scroll_by(amount), "scroll"),
    }
}

fn report(result: Result<()>, what: &str) {
    if let Err(e) = result {
        warn!("Failed to inject {}: {}", what, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::device::mocks::{Frame, ScriptedDevice};
    use crate::mapping::action::{KeyCode, PointerButton};
    use crate::mapping::binding::Polarity;
    use crate::output::mocks::{OutputEvent, RecordingSink};
    use crate::output::MockInjectionSink;
    use mockall::predicate::eq;

    const TICK: Duration = Duration::from_millis(10);

    // Axis layout of the test pad: 0 LX, 1 LY, 2 RX, 3 RY, 4 L2, 5 R2
    fn pointer_profile() -> Profile {
        let mut profile = Profile::default();
        let controls = [
            (LogicalControl::RightStickVerticalNegative, Binding::axis(3, Polarity::Negative)),
            (LogicalControl::RightStickVerticalPositive, Binding::axis(3, Polarity::Positive)),
            (LogicalControl::RightStickHorizontalPositive, Binding::axis(2, Polarity::Positive)),
            (LogicalControl::RightStickHorizontalNegative, Binding::axis(2, Polarity::Negative)),
            (LogicalControl::LeftStickVerticalNegative, Binding::axis(1, Polarity::Negative)),
            (LogicalControl::LeftStickVerticalPositive, Binding::axis(1, Polarity::Positive)),
            (LogicalControl::LeftTriggerClick, Binding::axis(4, Polarity::Positive)),
            (LogicalControl::RightTriggerClick, Binding::axis(5, Polarity::Positive)),
            (LogicalControl::ButtonX1, Binding::button(2)),
            (LogicalControl::ButtonX2, Binding::button(3)),
        ];
        profile.controls.extend(controls);
        profile
    }

    fn rest() -> Frame {
        Frame::neutral(6, 8).with_axis(4, -1.0).with_axis(5, -1.0)
    }

    fn run(translator: &mut Translator, frames: &[Frame]) -> Vec<OutputEvent> {
        let mut device = ScriptedDevice::new(rest());
        let mut sink = RecordingSink::new();
        for frame in frames {
            device.push(frame.clone());
            device.poll_events();
            translator.tick(&device, &mut sink);
        }
        sink.take()
    }

    fn key(name: &str) -> KeyCode {
        name.parse().unwrap()
    }

    // ==================== Continuous Path Tests ====================

    #[test]
    fn test_resting_pad_emits_nothing() {
        let mut translator = Translator::new(pointer_profile(), TICK);
        let events = run(&mut translator, &vec![rest(); 50]);
        assert!(events.is_empty(), "unexpected events: {:?}", events);
    }

    #[test]
    fn test_pointer_motion_scaled_and_truncated() {
        let mut translator = Translator::new(pointer_profile(), TICK);
        // shape(0.6, 0.2) = 0.25 → 2.5 px → 2; shape(-1.0) = -1 → -10 px
        let events = run(&mut translator, &[rest().with_axis(2, 0.6).with_axis(3, -1.0)]);
        assert_eq!(events, vec![OutputEvent::Move { dx: 2, dy: -10 }]);
    }

    #[test]
    fn test_tiny_motion_truncates_to_nothing() {
        let mut translator = Translator::new(pointer_profile(), TICK);
        // shape(0.25, 0.2) ≈ 0.004 → 0.04 px
        let events = run(&mut translator, &[rest().with_axis(2, 0.25)]);
        assert!(events.is_empty());
    }

    #[test]
    fn test_motion_respects_calibrated_polarity() {
        let mut profile = pointer_profile();
        profile
            .controls
            .insert(LogicalControl::RightStickHorizontalPositive, Binding::axis(2, Polarity::Negative));
        let mut translator = Translator::new(profile, TICK);

        let events = run(&mut translator, &[rest().with_axis(2, 1.0)]);
        assert_eq!(events, vec![OutputEvent::Move { dx: -10, dy: 0 }]);
    }

    #[test]
    fn test_scroll_up_is_positive() {
        let mut translator = Translator::new(pointer_profile(), TICK);
        let events = run(&mut translator, &[rest().with_axis(1, -1.0)]);
        assert_eq!(events, vec![OutputEvent::Scroll(0.2)]);
    }

    #[test]
    fn test_scroll_uses_linear_deadzone() {
        let mut translator = Translator::new(pointer_profile(), TICK);
        let events = run(&mut translator, &[rest().with_axis(1, 0.5), rest().with_axis(1, 0.1)]);
        assert_eq!(events, vec![OutputEvent::Scroll(-0.5 * 0.2)]);
    }

    #[test]
    fn test_invert_scroll_flips_once() {
        let mut profile = pointer_profile();
        profile.tuning.invert_scroll = true;
        let mut translator = Translator::new(profile, TICK);
        let events = run(&mut translator, &[rest().with_axis(1, -1.0)]);
        assert_eq!(events, vec![OutputEvent::Scroll(-0.2)]);
    }

    #[test]
    fn test_missing_bindings_are_skipped() {
        let mut profile = Profile::default();
        profile.controls.insert(LogicalControl::ButtonX1, Binding::button(2));
        let mut translator = Translator::new(profile, TICK);

        // Sticks deflected but unbound
        let events = run(&mut translator, &[rest().with_axis(1, -1.0).with_axis(2, 1.0)]);
        assert!(events.is_empty());
    }

    #[test]
    fn test_out_of_range_binding_is_inactive() {
        let mut profile = Profile::default();
        profile.controls.insert(LogicalControl::ButtonX1, Binding::button(40));
        profile
            .controls
            .insert(LogicalControl::RightStickHorizontalPositive, Binding::axis(40, Polarity::Positive));
        let mut translator = Translator::new(profile, TICK);

        assert!(run(&mut translator, &[rest(), rest()]).is_empty());
    }

    // ==================== Click Tests ====================

    #[test]
    fn test_trigger_click_press_and_release() {
        let mut translator = Translator::new(pointer_profile(), TICK);
        let pulled = rest().with_axis(4, 1.0);
        let events = run(&mut translator, &[rest(), pulled.clone(), pulled.clone(), pulled, rest(), rest()]);
        assert_eq!(events, vec![
            OutputEvent::PressButton(PointerButton::Left),
            OutputEvent::ReleaseButton(PointerButton::Left),
        ]);
    }

    #[test]
    fn test_trigger_at_rest_is_not_a_click() {
        let mut translator = Translator::new(pointer_profile(), TICK);
        // Halfway pull is still negative: inactive for a positive binding
        let events = run(&mut translator, &[rest().with_axis(4, -0.3)]);
        assert!(events.is_empty());
    }

    #[test]
    fn test_button_clicks_map_to_x_buttons() {
        let mut translator = Translator::new(pointer_profile(), TICK);
        let events = run(&mut translator, &[
            rest().with_button(2, true),
            rest().with_button(2, true).with_button(3, true),
            rest(),
        ]);
        assert_eq!(events, vec![
            OutputEvent::PressButton(PointerButton::X1),
            OutputEvent::PressButton(PointerButton::X2),
            OutputEvent::ReleaseButton(PointerButton::X1),
            OutputEvent::ReleaseButton(PointerButton::X2),
        ]);
    }

    // ==================== Action Binding Tests ====================

    #[test]
    fn test_key_action_typematic_then_single_release() {
        let mut profile = Profile::default();
        profile.bind(InputId::button(0), "key:a".parse().unwrap());
        let mut translator = Translator::new(profile, TICK);

        let held = rest().with_button(0, true);
        let mut frames = vec![held; 72];
        frames.push(rest());
        frames.push(rest());

        let events = run(&mut translator, &frames);
        assert_eq!(events, vec![
            OutputEvent::PressKey(key("a")),
            OutputEvent::PressKey(key("a")),
            OutputEvent::ReleaseKey(key("a")),
        ]);
    }

    #[test]
    fn test_pointer_button_action_pressed_once() {
        let mut profile = Profile::default();
        profile.bind(InputId::button(1), "mouse_button:middle".parse().unwrap());
        let mut translator = Translator::new(profile, TICK);

        let mut frames = vec![rest().with_button(1, true); 200];
        frames.push(rest());
        let events = run(&mut translator, &frames);
        assert_eq!(events, vec![
            OutputEvent::PressButton(PointerButton::Middle),
            OutputEvent::ReleaseButton(PointerButton::Middle),
        ]);
    }

    #[test]
    fn test_direction_action_repeats_without_release() {
        let mut profile = Profile::default();
        profile.bind(InputId::axis(0, Polarity::Negative), "mouse:left".parse().unwrap());
        let mut translator = Translator::new(profile, TICK);

        let mut frames = vec![rest().with_axis(0, -0.9); 72];
        frames.push(rest());
        let events = run(&mut translator, &frames);
        assert_eq!(events, vec![OutputEvent::Move { dx: -20, dy: 0 }; 2]);
    }

    #[test]
    fn test_axis_action_uses_threshold_and_side() {
        let mut profile = Profile::default();
        profile.bind(InputId::axis(0, Polarity::Positive), "key:d".parse().unwrap());
        let mut translator = Translator::new(profile, TICK);

        // Below threshold, wrong side, then past threshold
        let events = run(&mut translator, &[
            rest().with_axis(0, 0.4),
            rest().with_axis(0, -0.9),
            rest().with_axis(0, 0.6),
        ]);
        assert_eq!(events, vec![OutputEvent::PressKey(key("d"))]);
    }

    #[test]
    fn test_release_within_one_tick_despite_cooldown() {
        let mut profile = Profile::default();
        profile.bind(InputId::button(0), "key:space".parse().unwrap());
        let mut translator = Translator::new(profile, TICK);

        let mut device = ScriptedDevice::new(rest());
        let mut sink = RecordingSink::new();

        device.push(rest().with_button(0, true));
        device.poll_events();
        translator.tick(&device, &mut sink);
        device.push(rest().with_button(0, true));
        device.poll_events();
        translator.tick(&device, &mut sink);
        assert!(!translator.states().get(&ControlId::Input(InputId::button(0))).unwrap().cooldown_remaining.is_zero());
        sink.take();

        device.push(rest());
        device.poll_events();
        translator.tick(&device, &mut sink);
        assert_eq!(sink.take(), vec![OutputEvent::ReleaseKey(key("space"))]);
    }

    #[test]
    fn test_shared_button_released_by_last_holder() {
        let mut profile = pointer_profile();
        profile.bind(InputId::button(5), "mouse_button:left".parse().unwrap());
        let mut translator = Translator::new(profile, TICK);

        let trigger = rest().with_axis(4, 1.0);
        let events = run(&mut translator, &[
            trigger.clone(),
            trigger.clone().with_button(5, true),
            rest().with_button(5, true),
            rest(),
        ]);
        assert_eq!(events, vec![
            OutputEvent::PressButton(PointerButton::Left),
            OutputEvent::ReleaseButton(PointerButton::Left),
        ]);
    }

    // ==================== Lifecycle Tests ====================

    #[test]
    fn test_release_all_frees_held_outputs() {
        let mut profile = pointer_profile();
        profile.bind(InputId::button(0), "key:w".parse().unwrap());
        let mut translator = Translator::new(profile, TICK);
        let mut device = ScriptedDevice::new(rest().with_axis(5, 1.0).with_button(0, true));
        let mut sink = RecordingSink::new();

        translator.tick(&device, &mut sink);
        assert!(translator.holds_outputs());
        sink.take();

        translator.release_all(&mut sink);
        let released = sink.take();
        assert_eq!(released.len(), 2);
        assert!(released.contains(&OutputEvent::ReleaseKey(key("w"))));
        assert!(released.contains(&OutputEvent::ReleaseButton(PointerButton::Right)));
        assert!(!translator.holds_outputs());
        assert!(translator.states().is_empty());

        // Still held after the reset: a fresh press, no spurious release
        device.poll_events();
        translator.tick(&device, &mut sink);
        let events = sink.take();
        assert!(events.iter().all(|e| !e.is_release()), "{:?}", events);
        assert!(events.contains(&OutputEvent::PressKey(key("w"))));
        assert!(events.contains(&OutputEvent::PressButton(PointerButton::Right)));
    }

    #[test]
    fn test_replace_profile_releases_and_switches() {
        let mut profile = Profile::default();
        profile.bind(InputId::button(0), "key:a".parse().unwrap());
        let mut translator = Translator::new(profile, TICK);
        let device = ScriptedDevice::new(rest().with_button(0, true));
        let mut sink = RecordingSink::new();
        translator.tick(&device, &mut sink);
        sink.take();

        let mut next = Profile::default();
        next.bind(InputId::button(0), "key:b".parse().unwrap());
        translator.replace_profile(next, &mut sink);
        translator.tick(&device, &mut sink);

        assert_eq!(sink.take(), vec![
            OutputEvent::ReleaseKey(key("a")),
            OutputEvent::PressKey(key("b")),
        ]);
    }

    #[test]
    fn test_same_samples_same_events() {
        let mut profile = pointer_profile();
        profile.bind(InputId::button(0), "key:a".parse().unwrap());
        let frames: Vec<Frame> = (0..300)
            .map(|i| {
                let phase = i as f32 / 300.0;
                rest()
                    .with_axis(2, (phase * 12.0).sin())
                    .with_axis(1, (phase * 7.0).cos())
                    .with_axis(4, if i % 50 < 20 { 1.0 } else { -1.0 })
                    .with_button(0, i % 120 < 90)
            })
            .collect();

        let first = run(&mut Translator::new(profile.clone(), TICK), &frames);
        let second = run(&mut Translator::new(profile, TICK), &frames);
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_sink_errors_do_not_stop_translation() {
        let mut translator = Translator::new(pointer_profile(), TICK);
        let mut device = ScriptedDevice::new(rest());
        let mut sink = RecordingSink { fail: true, ..RecordingSink::default() };

        device.push(rest().with_axis(4, 1.0));
        device.push(rest());
        device.poll_events();
        translator.tick(&device, &mut sink);
        device.poll_events();
        translator.tick(&device, &mut sink);

        assert_eq!(sink.take(), vec![
            OutputEvent::PressButton(PointerButton::Left),
            OutputEvent::ReleaseButton(PointerButton::Left),
        ]);
        assert!(!translator.holds_outputs());
    }

    #[test]
    fn test_click_calls_sink_exactly_once() {
        let mut profile = Profile::default();
        profile.controls.insert(LogicalControl::RightTriggerClick, Binding::axis(5, Polarity::Positive));
        let mut translator = Translator::new(profile, TICK);

        let mut sink = MockInjectionSink::new();
        sink.expect_press_pointer_button()
            .with(eq(PointerButton::Right))
            .times(1)
            .returning(|_| Ok(()));
        sink.expect_release_pointer_button().never();

        let pulled = ScriptedDevice::new(rest().with_axis(5, 0.9));
        for _ in 0..10 {
            translator.tick(&pulled, &mut sink);
        }
    }
}
