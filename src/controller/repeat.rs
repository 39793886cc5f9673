//! # Debounce/Repeat Governor
//!
//! Typematic timing for controls bound to discrete repeatable outputs.
//!
//! A control fires immediately when it becomes active, then again each time
//! its cooldown runs out. Every fire shortens the next cooldown by
//! `decay_per_step`, down to `min_interval`:
//!
//! ```text
//! cooldown = max(base_interval - repeat_step * decay_per_step, min_interval)
//! ```
//!
//! With the defaults (800 ms, 100 ms, 100 ms) the floor is reached on the
//! seventh fire. Cooldowns are counted down by the fixed tick period, never
//! by the wall clock, so the governor is deterministic under test.
//!
//! Deactivation releases at once, whatever cooldown is pending.

use std::time::Duration;

use crate::engine::state::ControlState;
use crate::mapping::profile::RepeatTuning;

/// What the caller should do with the bound action this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatDecision {
    /// Fire the action. `first` is set on the fire that starts an activation.
    Fire { first: bool },
    /// Active, cooling down.
    Wait,
    /// Just deactivated after firing: release whatever the action holds.
    Release,
    /// Inactive and nothing to release.
    Idle,
}

/// Applies repeat timing to a control's runtime state.
#[derive(Debug, Clone, Copy)]
pub struct RepeatGovernor {
    base_interval: Duration,
    decay_per_step: Duration,
    min_interval: Duration,
    tick: Duration,
}

impl RepeatGovernor {
    /// Creates a governor ticking at `tick`.
    #[must_use]
    pub fn new(tuning: &RepeatTuning, tick: Duration) -> Self {
        Self {
            base_interval: tuning.base_interval(),
            decay_per_step: tuning.decay_per_step(),
            min_interval: tuning.min_interval(),
            tick,
        }
    }

    /// Tick period the cooldown is decremented by.
    #[must_use]
    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Cooldown armed after the `step`-th fire of an activation.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use pad_bridge::controller::repeat::RepeatGovernor;
    /// use pad_bridge::mapping::profile::RepeatTuning;
    ///
    /// let governor = RepeatGovernor::new(&RepeatTuning::default(), Duration::from_millis(10));
    /// assert_eq!(governor.interval_for_step(1), Duration::from_millis(700));
    /// assert_eq!(governor.interval_for_step(7), Duration::from_millis(100));
    /// assert_eq!(governor.interval_for_step(30), Duration::from_millis(100));
    /// ```
    #[must_use]
    pub fn interval_for_step(&self, step: u32) -> Duration {
        self.base_interval
            .saturating_sub(self.decay_per_step.saturating_mul(step))
            .max(self.min_interval)
    }

    /// Advances one control by one tick.
    pub fn step(&self, state: &mut ControlState, active: bool) -> RepeatDecision {
        if !active {
            let was_firing = state.last_active;
            state.reset();
            return if was_firing {
                RepeatDecision::Release
            } else {
                RepeatDecision::Idle
            };
        }

        if state.cooldown_remaining.is_zero() {
            let first = !state.last_active;
            state.repeat_step = state.repeat_step.saturating_add(1);
            state.cooldown_remaining = self.interval_for_step(state.repeat_step);
            state.last_active = true;
            RepeatDecision::Fire { first }
        } else {
            state.cooldown_remaining = state.cooldown_remaining.saturating_sub(self.tick);
            RepeatDecision::Wait
        }
    }
}
