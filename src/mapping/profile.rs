//! # Profile
//!
//! The active mapping: calibrated pointer controls, keyboard-mapper action
//! bindings and the scalar tuning the translation loop runs with.
//!
//! A profile is an explicit value handed to the translation loop at start and
//! swapped only between ticks; nothing mutates it while the loop reads it.

use chrono::{DateTime, Utc};
use serde::de::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::controller::deadzone::MAX_DEADZONE;
use crate::error::{PadBridgeError, Result};
use crate::mapping::action::OutputAction;
use crate::mapping::binding::{Binding, InputId, LogicalControl};

/// Current persisted profile format.
pub const PROFILE_VERSION: u32 = 1;

/// Typematic timing of discrete actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatTuning {
    #[serde(default = "default_base_interval_ms")]
    pub base_interval_ms: u64,

    #[serde(default = "default_decay_per_step_ms")]
    pub decay_per_step_ms: u64,

    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
}

impl RepeatTuning {
    pub fn base_interval(&self) -> Duration {
        Duration::from_millis(self.base_interval_ms)
    }

    pub fn decay_per_step(&self) -> Duration {
        Duration::from_millis(self.decay_per_step_ms)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

impl Default for RepeatTuning {
    fn default() -> Self {
        Self {
            base_interval_ms: default_base_interval_ms(),
            decay_per_step_ms: default_decay_per_step_ms(),
            min_interval_ms: default_min_interval_ms(),
        }
    }
}

/// Scalar parameters of the translation paths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tuning {
    #[serde(default = "default_deadzone")]
    pub deadzone: f32,

    /// Pixels per tick at full deflection
    #[serde(default = "default_mouse_speed")]
    pub mouse_speed: f32,

    /// Wheel clicks per tick at full deflection
    #[serde(default = "default_scroll_clicks_per")]
    pub scroll_clicks_per: f32,

    #[serde(default)]
    pub invert_scroll: bool,

    /// Raw magnitude an action-bound axis must exceed to count as active
    #[serde(default = "default_axis_threshold")]
    pub axis_threshold: f32,

    #[serde(flatten)]
    pub repeat: RepeatTuning,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            deadzone: default_deadzone(),
            mouse_speed: default_mouse_speed(),
            scroll_clicks_per: default_scroll_clicks_per(),
            invert_scroll: false,
            axis_threshold: default_axis_threshold(),
            repeat: RepeatTuning::default(),
        }
    }
}

fn default_deadzone() -> f32 { 0.2 }
fn default_mouse_speed() -> f32 { 10.0 }
fn default_scroll_clicks_per() -> f32 { 0.2 }
fn default_axis_threshold() -> f32 { 0.5 }

fn default_base_interval_ms() -> u64 { 800 }
fn default_decay_per_step_ms() -> u64 { 100 }
fn default_min_interval_ms() -> u64 { 100 }

fn default_version() -> u32 { PROFILE_VERSION }

impl Tuning {
    /// Checks every parameter against its accepted range.
    ///
    /// # Errors
    ///
    /// Returns [`PadBridgeError::Mapping`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let ranges = [
            ("deadzone", self.deadzone, 0.0, MAX_DEADZONE),
            ("mouse_speed", self.mouse_speed, 1.0, 50.0),
            ("scroll_clicks_per", self.scroll_clicks_per, 0.01, 1.0),
            ("axis_threshold", self.axis_threshold, 0.05, 0.95),
        ];
        for (name, value, min, max) in ranges {
            if !(min..=max).contains(&value) {
                return Err(invalid(format!("{} must be between {} and {}", name, min, max)));
            }
        }

        if self.repeat.min_interval_ms == 0 {
            return Err(invalid("min_interval_ms must be greater than 0"));
        }

        if self.repeat.min_interval_ms > self.repeat.base_interval_ms {
            return Err(invalid("min_interval_ms must not exceed base_interval_ms"));
        }

        Ok(())
    }
}

fn invalid(msg: impl std::fmt::Display) -> PadBridgeError {
    PadBridgeError::Mapping(serde_json::Error::custom(msg))
}

/// Complete persisted mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default = "default_version")]
    pub version: u32,

    /// When the pointer controls were last calibrated
    #[serde(default)]
    pub calibrated_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub tuning: Tuning,

    /// Calibrated pointer controls
    #[serde(default)]
    pub controls: BTreeMap<LogicalControl, Binding>,

    /// Keyboard-mapper bindings, at most one action per input
    #[serde(default)]
    pub actions: BTreeMap<InputId, OutputAction>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            version: PROFILE_VERSION,
            calibrated_at: None,
            tuning: Tuning::default(),
            controls: BTreeMap::new(),
            actions: BTreeMap::new(),
        }
    }
}

impl Profile {
    /// `true` when nothing is bound at all.
    pub fn is_empty(&self) -> bool {
        self.controls.is_empty() && self.actions.is_empty()
    }

    /// Binding of a logical control, if calibrated.
    pub fn control(&self, control: LogicalControl) -> Option<&Binding> {
        self.controls.get(&control)
    }

    /// Binds `action` to `input`, returning the action it replaces.
    pub fn bind(&mut self, input: InputId, action: OutputAction) -> Option<OutputAction> {
        self.actions.insert(input, action)
    }

    /// Removes the action bound to `input`. Returns whether one was bound.
    pub fn unbind(&mut self, input: &InputId) -> bool {
        self.actions.remove(input).is_some()
    }

    /// Replaces every calibrated control with `controls`, stamping the time.
    ///
    /// Action bindings and tuning are left alone.
    pub fn replace_controls(&mut self, controls: BTreeMap<LogicalControl, Binding>) {
        self.controls = controls;
        self.calibrated_at = Some(Utc::now());
    }

    /// Human-readable listing, one binding per line.
    pub fn describe(&self) -> Vec<String> {
        let controls = self
            .controls
            .iter()
            .map(|(control, binding)| format!("{}: {}", control, binding));
        let actions = self
            .actions
            .iter()
            .map(|(input, action)| format!("{} → {}", input, action));
        controls.chain(actions).collect()
    }

    /// Validates tuning and the profile version.
    ///
    /// Bound indices are not checked: they are device-local, and an index the
    /// open controller lacks reads as neutral.
    ///
    /// # Errors
    ///
    /// Returns [`PadBridgeError::Mapping`] if any value is out of range.
    pub fn validate(&self) -> Result<()> {
        self.tuning.validate()?;

        if self.version > PROFILE_VERSION {
            return Err(invalid(format!(
                "profile version {} is newer than supported version {}",
                self.version, PROFILE_VERSION
            )));
        }

        Ok(())
    }
}
