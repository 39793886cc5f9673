//! # Loop State
//!
//! Lifecycle of the translation loop and the per-control runtime state it owns.

use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::mapping::binding::ControlId;

/// Translation loop lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// No controller; waiting for one to appear
    Disconnected,
    /// A controller was (re)opened, translation resumes next tick
    Connected,
    /// Translating samples into output events
    Running,
    /// Worker exited
    Stopped,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoopState::Disconnected => "disconnected",
            LoopState::Connected => "connected",
            LoopState::Running => "running",
            LoopState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Snapshot published on every state transition.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopStatus {
    pub state: LoopState,
    /// Name of the open controller, if any
    pub device_name: Option<String>,
    /// When `state` was entered
    pub since: DateTime<Local>,
}

impl LoopStatus {
    pub fn new(state: LoopState, device_name: Option<String>) -> Self {
        Self {
            state,
            device_name,
            since: Local::now(),
        }
    }
}

/// Runtime state of one bound control. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlState {
    pub last_active: bool,
    pub cooldown_remaining: Duration,
    pub repeat_step: u32,
}

impl ControlState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Per-control state table, allocated lazily on first sight of a control.
#[derive(Debug, Default)]
pub struct ControlStates {
    states: BTreeMap<ControlId, ControlState>,
}

impl ControlStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of `id`, created zeroed if not seen before.
    pub fn entry(&mut self, id: ControlId) -> &mut ControlState {
        self.states.entry(id).or_default()
    }

    pub fn get(&self, id: &ControlId) -> Option<&ControlState> {
        self.states.get(id)
    }

    /// Forgets everything, as after a reconnect or mapping change.
    pub fn clear(&mut self) {
        self.states.clear();
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
