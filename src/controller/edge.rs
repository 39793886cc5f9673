//! # Edge Detector
//!
//! Turns a sampled "active" level into press/release transitions.
//!
//! The detector itself is stateless: the caller supplies the prior level,
//! which lives in the per-control runtime state (see
//! [`crate::engine::state::ControlStates`]). One control's history therefore
//! never leaks into another's.

use crate::controller::deadzone;

/// Level transition of a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Inactive → active.
    Pressed,
    /// Active → inactive.
    Released,
}

/// Compares the current level with the previous one.
///
/// # Examples
///
/// ```
/// use pad_bridge::controller::edge::{detect, Edge};
///
/// assert_eq!(detect(true, false), Some(Edge::Pressed));
/// assert_eq!(detect(false, true), Some(Edge::Released));
/// assert_eq!(detect(true, true), None);
/// assert_eq!(detect(false, false), None);
/// ```
#[must_use]
pub fn detect(active_now: bool, prior_active: bool) -> Option<Edge> {
    match (active_now, prior_active) {
        (true, false) => Some(Edge::Pressed),
        (false, true) => Some(Edge::Released),
        _ => None,
    }
}

/// Whether an axis used as a pseudo-button counts as pressed.
///
/// The calibrated sign picks which half of the axis is "pressed".
#[must_use]
pub fn axis_active(raw: f32, polarity_sign: f32, deadzone: f32) -> bool {
    deadzone::shape(raw, deadzone) * polarity_sign > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feeds a level sequence through the detector the way the loop does.
    fn run(levels: &[bool]) -> Vec<Edge> {
        let mut prior = false;
        let mut edges = Vec::new();
        for &level in levels {
            if let Some(edge) = detect(level, prior) {
                edges.push(edge);
            }
            prior = level;
        }
        edges
    }

    #[test]
    fn test_single_press_for_held_run() {
        let edges = run(&[false, true, true, true]);
        assert_eq!(edges, vec![Edge::Pressed]);
    }

    #[test]
    fn test_single_release_for_released_run() {
        let edges = run(&[true, false, false]);
        assert_eq!(edges, vec![Edge::Pressed, Edge::Released]);
    }

    #[test]
    fn test_tick_count_does_not_matter() {
        let mut levels = vec![false; 5];
        levels.extend(vec![true; 250]);
        levels.extend(vec![false; 400]);
        assert_eq!(run(&levels), vec![Edge::Pressed, Edge::Released]);
    }

    #[test]
    fn test_axis_active_respects_polarity() {
        // Trigger calibrated positive
        assert!(axis_active(0.8, 1.0, 0.2));
        assert!(!axis_active(-1.0, 1.0, 0.2));

        // Axis calibrated negative
        assert!(axis_active(-0.8, -1.0, 0.2));
        assert!(!axis_active(0.8, -1.0, 0.2));
    }

    #[test]
    fn test_axis_active_ignores_deadzone_noise() {
        assert!(!axis_active(0.15, 1.0, 0.2));
        assert!(!axis_active(-0.15, -1.0, 0.2));
    }
}
