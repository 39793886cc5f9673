//! # Deadzone Module
//!
//! Shapes raw axis readings before they reach the translation paths.
//!
//! ## Variants
//!
//! Two deadzone variants exist:
//!
//! - [`shape`]: graduated response. Values inside the deadzone map to `0.0`;
//!   the remaining band is rescaled to `0..1` and squared, so small stick
//!   deflections give fine pointer control while full deflection still
//!   reaches `±1.0`. Used for pointer movement and axis-backed clicks.
//! - [`linear`]: binary decisions. Values inside the deadzone map to `0.0`,
//!   everything else passes through unchanged. Used where the caller compares
//!   the raw magnitude against a threshold (calibration prompts, scroll,
//!   keyboard-mapper axes).
//!
//! ## Usage
//!
//! ```
//! use pad_bridge::controller::deadzone::{shape, linear};
//!
//! // Inside the deadzone both variants are silent
//! assert_eq!(shape(0.1, 0.2), 0.0);
//! assert_eq!(linear(0.1, 0.2), 0.0);
//!
//! // Outside, shape curves the response while linear keeps the raw value
//! assert!((shape(0.6, 0.2) - 0.25).abs() < 1e-6);
//! assert_eq!(linear(0.6, 0.2), 0.6);
//! ```

/// Largest accepted deadzone.
pub const MAX_DEADZONE: f32 = 0.5;

/// Applies the deadzone and quadratic response curve to a raw axis value.
///
/// # Arguments
///
/// * `raw` - Raw axis value (-1.0 to 1.0)
/// * `deadzone` - Deadzone fraction (0.0 to 0.5). Values outside this range are clamped.
///
/// # Returns
///
/// Shaped value (-1.0 to 1.0) with the sign of `raw`, or `0.0` inside the deadzone.
///
/// # Examples
///
/// ```
/// use pad_bridge::controller::deadzone::shape;
///
/// assert_eq!(shape(-0.2, 0.2), 0.0);
/// assert!((shape(1.0, 0.2) - 1.0).abs() < 1e-6);
/// assert!((shape(-1.0, 0.2) + 1.0).abs() < 1e-6);
/// ```
#[must_use]
pub fn shape(raw: f32, deadzone: f32) -> f32 {
    let deadzone = deadzone.clamp(0.0, MAX_DEADZONE);
    let magnitude = raw.abs().min(1.0);

    if magnitude <= deadzone {
        return 0.0;
    }

    let normalized = (magnitude - deadzone) / (1.0 - deadzone);
    normalized * normalized * raw.signum()
}

/// Applies the legacy linear deadzone used for threshold comparisons.
///
/// Returns `raw` untouched when it leaves the deadzone, `0.0` otherwise.
///
/// # Examples
///
/// ```
/// use pad_bridge::controller::deadzone::linear;
///
/// assert_eq!(linear(0.15, 0.2), 0.0);
/// assert_eq!(linear(-0.7, 0.2), -0.7);
/// ```
#[must_use]
pub fn linear(raw: f32, deadzone: f32) -> f32 {
    if raw.abs() > deadzone {
        raw
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== shape() Tests ====================

    #[test]
    fn test_shape_zero_inside_deadzone() {
        for dz in [0.0_f32, 0.05, 0.2, 0.35, 0.5] {
            let mut v = -dz;
            while v <= dz {
                assert_eq!(shape(v, dz), 0.0, "shape({}, {}) should be 0", v, dz);
                v += 0.01;
            }
        }
    }

    #[test]
    fn test_shape_at_deadzone_boundary() {
        assert_eq!(shape(0.2, 0.2), 0.0);
        assert_eq!(shape(-0.2, 0.2), 0.0);
    }

    #[test]
    fn test_shape_full_deflection_reaches_unit() {
        for dz in [0.0_f32, 0.1, 0.2, 0.3, 0.5] {
            assert!((shape(1.0, dz) - 1.0).abs() < 1e-6);
            assert!((shape(-1.0, dz) + 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_shape_monotonic_outside_deadzone() {
        let dz = 0.2;
        let mut previous = 0.0;
        let mut v = 0.21_f32;
        while v <= 1.0 {
            let shaped = shape(v, dz);
            assert!(shaped > previous, "shape should grow: {} -> {}", previous, shaped);
            assert!((shape(-v, dz) + shaped).abs() < 1e-6, "shape should be odd");
            previous = shaped;
            v += 0.01;
        }
    }

    #[test]
    fn test_shape_quadratic_curve() {
        // Halfway through the live band gives a quarter of the output
        let result = shape(0.6, 0.2);
        assert!((result - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_shape_clamps_deadzone() {
        // Deadzone above 0.5 behaves like 0.5
        assert_eq!(shape(0.45, 0.9), 0.0);
        assert!(shape(0.6, 0.9) > 0.0);

        // Negative deadzone behaves like 0.0
        assert!((shape(0.5, -1.0) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_shape_clamps_out_of_range_input() {
        assert!((shape(1.4, 0.2) - 1.0).abs() < 1e-6);
        assert!((shape(-3.0, 0.2) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_shape_is_pure() {
        assert_eq!(shape(0.37, 0.13), shape(0.37, 0.13));
    }

    // ==================== linear() Tests ====================

    #[test]
    fn test_linear_inside_deadzone() {
        assert_eq!(linear(0.0, 0.2), 0.0);
        assert_eq!(linear(0.2, 0.2), 0.0);
        assert_eq!(linear(-0.19, 0.2), 0.0);
    }

    #[test]
    fn test_linear_passes_raw_value() {
        assert_eq!(linear(0.21, 0.2), 0.21);
        assert_eq!(linear(-1.0, 0.2), -1.0);
    }

    #[test]
    fn test_variants_differ_outside_deadzone() {
        // Same input, graduated vs raw magnitude
        assert!(shape(0.5, 0.2) < linear(0.5, 0.2));
    }
}
