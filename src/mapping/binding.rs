//! # Bindings
//!
//! Links between logical controls and the physical axis or button that drives them.
//!
//! ## Logical Controls
//!
//! | Control | Typical source | Role |
//! |---------|----------------|------|
//! | `right_stick_vertical_negative` | right stick Y, −1 | calibration only |
//! | `right_stick_vertical_positive` | right stick Y, +1 | pointer Y |
//! | `right_stick_horizontal_positive` | right stick X, +1 | pointer X |
//! | `right_stick_horizontal_negative` | right stick X, −1 | calibration only |
//! | `left_stick_vertical_negative` | left stick Y, −1 | scroll |
//! | `left_stick_vertical_positive` | left stick Y, +1 | calibration only |
//! | `left_trigger_click` | trigger axis, +1 | left click |
//! | `right_trigger_click` | trigger axis, +1 | right click |
//! | `button_x1` | face button | back (X1) |
//! | `button_x2` | face button | forward (X2) |
//!
//! ## Input Ids
//!
//! The keyboard mapper binds actions to raw inputs written as
//! `axis:<index>:<±1>` or `button:<index>`; see [`InputId`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PadBridgeError;
use crate::mapping::action::PointerButton;

/// Named role of a calibrated control in the pointer mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalControl {
    RightStickVerticalNegative,
    RightStickVerticalPositive,
    RightStickHorizontalPositive,
    RightStickHorizontalNegative,
    LeftStickVerticalNegative,
    LeftStickVerticalPositive,
    LeftTriggerClick,
    RightTriggerClick,
    ButtonX1,
    ButtonX2,
}

impl LogicalControl {
    /// Every logical control, in calibration order.
    pub const ALL: [LogicalControl; 10] = [
        LogicalControl::RightStickVerticalNegative,
        LogicalControl::RightStickVerticalPositive,
        LogicalControl::RightStickHorizontalPositive,
        LogicalControl::RightStickHorizontalNegative,
        LogicalControl::LeftStickVerticalNegative,
        LogicalControl::LeftStickVerticalPositive,
        LogicalControl::LeftTriggerClick,
        LogicalControl::RightTriggerClick,
        LogicalControl::ButtonX1,
        LogicalControl::ButtonX2,
    ];

    /// Persisted name, e.g. `left_trigger_click`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalControl::RightStickVerticalNegative => "right_stick_vertical_negative",
            LogicalControl::RightStickVerticalPositive => "right_stick_vertical_positive",
            LogicalControl::RightStickHorizontalPositive => "right_stick_horizontal_positive",
            LogicalControl::RightStickHorizontalNegative => "right_stick_horizontal_negative",
            LogicalControl::LeftStickVerticalNegative => "left_stick_vertical_negative",
            LogicalControl::LeftStickVerticalPositive => "left_stick_vertical_positive",
            LogicalControl::LeftTriggerClick => "left_trigger_click",
            LogicalControl::RightTriggerClick => "right_trigger_click",
            LogicalControl::ButtonX1 => "button_x1",
            LogicalControl::ButtonX2 => "button_x2",
        }
    }

    /// Pointer button a click control presses, if it is one.
    #[must_use]
    pub fn click_button(&self) -> Option<PointerButton> {
        match self {
            LogicalControl::LeftTriggerClick => Some(PointerButton::Left),
            LogicalControl::RightTriggerClick => Some(PointerButton::Right),
            LogicalControl::ButtonX1 => Some(PointerButton::X1),
            LogicalControl::ButtonX2 => Some(PointerButton::X2),
            _ => None,
        }
    }
}

impl fmt::Display for LogicalControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical input on the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhysicalSource {
    Axis(u16),
    Button(u16),
}

impl PhysicalSource {
    /// Device-local index of the axis or button.
    #[must_use]
    pub fn index(&self) -> u16 {
        match self {
            PhysicalSource::Axis(i) | PhysicalSource::Button(i) => *i,
        }
    }
}

/// Which direction of axis travel counts as active.
///
/// Persisted as `1`, `-1` or `0` (no polarity, buttons).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum Polarity {
    Positive,
    Negative,
    #[default]
    None,
}

impl Polarity {
    /// Polarity matching the sign of an axis reading.
    #[must_use]
    pub fn of(value: f32) -> Self {
        if value > 0.0 {
            Polarity::Positive
        } else {
            Polarity::Negative
        }
    }

    /// Multiplier for axis values. `None` behaves as positive.
    #[must_use]
    pub fn sign(&self) -> f32 {
        match self {
            Polarity::Negative => -1.0,
            Polarity::Positive | Polarity::None => 1.0,
        }
    }
}

impl From<Polarity> for i8 {
    fn from(polarity: Polarity) -> Self {
        match polarity {
            Polarity::Positive => 1,
            Polarity::Negative => -1,
            Polarity::None => 0,
        }
    }
}

impl TryFrom<i8> for Polarity {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Polarity::Positive),
            -1 => Ok(Polarity::Negative),
            0 => Ok(Polarity::None),
            other => Err(format!("polarity must be 1, -1 or 0, got {}", other)),
        }
    }
}

/// Physical source and polarity recorded for a logical control.
///
/// Bindings are immutable: recalibration or removal replaces the whole entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Binding {
    pub source: PhysicalSource,
    #[serde(default)]
    pub polarity: Polarity,
}

impl Binding {
    /// Axis binding with the given polarity.
    #[must_use]
    pub fn axis(index: u16, polarity: Polarity) -> Self {
        Self {
            source: PhysicalSource::Axis(index),
            polarity,
        }
    }

    /// Button binding (no polarity).
    #[must_use]
    pub fn button(index: u16) -> Self {
        Self {
            source: PhysicalSource::Button(index),
            polarity: Polarity::None,
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pol = match self.polarity {
            Polarity::Positive => "1",
            Polarity::Negative => "-1",
            Polarity::None => "none",
        };
        match self.source {
            PhysicalSource::Axis(i) => write!(f, "axis idx={}, pol={}", i, pol),
            PhysicalSource::Button(i) => write!(f, "button idx={}, pol={}", i, pol),
        }
    }
}

/// Raw input key of the keyboard mapper.
///
/// Textual form: `axis:<index>:<1|-1>` or `button:<index>`.
///
/// # Examples
///
/// ```
/// use pad_bridge::mapping::binding::{InputId, Polarity};
///
/// let id: InputId = "axis:3:-1".parse().unwrap();
/// assert_eq!(id.binding().polarity, Polarity::Negative);
/// assert_eq!(id.to_string(), "axis:3:-1");
///
/// let id: InputId = "button:7".parse().unwrap();
/// assert_eq!(id.to_string(), "button:7");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InputId(Binding);

impl InputId {
    /// Axis input active on the `polarity` side.
    #[must_use]
    pub fn axis(index: u16, polarity: Polarity) -> Self {
        let polarity = match polarity {
            Polarity::None => Polarity::Positive,
            other => other,
        };
        InputId(Binding::axis(index, polarity))
    }

    /// Button input.
    #[must_use]
    pub fn button(index: u16) -> Self {
        InputId(Binding::button(index))
    }

    /// Source and polarity this input reads.
    #[must_use]
    pub fn binding(&self) -> Binding {
        self.0
    }
}

impl PartialOrd for Binding {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Binding {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.source, self.polarity).cmp(&(other.source, other.polarity))
    }
}

impl fmt::Display for InputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.0.source, self.0.polarity) {
            (PhysicalSource::Axis(i), Polarity::Negative) => write!(f, "axis:{}:-1", i),
            (PhysicalSource::Axis(i), _) => write!(f, "axis:{}:1", i),
            (PhysicalSource::Button(i), _) => write!(f, "button:{}", i),
        }
    }
}

impl FromStr for InputId {
    type Err = PadBridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PadBridgeError::InvalidInputId(s.to_string());
        let parts: Vec<&str> = s.trim().split(':').collect();

        match parts.as_slice() {
            ["axis", index, polarity] => {
                let index = index.parse::<u16>().map_err(|_| invalid())?;
                let polarity = match *polarity {
                    "1" | "+1" => Polarity::Positive,
                    "-1" => Polarity::Negative,
                    _ => return Err(invalid()),
                };
                Ok(InputId::axis(index, polarity))
            }
            ["button", index] => {
                let index = index.parse::<u16>().map_err(|_| invalid())?;
                Ok(InputId::button(index))
            }
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for InputId {
    type Error = PadBridgeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InputId> for String {
    fn from(id: InputId) -> Self {
        id.to_string()
    }
}

/// Key of the per-control runtime state table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ControlId {
    Logical(LogicalControl),
    Input(InputId),
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== LogicalControl Tests ====================

    #[test]
    fn test_logical_control_names_match_serde() {
        for control in LogicalControl::ALL {
            let json = serde_json::to_string(&control).unwrap();
            assert_eq!(json, format!("\"{}\"", control.as_str()));
        }
    }

    #[test]
    fn test_click_buttons() {
        assert_eq!(LogicalControl::LeftTriggerClick.click_button(), Some(PointerButton::Left));
        assert_eq!(LogicalControl::RightTriggerClick.click_button(), Some(PointerButton::Right));
        assert_eq!(LogicalControl::ButtonX1.click_button(), Some(PointerButton::X1));
        assert_eq!(LogicalControl::ButtonX2.click_button(), Some(PointerButton::X2));
        assert_eq!(LogicalControl::LeftStickVerticalNegative.click_button(), None);
    }

    // ==================== Polarity Tests ====================

    #[test]
    fn test_polarity_of_value() {
        assert_eq!(Polarity::of(0.7), Polarity::Positive);
        assert_eq!(Polarity::of(-0.7), Polarity::Negative);
    }

    #[test]
    fn test_polarity_sign() {
        assert_eq!(Polarity::Positive.sign(), 1.0);
        assert_eq!(Polarity::Negative.sign(), -1.0);
        assert_eq!(Polarity::None.sign(), 1.0);
    }

    #[test]
    fn test_polarity_serde() {
        assert_eq!(serde_json::to_string(&Polarity::Negative).unwrap(), "-1");
        assert_eq!(serde_json::from_str::<Polarity>("0").unwrap(), Polarity::None);
        assert!(serde_json::from_str::<Polarity>("2").is_err());
    }

    // ==================== Binding Tests ====================

    #[test]
    fn test_binding_json_shape() {
        let json = serde_json::to_string(&Binding::axis(3, Polarity::Negative)).unwrap();
        assert_eq!(json, r#"{"source":{"axis":3},"polarity":-1}"#);

        let parsed: Binding = serde_json::from_str(r#"{"source":{"button":2}}"#).unwrap();
        assert_eq!(parsed, Binding::button(2));
    }

    #[test]
    fn test_binding_display() {
        assert_eq!(Binding::axis(0, Polarity::Negative).to_string(), "axis idx=0, pol=-1");
        assert_eq!(Binding::button(2).to_string(), "button idx=2, pol=none");
    }

    // ==================== InputId Tests ====================

    #[test]
    fn test_input_id_parse() {
        assert_eq!("axis:1:1".parse::<InputId>().unwrap(), InputId::axis(1, Polarity::Positive));
        assert_eq!("axis:1:+1".parse::<InputId>().unwrap(), InputId::axis(1, Polarity::Positive));
        assert_eq!("axis:4:-1".parse::<InputId>().unwrap(), InputId::axis(4, Polarity::Negative));
        assert_eq!(" button:12 ".parse::<InputId>().unwrap(), InputId::button(12));
    }

    #[test]
    fn test_input_id_rejects_garbage() {
        for bad in ["", "axis", "axis:1", "axis:x:1", "axis:1:0", "button:-1", "hat:0", "button:1:1"] {
            match bad.parse::<InputId>() {
                Err(PadBridgeError::InvalidInputId(msg)) => assert_eq!(msg, bad),
                other => panic!("Expected InvalidInputId for {:?}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_input_id_axis_without_polarity_is_positive() {
        assert_eq!(InputId::axis(2, Polarity::None).to_string(), "axis:2:1");
    }

    #[test]
    fn test_input_id_as_map_key() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(InputId::button(3), 1);
        map.insert(InputId::axis(0, Polarity::Negative), 2);

        let json = serde_json::to_string(&map).unwrap();
        let back: std::collections::BTreeMap<InputId, i32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
