//! # Output Actions
//!
//! Tagged outputs an input can be bound to, resolved from their textual
//! descriptor once at binding time.
//!
//! ## Descriptors
//!
//! | Descriptor | Action |
//! |------------|--------|
//! | `key:<name>` or `<name>` | [`OutputAction::KeyboardKey`] |
//! | `mouse_button:<left\|right\|middle\|x1\|x2>` | [`OutputAction::PointerButton`] |
//! | `mouse:<up\|down\|left\|right>` | [`OutputAction::PointerDirection`] |
//! | `move:<dx>,<dy>` | [`OutputAction::PointerMove`] |
//! | `scroll:<amount>` | [`OutputAction::PointerScroll`] |

use evdev::Key;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{PadBridgeError, Result};

/// Pixels moved by one [`OutputAction::PointerDirection`] fire.
pub const DIRECTION_STEP_PX: i32 = 20;

/// Highest keyboard key code (`KEY_MICMUTE`); the virtual device advertises `1..=LAST_KEYBOARD_CODE`.
pub const LAST_KEYBOARD_CODE: u16 = 248;

/// Named keys accepted in descriptors, with their Linux key codes.
const KEY_NAMES: &[(&str, Key)] = &[
    ("a", Key::KEY_A),
    ("b", Key::KEY_B),
    ("c", Key::KEY_C),
    ("d", Key::KEY_D),
    ("e", Key::KEY_E),
    ("f", Key::KEY_F),
    ("g", Key::KEY_G),
    ("h", Key::KEY_H),
    ("i", Key::KEY_I),
    ("j", Key::KEY_J),
    ("k", Key::KEY_K),
    ("l", Key::KEY_L),
    ("m", Key::KEY_M),
    ("n", Key::KEY_N),
    ("o", Key::KEY_O),
    ("p", Key::KEY_P),
    ("q", Key::KEY_Q),
    ("r", Key::KEY_R),
    ("s", Key::KEY_S),
    ("t", Key::KEY_T),
    ("u", Key::KEY_U),
    ("v", Key::KEY_V),
    ("w", Key::KEY_W),
    ("x", Key::KEY_X),
    ("y", Key::KEY_Y),
    ("z", Key::KEY_Z),
    ("0", Key::KEY_0),
    ("1", Key::KEY_1),
    ("2", Key::KEY_2),
    ("3", Key::KEY_3),
    ("4", Key::KEY_4),
    ("5", Key::KEY_5),
    ("6", Key::KEY_6),
    ("7", Key::KEY_7),
    ("8", Key::KEY_8),
    ("9", Key::KEY_9),
    ("f1", Key::KEY_F1),
    ("f2", Key::KEY_F2),
    ("f3", Key::KEY_F3),
    ("f4", Key::KEY_F4),
    ("f5", Key::KEY_F5),
    ("f6", Key::KEY_F6),
    ("f7", Key::KEY_F7),
    ("f8", Key::KEY_F8),
    ("f9", Key::KEY_F9),
    ("f10", Key::KEY_F10),
    ("f11", Key::KEY_F11),
    ("f12", Key::KEY_F12),
    ("space", Key::KEY_SPACE),
    ("enter", Key::KEY_ENTER),
    ("return", Key::KEY_ENTER),
    ("escape", Key::KEY_ESC),
    ("esc", Key::KEY_ESC),
    ("tab", Key::KEY_TAB),
    ("backspace", Key::KEY_BACKSPACE),
    ("delete", Key::KEY_DELETE),
    ("insert", Key::KEY_INSERT),
    ("home", Key::KEY_HOME),
    ("end", Key::KEY_END),
    ("page_up", Key::KEY_PAGEUP),
    ("prior", Key::KEY_PAGEUP),
    ("page_down", Key::KEY_PAGEDOWN),
    ("next", Key::KEY_PAGEDOWN),
    ("up", Key::KEY_UP),
    ("down", Key::KEY_DOWN),
    ("left", Key::KEY_LEFT),
    ("right", Key::KEY_RIGHT),
    ("shift", Key::KEY_LEFTSHIFT),
    ("shift_l", Key::KEY_LEFTSHIFT),
    ("shift_r", Key::KEY_RIGHTSHIFT),
    ("ctrl", Key::KEY_LEFTCTRL),
    ("control_l", Key::KEY_LEFTCTRL),
    ("control_r", Key::KEY_RIGHTCTRL),
    ("alt", Key::KEY_LEFTALT),
    ("alt_l", Key::KEY_LEFTALT),
    ("alt_r", Key::KEY_RIGHTALT),
    ("super", Key::KEY_LEFTMETA),
    ("caps_lock", Key::KEY_CAPSLOCK),
    ("minus", Key::KEY_MINUS),
    ("equal", Key::KEY_EQUAL),
    ("comma", Key::KEY_COMMA),
    ("period", Key::KEY_DOT),
    ("slash", Key::KEY_SLASH),
    ("semicolon", Key::KEY_SEMICOLON),
    ("apostrophe", Key::KEY_APOSTROPHE),
    ("grave", Key::KEY_GRAVE),
    ("bracketleft", Key::KEY_LEFTBRACE),
    ("bracketright", Key::KEY_RIGHTBRACE),
    ("backslash", Key::KEY_BACKSLASH),
];

/// Linux input key code of a keyboard key.
///
/// Serialized by name when the code has one, otherwise as `code:<n>` with
/// `n` in `1..=`[`LAST_KEYBOARD_CODE`].
///
/// # Examples
///
/// ```
/// use pad_bridge::mapping::action::KeyCode;
///
/// let space: KeyCode = "Space".parse().unwrap();
/// assert_eq!(space.code(), 57);
/// assert_eq!(space.to_string(), "space");
///
/// let raw: KeyCode = "code:183".parse().unwrap();
/// assert_eq!(raw.to_string(), "code:183");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyCode(u16);

impl KeyCode {
    /// Wraps a raw Linux key code.
    #[must_use]
    pub fn from_code(code: u16) -> Self {
        KeyCode(code)
    }

    #[must_use]
    pub fn code(&self) -> u16 {
        self.0
    }

    /// evdev key for this code.
    #[must_use]
    pub fn key(&self) -> Key {
        Key::new(self.0)
    }

    /// First name in the key table for this code.
    #[must_use]
    pub fn name(&self) -> Option<&'static str> {
        KEY_NAMES
            .iter()
            .find(|(_, key)| key.code() == self.0)
            .map(|(name, _)| *name)
    }
}

impl FromStr for KeyCode {
    type Err = PadBridgeError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();

        if let Some(raw) = name.strip_prefix("code:") {
            return raw
                .parse::<u16>()
                .ok()
                .filter(|code| (1..=LAST_KEYBOARD_CODE).contains(code))
                .map(KeyCode)
                .ok_or_else(|| PadBridgeError::UnknownKey(s.to_string()));
        }

        KEY_NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, key)| KeyCode(key.code()))
            .ok_or_else(|| PadBridgeError::UnknownKey(s.to_string()))
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "code:{}", self.0),
        }
    }
}

impl TryFrom<String> for KeyCode {
    type Error = PadBridgeError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<KeyCode> for String {
    fn from(key: KeyCode) -> Self {
        key.to_string()
    }
}

/// Pointer button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerButton {
    Left,
    Right,
    Middle,
    /// Back
    X1,
    /// Forward
    X2,
}

impl PointerButton {
    /// evdev button code.
    #[must_use]
    pub fn key(&self) -> Key {
        match self {
            PointerButton::Left => Key::BTN_LEFT,
            PointerButton::Right => Key::BTN_RIGHT,
            PointerButton::Middle => Key::BTN_MIDDLE,
            PointerButton::X1 => Key::BTN_SIDE,
            PointerButton::X2 => Key::BTN_EXTRA,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            PointerButton::Left => "left",
            PointerButton::Right => "right",
            PointerButton::Middle => "middle",
            PointerButton::X1 => "x1",
            PointerButton::X2 => "x2",
        }
    }
}

impl FromStr for PointerButton {
    type Err = PadBridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(PointerButton::Left),
            "right" => Ok(PointerButton::Right),
            "middle" => Ok(PointerButton::Middle),
            "x1" => Ok(PointerButton::X1),
            "x2" => Ok(PointerButton::X2),
            _ => Err(PadBridgeError::InvalidAction(format!("mouse_button:{}", s))),
        }
    }
}

/// Direction of a fixed pointer nudge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Pointer delta of one nudge (screen coordinates, y grows downward).
    #[must_use]
    pub fn delta(&self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -DIRECTION_STEP_PX),
            Direction::Down => (0, DIRECTION_STEP_PX),
            Direction::Left => (-DIRECTION_STEP_PX, 0),
            Direction::Right => (DIRECTION_STEP_PX, 0),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

/// Output bound to a raw input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputAction {
    PointerMove { dx: i32, dy: i32 },
    PointerScroll { amount: f32 },
    PointerButton { button: PointerButton },
    KeyboardKey { key: KeyCode },
    PointerDirection { direction: Direction },
}

impl FromStr for OutputAction {
    type Err = PadBridgeError;

    fn from_str(s: &str) -> Result<Self> {
        let descriptor = s.trim();
        let invalid = || PadBridgeError::InvalidAction(s.to_string());

        let Some((kind, arg)) = descriptor.split_once(':') else {
            // Bare key name
            return Ok(OutputAction::KeyboardKey {
                key: descriptor.parse()?,
            });
        };

        match kind.to_ascii_lowercase().as_str() {
            "key" => Ok(OutputAction::KeyboardKey { key: arg.parse()? }),
            "code" => Ok(OutputAction::KeyboardKey {
                key: descriptor.parse()?,
            }),
            "mouse_button" => Ok(OutputAction::PointerButton {
                button: arg.parse().map_err(|_| invalid())?,
            }),
            "mouse" => {
                let direction = match arg.trim().to_ascii_lowercase().as_str() {
                    "up" => Direction::Up,
                    "down" => Direction::Down,
                    "left" => Direction::Left,
                    "right" => Direction::Right,
                    _ => return Err(invalid()),
                };
                Ok(OutputAction::PointerDirection { direction })
            }
            "move" => {
                let (dx, dy) = arg.split_once(',').ok_or_else(invalid)?;
                let dx = dx.trim().parse::<i32>().map_err(|_| invalid())?;
                let dy = dy.trim().parse::<i32>().map_err(|_| invalid())?;
                Ok(OutputAction::PointerMove { dx, dy })
            }
            "scroll" => {
                let amount = arg.trim().parse::<f32>().map_err(|_| invalid())?;
                if !amount.is_finite() {
                    return Err(invalid());
                }
                Ok(OutputAction::PointerScroll { amount })
            }
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for OutputAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputAction::PointerMove { dx, dy } => write!(f, "move:{},{}", dx, dy),
            OutputAction::PointerScroll { amount } => write!(f, "scroll:{}", amount),
            OutputAction::PointerButton { button } => write!(f, "mouse_button:{}", button.as_str()),
            OutputAction::KeyboardKey { key } => write!(f, "key:{}", key),
            OutputAction::PointerDirection { direction } => write!(f, "mouse:{}", direction.as_str()),
        }
    }
}
