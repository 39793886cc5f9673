//! # uinput Sink
//!
//! Injects pointer and keyboard events through a Linux uinput virtual device.
//!
//! The virtual device advertises every keyboard key, the five pointer buttons
//! and relative X/Y/wheel axes. Each sink call is emitted as one event report.
//! Fractional scroll amounts are accumulated until they add up to whole
//! wheel clicks.

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, EventType, InputEvent, Key, RelativeAxisType};
use tracing::{debug, info};

use crate::error::{PadBridgeError, Result};
use crate::mapping::action::{KeyCode, PointerButton, LAST_KEYBOARD_CODE};
use crate::output::InjectionSink;

/// Name the virtual device registers under.
pub const VIRTUAL_DEVICE_NAME: &str = "pad-bridge virtual pointer";

const POINTER_BUTTONS: [PointerButton; 5] = [
    PointerButton::Left,
    PointerButton::Right,
    PointerButton::Middle,
    PointerButton::X1,
    PointerButton::X2,
];

/// Sink backed by a uinput virtual pointer + keyboard.
pub struct UinputSink {
    device: VirtualDevice,
    scroll_residual: f32,
}

impl UinputSink {
    /// Creates the virtual device.
    ///
    /// # Errors
    ///
    /// Returns `Injection` if `/dev/uinput` cannot be opened (usually a
    /// permissions problem) or the device cannot be registered.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use pad_bridge::output::uinput::UinputSink;
    ///
    /// let sink = UinputSink::create()?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn create() -> Result<Self> {
        let mut keys = AttributeSet::<Key>::new();
        for code in 1..=LAST_KEYBOARD_CODE {
            keys.insert(Key::new(code));
        }
        for button in POINTER_BUTTONS {
            keys.insert(button.key());
        }

        let mut axes = AttributeSet::<RelativeAxisType>::new();
        axes.insert(RelativeAxisType::REL_X);
        axes.insert(RelativeAxisType::REL_Y);
        axes.insert(RelativeAxisType::REL_WHEEL);

        let device = VirtualDeviceBuilder::new()
            .map_err(|e| PadBridgeError::Injection(format!("Failed to open /dev/uinput: {}", e)))?
            .name(VIRTUAL_DEVICE_NAME)
            .with_keys(&keys)
            .map_err(|e| PadBridgeError::Injection(format!("Failed to set key capabilities: {}", e)))?
            .with_relative_axes(&axes)
            .map_err(|e| PadBridgeError::Injection(format!("Failed to set relative axes: {}", e)))?
            .build()
            .map_err(|e| PadBridgeError::Injection(format!("Failed to build virtual device: {}", e)))?;

        info!("Created virtual device: {}", VIRTUAL_DEVICE_NAME);

        Ok(Self {
            device,
            scroll_residual: 0.0,
        })
    }

    fn emit(&mut self, events: &[InputEvent]) -> Result<()> {
        self.device
            .emit(events)
            .map_err(|e| PadBridgeError::Injection(format!("Failed to emit events: {}", e)))
    }

    fn key_event(key: Key, value: i32) -> InputEvent {
        InputEvent::new(EventType::KEY, key.code(), value)
    }
}

/// Splits accumulated scroll into whole clicks, returning `(clicks, residual)`.
fn split_scroll(accumulated: f32) -> (i32, f32) {
    let clicks = accumulated.trunc();
    (clicks as i32, accumulated - clicks)
}

impl InjectionSink for UinputSink {
    fn move_by(&mut self, dx: i32, dy: i32) -> Result<()> {
        let mut events = Vec::with_capacity(2);
        if dx != 0 {
            events.push(InputEvent::new(EventType::RELATIVE, RelativeAxisType::REL_X.0, dx));
        }
        if dy != 0 {
            events.push(InputEvent::new(EventType::RELATIVE, RelativeAxisType::REL_Y.0, dy));
        }
        if events.is_empty() {
            return Ok(());
        }
        self.emit(&events)
    }

    fn scroll_by(&mut self, amount: f32) -> Result<()> {
        if !amount.is_finite() {
            return Ok(());
        }

        let (clicks, residual) = split_scroll(self.scroll_residual + amount);
        self.scroll_residual = residual;

        if clicks == 0 {
            return Ok(());
        }

        debug!("Scroll {} click(s)", clicks);
        self.emit(&[InputEvent::new(
            EventType::RELATIVE,
            RelativeAxisType::REL_WHEEL.0,
            clicks,
        )])
    }

    fn press_pointer_button(&mut self, button: PointerButton) -> Result<()> {
        self.emit(&[Self::key_event(button.key(), 1)])
    }

    fn release_pointer_button(&mut self, button: PointerButton) -> Result<()> {
        self.emit(&[Self::key_event(button.key(), 0)])
    }

    fn press_key(&mut self, key: KeyCode) -> Result<()> {
        self.emit(&[Self::key_event(key.key(), 1)])
    }

    fn release_key(&mut self, key: KeyCode) -> Result<()> {
        self.emit(&[Self::key_event(key.key(), 0)])
    }
}
