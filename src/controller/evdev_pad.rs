//! # evdev Gamepad
//!
//! [`DeviceSource`] backed by the Linux evdev interface.
//!
//! ## Controller Detection
//!
//! Any `/dev/input/event*` device that reports absolute axes and a gamepad
//! or joystick button (`BTN_SOUTH` or `BTN_TRIGGER`) counts as a controller.
//! With a configured device path only that node is considered.
//!
//! ## Layout
//!
//! - Axes: the device's absolute axes in code order (`ABS_X`, `ABS_Y`, ...),
//!   normalized from their reported range to -1.0..1.0
//! - Buttons: the device's keys at or above `BTN_MISC`, in code order
//!
//! State is read with the `EVIOCGABS`/`EVIOCGKEY` ioctls on every poll, so
//! reads never block and never depend on draining the event queue. A failed
//! read means the device is gone: the handle is dropped,
//! [`DeviceSource::is_open`] turns false and
//! [`DeviceSource::connected_count`] falls back to scanning.

use evdev::{AbsoluteAxisType, Device, Key};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::controller::device::DeviceSource;
use crate::error::{PadBridgeError, Result};

/// First button code; lower key codes are keyboard keys.
const FIRST_BUTTON_CODE: u16 = 0x100;

const INPUT_DIR: &str = "/dev/input";

/// Range of one absolute axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AxisRange {
    axis: AbsoluteAxisType,
    min: i32,
    max: i32,
}

/// Maps a raw reading in `min..=max` to -1.0..1.0.
fn normalize(value: i32, min: i32, max: i32) -> f32 {
    if max <= min {
        return 0.0;
    }
    let span = (i64::from(max) - i64::from(min)) as f64;
    let scaled = 2.0 * (i64::from(value) - i64::from(min)) as f64 / span - 1.0;
    scaled.clamp(-1.0, 1.0) as f32
}

/// Open controller and its last polled state.
struct PadHandle {
    device: Device,
    path: PathBuf,
    name: String,
    axes: Vec<AxisRange>,
    buttons: Vec<Key>,
    axis_values: Vec<f32>,
    button_values: Vec<bool>,
}

impl PadHandle {
    fn open(path: &Path) -> Result<Self> {
        let device = Device::open(path)?;
        if !is_gamepad(&device) {
            return Err(PadBridgeError::Controller(format!(
                "{} is not a gamepad",
                path.display()
            )));
        }

        let abs_state = device.get_abs_state()?;
        let axes: Vec<AxisRange> = device
            .supported_absolute_axes()
            .map(|set| {
                set.iter()
                    .map(|axis| {
                        let info = abs_state[axis.0 as usize];
                        AxisRange {
                            axis,
                            min: info.minimum,
                            max: info.maximum,
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let buttons: Vec<Key> = device
            .supported_keys()
            .map(|set| set.iter().filter(|k| k.code() >= FIRST_BUTTON_CODE).collect())
            .unwrap_or_default();

        let name = device.name().unwrap_or("Unknown controller").to_string();
        info!(
            "Opened {} at {} ({} axes, {} buttons)",
            name,
            path.display(),
            axes.len(),
            buttons.len()
        );

        Ok(Self {
            axis_values: vec![0.0; axes.len()],
            button_values: vec![false; buttons.len()],
            device,
            path: path.to_path_buf(),
            name,
            axes,
            buttons,
        })
    }

    fn refresh(&mut self) -> std::io::Result<()> {
        let abs_state = self.device.get_abs_state()?;
        for (value, range) in self.axis_values.iter_mut().zip(&self.axes) {
            *value = normalize(abs_state[range.axis.0 as usize].value, range.min, range.max);
        }

        let keys = self.device.get_key_state()?;
        for (value, key) in self.button_values.iter_mut().zip(&self.buttons) {
            *value = keys.contains(*key);
        }
        Ok(())
    }
}

fn is_gamepad(device: &Device) -> bool {
    let has_buttons = device
        .supported_keys()
        .map(|keys| keys.contains(Key::BTN_SOUTH) || keys.contains(Key::BTN_TRIGGER))
        .unwrap_or(false);
    has_buttons && device.supported_absolute_axes().is_some()
}

/// Game controller read through evdev.
pub struct EvdevPad {
    device_path: Option<PathBuf>,
    handle: Option<PadHandle>,
}

impl EvdevPad {
    /// Creates a source without opening anything yet.
    ///
    /// `device_path` pins a specific `/dev/input/eventN` node; `None` takes the
    /// first gamepad found.
    pub fn new(device_path: Option<PathBuf>) -> Self {
        Self {
            device_path,
            handle: None,
        }
    }

    /// Path of the open controller.
    pub fn device_path(&self) -> Option<&Path> {
        self.handle.as_ref().map(|h| h.path.as_path())
    }

    /// Candidate device nodes, sorted for deterministic selection.
    fn candidates(&self) -> Vec<PathBuf> {
        if let Some(path) = &self.device_path {
            return vec![path.clone()];
        }

        let entries = match std::fs::read_dir(INPUT_DIR) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Could not read {}: {}", INPUT_DIR, e);
                return Vec::new();
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .map(|name| name.to_string_lossy().starts_with("event"))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();
        paths
    }

    /// Number of gamepads that can be opened right now.
    fn scan(&self) -> usize {
        self.candidates()
            .iter()
            .filter(|path| match Device::open(path) {
                Ok(device) => is_gamepad(&device),
                Err(e) => {
                    debug!("Could not open {}: {}", path.display(), e);
                    false
                }
            })
            .count()
    }
}

impl DeviceSource for EvdevPad {
    fn poll_events(&mut self) {
        if let Some(handle) = &mut self.handle {
            if let Err(e) = handle.refresh() {
                warn!("Lost controller {} ({}): {}", handle.name, handle.path.display(), e);
                self.handle = None;
            }
        }
    }

    fn connected_count(&self) -> usize {
        match self.handle {
            Some(_) => 1,
            None => self.scan(),
        }
    }

    fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    fn reinitialize(&mut self) -> Result<()> {
        self.handle = None;

        for path in self.candidates() {
            match PadHandle::open(&path) {
                Ok(mut handle) => {
                    handle.refresh()?;
                    self.handle = Some(handle);
                    return Ok(());
                }
                Err(e) => debug!("Skipping {}: {}", path.display(), e),
            }
        }

        Err(PadBridgeError::ControllerNotFound)
    }

    fn name(&self) -> String {
        self.handle
            .as_ref()
            .map(|h| h.name.clone())
            .unwrap_or_else(|| "no controller".to_string())
    }

    fn axis_count(&self) -> usize {
        self.handle.as_ref().map_or(0, |h| h.axis_values.len())
    }

    fn axis(&self, index: usize) -> f32 {
        self.handle
            .as_ref()
            .and_then(|h| h.axis_values.get(index).copied())
            .unwrap_or(0.0)
    }

    fn button_count(&self) -> usize {
        self.handle.as_ref().map_or(0, |h| h.button_values.len())
    }

    fn button(&self, index: usize) -> bool {
        self.handle
            .as_ref()
            .and_then(|h| h.button_values.get(index).copied())
            .unwrap_or(false)
    }
}
