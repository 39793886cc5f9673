//! # Device Source
//!
//! Abstraction over the polled joystick the translation engine reads from.
//!
//! All reads are non-blocking and reflect the state as of the last
//! [`DeviceSource::poll_events`] call. Indices are dense and device-local:
//! axes are `0..axis_count()`, buttons `0..button_count()`. Reading an index
//! that is out of range yields a neutral value (`0.0` / `false`).

use crate::error::Result;

/// One polled axis reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisSample {
    /// Device-local axis index.
    pub index: u16,
    /// Normalized value (-1.0 to 1.0).
    pub value: f32,
}

/// One polled button reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonSample {
    /// Device-local button index.
    pub index: u16,
    /// Whether the button is held.
    pub pressed: bool,
}

/// Polled game controller.
///
/// Implementations own an opaque device handle that is replaced wholesale by
/// [`DeviceSource::reinitialize`]; nothing from the previous handle survives.
pub trait DeviceSource {
    /// Refreshes the cached state from the device.
    fn poll_events(&mut self);

    /// Number of controllers currently available. `0` means disconnected.
    fn connected_count(&self) -> usize;

    /// Whether the handle from the last [`DeviceSource::reinitialize`] still reads.
    ///
    /// A handle can be lost while other controllers stay connected, so a
    /// non-zero [`DeviceSource::connected_count`] does not imply this.
    fn is_open(&self) -> bool;

    /// Drops the current handle and opens a fresh one on the first available controller.
    fn reinitialize(&mut self) -> Result<()>;

    /// Human-readable controller name.
    fn name(&self) -> String;

    /// Number of axes on the open controller.
    fn axis_count(&self) -> usize;

    /// Normalized axis value (-1.0 to 1.0).
    fn axis(&self, index: usize) -> f32;

    /// Number of buttons on the open controller.
    fn button_count(&self) -> usize;

    /// Button state.
    fn button(&self, index: usize) -> bool;

    /// Snapshot of every axis as samples.
    fn axis_samples(&self) -> Vec<AxisSample> {
        (0..self.axis_count())
            .map(|i| AxisSample {
                index: i as u16,
                value: self.axis(i),
            })
            .collect()
    }

    /// Snapshot of every button as samples.
    fn button_samples(&self) -> Vec<ButtonSample> {
        (0..self.button_count())
            .map(|i| ButtonSample {
                index: i as u16,
                pressed: self.button(i),
            })
            .collect()
    }
}

/// Reads an axis, returning `None` when the index is not on the device.
pub(crate) fn read_axis<D: DeviceSource + ?Sized>(device: &D, index: u16) -> Option<f32> {
    let index = index as usize;
    (index < device.axis_count()).then(|| device.axis(index))
}

/// Reads a button, returning `None` when the index is not on the device.
pub(crate) fn read_button<D: DeviceSource + ?Sized>(device: &D, index: u16) -> Option<bool> {
    let index = index as usize;
    (index < device.button_count()).then(|| device.button(index))
}
