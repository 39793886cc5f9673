//! # Controller Module
//!
//! Game controller input handling.
//!
//! This module handles:
//! - Controller detection and connection via evdev
//! - Reading normalized axes and buttons through [`device::DeviceSource`]
//! - Applying deadzones
//! - Press/release edge detection and the key repeat governor

pub mod deadzone;
pub mod device;
pub mod edge;
pub mod evdev_pad;
pub mod repeat;
