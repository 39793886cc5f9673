//! # Pad Bridge Library
//!
//! Drive the mouse pointer, scroll wheel and keyboard from a game controller.
//!
//! This library provides the core functionality for reading a gamepad through
//! evdev, translating its state with a calibrated profile, and injecting the
//! result through a virtual uinput device.

pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod mapping;
pub mod output;
