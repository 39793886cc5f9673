//! # Mapping Module
//!
//! What the controller drives, and how that is persisted.
//!
//! This module handles:
//! - Logical pointer controls and their calibrated physical bindings
//! - Input ids and the output actions bound to them
//! - Per-profile tuning (deadzone, speeds, repeat timing)
//! - Interactive calibration and single-input capture
//! - Atomic JSON persistence of the whole profile

pub mod action;
pub mod binding;
pub mod calibration;
pub mod capture;
pub mod profile;
pub mod store;
