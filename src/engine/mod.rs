//! # Engine Module
//!
//! The translation loop: polls the controller at a fixed tick and turns its
//! state into pointer, scroll and key events.
//!
//! This module handles:
//! - Per-tick translation of the active profile ([`translator`])
//! - The worker thread, its lifecycle and status reporting ([`worker`])
//! - Waiting for a controller to (re)appear ([`reconnect`])
//! - Per-control discrete state ([`state`]) and sleeping ([`clock`])

pub mod clock;
pub mod reconnect;
pub mod state;
pub mod translator;
pub mod worker;
