//! # Output Module
//!
//! Where translated events go.
//!
//! This module handles:
//! - The [`InjectionSink`] trait the translation loop emits through
//! - Bookkeeping of discrete outputs currently held down
//! - A uinput sink for real pointer/keyboard injection (`uinput`)
//! - A sink that only logs, for dry runs (`log_sink`)

pub mod log_sink;
pub mod uinput;

use std::collections::BTreeMap;

use crate::error::Result;
use crate::mapping::action::{KeyCode, PointerButton};

/// Facility that moves the pointer and delivers key events to the OS.
///
/// Calls are fire-and-forget: an `Err` is reported by the caller and never
/// retried.
#[cfg_attr(test, mockall::automock)]
pub trait InjectionSink {
    /// Relative pointer motion in pixels.
    fn move_by(&mut self, dx: i32, dy: i32) -> Result<()>;

    /// Wheel motion in clicks; positive scrolls up. Fractions may accumulate.
    fn scroll_by(&mut self, amount: f32) -> Result<()>;

    fn press_pointer_button(&mut self, button: PointerButton) -> Result<()>;

    fn release_pointer_button(&mut self, button: PointerButton) -> Result<()>;

    fn press_key(&mut self, key: KeyCode) -> Result<()>;

    fn release_key(&mut self, key: KeyCode) -> Result<()>;
}

impl<S: InjectionSink + ?Sized> InjectionSink for Box<S> {
    fn move_by(&mut self, dx: i32, dy: i32) -> Result<()> {
        (**self).move_by(dx, dy)
    }

    fn scroll_by(&mut self, amount: f32) -> Result<()> {
        (**self).scroll_by(amount)
    }

    fn press_pointer_button(&mut self, button: PointerButton) -> Result<()> {
        (**self).press_pointer_button(button)
    }

    fn release_pointer_button(&mut self, button: PointerButton) -> Result<()> {
        (**self).release_pointer_button(button)
    }

    fn press_key(&mut self, key: KeyCode) -> Result<()> {
        (**self).press_key(key)
    }

    fn release_key(&mut self, key: KeyCode) -> Result<()> {
        (**self).release_key(key)
    }
}

/// Discrete output that stays down until released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HeldOutput {
    Key(KeyCode),
    PointerButton(PointerButton),
}

impl HeldOutput {
    /// Sends the press for this output.
    pub fn press<S: InjectionSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        match *self {
            HeldOutput::Key(key) => sink.press_key(key),
            HeldOutput::PointerButton(button) => sink.press_pointer_button(button),
        }
    }

    /// Sends the release for this output.
    pub fn release<S: InjectionSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        match *self {
            HeldOutput::Key(key) => sink.release_key(key),
            HeldOutput::PointerButton(button) => sink.release_pointer_button(button),
        }
    }
}

/// Outputs currently held, counted per holder.
///
/// Two controls may hold the same output (a trigger click and an action bound
/// to `mouse_button:left`); the output is released only when the last holder
/// lets go.
#[derive(Debug, Default)]
pub struct HeldOutputs {
    holders: BTreeMap<HeldOutput, usize>,
}

impl HeldOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one more holder. Returns `true` if the output was not held before.
    pub fn acquire(&mut self, output: HeldOutput) -> bool {
        let count = self.holders.entry(output).or_insert(0);
        *count += 1;
        *count == 1
    }

    /// Drops one holder. Returns `true` if that was the last one.
    ///
    /// Releasing an output nobody holds returns `false`.
    pub fn release(&mut self, output: HeldOutput) -> bool {
        match self.holders.get_mut(&output) {
            Some(count) if *count > 1 => {
                *count -= 1;
                false
            }
            Some(_) => {
                self.holders.remove(&output);
                true
            }
            None => false,
        }
    }

    pub fn is_held(&self, output: HeldOutput) -> bool {
        self.holders.contains_key(&output)
    }

    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }

    /// Forgets every holder, returning the outputs that were down.
    pub fn drain(&mut self) -> Vec<HeldOutput> {
        std::mem::take(&mut self.holders).into_keys().collect()
    }
}
