//! Sink for `--dry-run`: logs every event instead of injecting it.

use tracing::info;

use crate::error::Result;
use crate::mapping::action::{KeyCode, PointerButton};
use crate::output::InjectionSink;

/// Counts and logs events without touching the OS.
#[derive(Debug, Default)]
pub struct LogSink {
    events: u64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events logged so far.
    pub fn event_count(&self) -> u64 {
        self.events
    }

    fn log(&mut self, event: std::fmt::Arguments<'_>) -> Result<()> {
        self.events += 1;
        info!(target: "pad_bridge::dry_run", "{}", event);
        Ok(())
    }
}

impl InjectionSink for LogSink {
    fn move_by(&mut self, dx: i32, dy: i32) -> Result<()> {
        self.log(format_args!("move dx={} dy={}", dx, dy))
    }

    fn scroll_by(&mut self, amount: f32) -> Result<()> {
        self.log(format_args!("scroll {:.2}", amount))
    }

    fn press_pointer_button(&mut self, button: PointerButton) -> Result<()> {
        self.log(format_args!("press mouse_button:{}", button.as_str()))
    }

    fn release_pointer_button(&mut self, button: PointerButton) -> Result<()> {
        self.log(format_args!("release mouse_button:{}", button.as_str()))
    }

    fn press_key(&mut self, key: KeyCode) -> Result<()> {
        self.log(format_args!("press key:{}", key))
    }

    fn release_key(&mut self, key: KeyCode) -> Result<()> {
        self.log(format_args!("release key:{}", key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_sink_counts_events() {
        let mut sink = LogSink::new();
        sink.move_by(1, 2).unwrap();
        sink.press_key(KeyCode::from_code(30)).unwrap();
        sink.release_key(KeyCode::from_code(30)).unwrap();
        assert_eq!(sink.event_count(), 3);
    }
}
