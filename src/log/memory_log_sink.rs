use std::sync::Mutex;

use crate::log::{log_level::LogLevel, log_sink::LogSink};

/// Sink that keeps every line in memory.
///
/// Used by tests that need to check a rejected command was reported, and by
/// the desktop app before the file logger is up.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every recorded line.
    #[must_use]
    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        self.lines
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// True if any line at `level` contains `needle`.
    #[must_use]
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.lines()
            .iter()
            .any(|(lvl, text)| *lvl == level && text.contains(needle))
    }
}

impl LogSink for MemoryLogSink {
    fn log(&self, level: LogLevel, msg: &str, _target: &'static str) {
        if let Ok(mut guard) = self.lines.lock() {
            guard.push((level, msg.to_owned()));
        }
    }
}
