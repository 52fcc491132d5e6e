use std::fmt;

/// Severity of a log line, ordered from most to least verbose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Per-event roster and dispatch tracing.
    Trace,
    /// State transitions useful while debugging a meeting.
    Debug,
    /// Meeting lifecycle milestones (join, leave, initialize).
    Info,
    /// Rejected commands and recoverable anomalies.
    Warn,
    /// Upstream engine faults.
    Error,
}

impl LogLevel {
    /// Short uppercase tag used in the log file.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    /// Warn and Error always reach the UI log panel; the rest is sampled.
    #[must_use]
    pub const fn is_urgent(self) -> bool {
        matches!(self, LogLevel::Warn | LogLevel::Error)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
