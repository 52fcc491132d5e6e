use crate::log::log_level::LogLevel;

/// A single queued log line.
#[derive(Debug, Clone)]
pub struct LogMsg {
    /// Severity of the line.
    pub level: LogLevel,
    /// Wall-clock timestamp in milliseconds since the UNIX epoch.
    pub ts_ms: u128,
    /// Formatted message text.
    pub text: String,
    /// Origin of the line, usually `module_path!()`.
    pub target: &'static str,
}

impl LogMsg {
    /// Creates a new `LogMsg`.
    ///
    /// ```rust,ignore
    /// let msg = LogMsg::new(LogLevel::Info, "joined channel", module_path!(), now_millis());
    /// ```
    pub fn new(
        level: LogLevel,
        text: impl Into<String>,
        target: &'static str,
        ts_ms: u128,
    ) -> Self {
        Self {
            level,
            ts_ms,
            text: text.into(),
            target,
        }
    }

    /// Renders the line the way the file writer stores it.
    #[must_use]
    pub fn to_file_line(&self) -> String {
        format!(
            "[{}] {} {} | {}",
            self.level, self.ts_ms, self.target, self.text
        )
    }

    /// Renders the shorter form shown in the UI log panel.
    #[must_use]
    pub fn to_ui_line(&self) -> String {
        format!("[{}] {}", self.level, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_line_contains_level_target_and_text() {
        let m = LogMsg::new(LogLevel::Warn, "join rejected", "rustymeet::meeting", 42);
        assert_eq!(
            m.to_file_line(),
            "[WARN] 42 rustymeet::meeting | join rejected"
        );
        assert_eq!(m.to_ui_line(), "[WARN] join rejected");
    }
}
