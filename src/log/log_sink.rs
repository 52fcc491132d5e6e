use crate::log::log_level::LogLevel;

/// Destination for log lines. Every manager in the crate holds an `Arc<dyn LogSink>`.
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, msg: &str, target: &'static str);
}
