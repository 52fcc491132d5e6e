use std::sync::mpsc;

use crate::log::{log_level::LogLevel, log_msg::LogMsg, log_sink::LogSink, now_millis};

/// Cloneable, non-blocking producer side of the file logger.
///
/// Each handle wraps the bounded `SyncSender` feeding the logger worker. When
/// the queue is full the line is dropped rather than stalling the UI thread.
#[derive(Clone)]
pub struct LoggerHandle {
    pub(super) tx: mpsc::SyncSender<LogMsg>,
}

impl LogSink for LoggerHandle {
    #[inline]
    fn log(&self, level: LogLevel, msg: &str, target: &'static str) {
        let _ = self.try_log(level, msg, target);
    }
}

impl LoggerHandle {
    /// Enqueues a line without blocking.
    ///
    /// # Errors
    /// - `TrySendError::Full` when the queue is at capacity (the line is dropped).
    /// - `TrySendError::Disconnected` when the worker has exited.
    pub fn try_log<S: Into<String>>(
        &self,
        level: LogLevel,
        text: S,
        target: &'static str,
    ) -> Result<(), mpsc::TrySendError<LogMsg>> {
        self.tx
            .try_send(LogMsg::new(level, text, target, now_millis()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use std::sync::mpsc::{TrySendError, sync_channel};

    #[test]
    fn try_log_delivers_when_capacity_available() {
        let (tx, rx) = sync_channel::<LogMsg>(2);
        let h = LoggerHandle { tx };

        h.try_log(LogLevel::Info, "joined", "test::target")
            .expect("queue has room");

        let msg = rx.recv().expect("a message should arrive");
        assert_eq!(msg.level, LogLevel::Info);
        assert_eq!(msg.text, "joined");
        assert_eq!(msg.target, "test::target");
        assert!(msg.ts_ms > 0);
    }

    #[test]
    fn try_log_reports_full_queue() {
        let (tx, _rx) = sync_channel::<LogMsg>(1);
        let h = LoggerHandle { tx };

        h.try_log(LogLevel::Info, "first", "t").expect("first fits");
        match h.try_log(LogLevel::Info, "second", "t") {
            Err(TrySendError::Full(m)) => assert_eq!(m.text, "second"),
            other => panic!("expected Full, got: {other:?}"),
        }
    }

    #[test]
    fn sink_impl_swallows_disconnected_worker() {
        let (tx, rx) = sync_channel::<LogMsg>(1);
        drop(rx);
        let h = LoggerHandle { tx };

        // Must not panic through the LogSink path.
        h.log(LogLevel::Error, "nobody listening", "t");
        assert!(matches!(
            h.try_log(LogLevel::Error, "again", "t"),
            Err(TrySendError::Disconnected(_))
        ));
    }
}
