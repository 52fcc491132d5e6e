//! Leveled logging shared by every manager in the client.
//!
//! Call sites log through the `sink_*!` macros against an `Arc<dyn LogSink>`;
//! the binary backs that sink with a [`logger::Logger`] writing to disk.
pub mod log_level;
pub mod log_macros;
pub mod log_msg;
pub mod log_sink;
pub mod logger;
pub mod logger_handle;
pub mod memory_log_sink;
pub mod noop_log_sink;
pub use memory_log_sink::MemoryLogSink;
pub use noop_log_sink::NoopLogSink;

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the UNIX epoch, or 0 if the clock is before it.
#[must_use]
pub fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
