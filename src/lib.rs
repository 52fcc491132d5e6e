//! RustyMeet is a desktop video-meeting client built on a native RTC engine.
//!
//! The engine owns transport, encoding and devices. This crate keeps the
//! meeting-level state on top of it: who is in the channel, in which order
//! they are presented, and how the connection evolves. The `rustymeet`
//! binary renders that state with `eframe`.

/// Desktop GUI built on `eframe`.
pub mod app;
/// Ordered attendee roster and its positional events.
pub mod attendee;
/// Aggregator facade consumed by the UI.
pub mod common;
/// Handles configuration loading and management.
pub mod config;
/// Logging utilities for the application.
pub mod log;
/// Meeting connection state machine.
pub mod meeting;
/// Native RTC engine seam and the event source built on it.
pub mod rtc;
/// UI-side reducer over the aggregator's events.
pub mod store;
