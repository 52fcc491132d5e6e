//! Aggregator facade consumed by the UI.
pub mod events;
pub mod manager;
