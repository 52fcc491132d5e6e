//! Meeting connection state machine.
pub mod manager;
pub mod types;
