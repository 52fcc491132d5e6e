//! UI-side reducer mirroring the aggregator's event stream.
pub mod action;
pub mod state;

pub use action::{AttendeeLayout, StoreAction};
pub use state::{DeviceList, Store, StoreState};
