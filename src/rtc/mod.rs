//! RTC event source: the native-engine seam, the typed event hub and the
//! [`manager::RtcManager`] translating engine callbacks into [`events::RtcEvent`]s.
pub mod engine;
pub mod events;
pub mod hub;
pub mod loopback;
pub mod manager;
pub mod rtc_error;
pub mod types;
pub mod user;
