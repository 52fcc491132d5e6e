//! Roster engine: the ordered attendee list and its positional events.
pub mod attendee;
pub mod events;
pub mod manager;
pub mod priority;
pub mod roster;
