//! Desktop client: an `eframe` app rendering the meeting store and driving
//! the [`CommonManager`](crate::common::manager::CommonManager).

pub mod gui_error;
pub mod meeting_app;
mod utils;
