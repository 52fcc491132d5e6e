use std::fmt;

use crate::rtc::rtc_error::RtcError;

#[derive(Debug)]
pub enum GuiError {
    Rtc(RtcError),
    InvalidInput(String),
}

impl fmt::Display for GuiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuiError::Rtc(e) => write!(f, "{e}"),
            GuiError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
        }
    }
}

impl std::error::Error for GuiError {}

impl From<RtcError> for GuiError {
    fn from(e: RtcError) -> Self {
        GuiError::Rtc(e)
    }
}
