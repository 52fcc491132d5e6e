use std::fmt;

pub type Result<T> = std::result::Result<T, RtcError>;

/// Failure of a command issued to the RTC layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RtcError {
    NotInitialized,
    AlreadyInChannel,
    NotInChannel,
    /// The native engine refused the call; carries its error code and message.
    Engine { code: i32, message: String },
}

impl fmt::Display for RtcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RtcError::NotInitialized => write!(f, "rtc manager is not initialized"),
            RtcError::AlreadyInChannel => write!(f, "already joined a channel"),
            RtcError::NotInChannel => write!(f, "not in a channel"),
            RtcError::Engine { code, message } => write!(f, "engine error {code}: {message}"),
        }
    }
}

impl std::error::Error for RtcError {}
