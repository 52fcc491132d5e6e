use crate::rtc::types::{RtcConnection, RtcConnectionReason, RtcJoinParams};

/// Meeting lifecycle. Mirrors the RTC connection one to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeetingConnection {
    Disconnected,
    Connecting,
    Connected,
    ReConnecting,
    Disconnecting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeetingConnectionReason {
    None,
    RtcError,
}

impl From<RtcConnection> for MeetingConnection {
    fn from(c: RtcConnection) -> Self {
        match c {
            RtcConnection::Disconnected => MeetingConnection::Disconnected,
            RtcConnection::Connecting => MeetingConnection::Connecting,
            RtcConnection::Connected => MeetingConnection::Connected,
            RtcConnection::ReConnecting => MeetingConnection::ReConnecting,
            RtcConnection::Disconnecting => MeetingConnection::Disconnecting,
        }
    }
}

impl From<RtcConnectionReason> for MeetingConnectionReason {
    fn from(r: RtcConnectionReason) -> Self {
        match r {
            RtcConnectionReason::None => MeetingConnectionReason::None,
            RtcConnectionReason::Error => MeetingConnectionReason::RtcError,
        }
    }
}

/// What the join form collects.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MeetingParams {
    pub channel_name: String,
    pub nickname: String,
    pub is_camera_on: bool,
    pub is_audio_on: bool,
}

impl From<&MeetingParams> for RtcJoinParams {
    fn from(p: &MeetingParams) -> Self {
        RtcJoinParams {
            channel_name: p.channel_name.clone(),
            nickname: p.nickname.clone(),
            is_camera_on: p.is_camera_on,
            is_audio_on: p.is_audio_on,
        }
    }
}

/// Emitted by [`MeetingManager`](crate::meeting::manager::MeetingManager).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetingEvent {
    Connection {
        state: MeetingConnection,
        reason: MeetingConnectionReason,
    },
}
