use crate::rtc::{
    types::{
        RtcAudioVolumeIndication, RtcConnection, RtcConnectionReason, RtcDeviceInfo,
        RtcDeviceType, RtcUserUpdateReason, Uid,
    },
    user::RtcUser,
};

/// Local screen-share lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RtcScreenShareState {
    Idle,
    Waiting,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RtcScreenShareStateReason {
    None,
    WindowClosed,
}

/// Events published by [`RtcManager`](crate::rtc::manager::RtcManager).
#[derive(Debug, Clone, PartialEq)]
pub enum RtcEvent {
    Connection {
        state: RtcConnection,
        reason: RtcConnectionReason,
    },
    UserNew(RtcUser),
    UserUpdate {
        old: Option<RtcUser>,
        new: RtcUser,
        reason: RtcUserUpdateReason,
    },
    UserRemove(Uid),
    DeviceList {
        device_type: RtcDeviceType,
        current_device_id: String,
        devices: Vec<RtcDeviceInfo>,
    },
    VolumeIndications(Vec<RtcAudioVolumeIndication>),
    ScreenShare {
        state: RtcScreenShareState,
        reason: RtcScreenShareStateReason,
    },
    WhiteboardInfo {
        uuid: String,
        time_span: String,
    },
    Error {
        code: i32,
        message: String,
    },
}

/// Discriminant of [`RtcEvent`], used to pick what a subscription receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RtcEventKind {
    Connection,
    UserNew,
    UserUpdate,
    UserRemove,
    DeviceList,
    VolumeIndications,
    ScreenShare,
    WhiteboardInfo,
    Error,
}

impl RtcEventKind {
    /// The participant lifecycle kinds consumed by the roster.
    pub const USER_LIFECYCLE: [RtcEventKind; 3] = [
        RtcEventKind::UserNew,
        RtcEventKind::UserUpdate,
        RtcEventKind::UserRemove,
    ];
}

impl RtcEvent {
    #[must_use]
    pub fn kind(&self) -> RtcEventKind {
        match self {
            RtcEvent::Connection { .. } => RtcEventKind::Connection,
            RtcEvent::UserNew(_) => RtcEventKind::UserNew,
            RtcEvent::UserUpdate { .. } => RtcEventKind::UserUpdate,
            RtcEvent::UserRemove(_) => RtcEventKind::UserRemove,
            RtcEvent::DeviceList { .. } => RtcEventKind::DeviceList,
            RtcEvent::VolumeIndications(_) => RtcEventKind::VolumeIndications,
            RtcEvent::ScreenShare { .. } => RtcEventKind::ScreenShare,
            RtcEvent::WhiteboardInfo { .. } => RtcEventKind::WhiteboardInfo,
            RtcEvent::Error { .. } => RtcEventKind::Error,
        }
    }
}
