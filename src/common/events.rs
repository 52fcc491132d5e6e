use crate::{
    attendee::{attendee::Attendee, events::AttendeeEvent},
    meeting::types::{MeetingConnection, MeetingConnectionReason},
    rtc::{
        events::{RtcScreenShareState, RtcScreenShareStateReason},
        types::{RtcAudioVolumeIndication, RtcDeviceInfo, RtcDeviceType},
    },
};

/// Local whiteboard lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WhiteBoardState {
    Idle,
    Waiting,
    Running,
}

/// Everything the UI layer consumes from the client core.
#[derive(Debug, Clone, PartialEq)]
pub enum CommonEvent {
    Connection {
        state: MeetingConnection,
        reason: MeetingConnectionReason,
    },
    DeviceList {
        device_type: RtcDeviceType,
        current_device_id: String,
        devices: Vec<RtcDeviceInfo>,
    },
    AttendeeNew {
        position: usize,
        attendee: Attendee,
    },
    AttendeeUpdate {
        position: usize,
        attendee: Attendee,
    },
    AttendeeRemove {
        position: usize,
    },
    AttendeeReplace {
        old_position: usize,
        new_position: usize,
    },
    VolumeIndications(Vec<RtcAudioVolumeIndication>),
    ScreenShareState {
        state: RtcScreenShareState,
        reason: RtcScreenShareStateReason,
    },
    WhiteBoardState(WhiteBoardState),
    WhiteboardInfo {
        uuid: String,
        time_span: String,
    },
    RtcError {
        code: i32,
        message: String,
    },
}

impl From<&AttendeeEvent> for CommonEvent {
    fn from(ev: &AttendeeEvent) -> Self {
        match ev.clone() {
            AttendeeEvent::New { position, attendee } => CommonEvent::AttendeeNew { position, attendee },
            AttendeeEvent::Update { position, attendee } => {
                CommonEvent::AttendeeUpdate { position, attendee }
            }
            AttendeeEvent::Remove { position } => CommonEvent::AttendeeRemove { position },
            AttendeeEvent::Replace {
                old_position,
                new_position,
            } => CommonEvent::AttendeeReplace {
                old_position,
                new_position,
            },
        }
    }
}
