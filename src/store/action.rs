use crate::{
    attendee::attendee::Attendee,
    common::events::{CommonEvent, WhiteBoardState},
    meeting::types::MeetingConnection,
    rtc::{
        events::RtcScreenShareState,
        types::{RtcDeviceInfo, RtcDeviceType, Uid},
    },
};

/// How the attendee area is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AttendeeLayout {
    #[default]
    Speaker,
    Grid4,
    Grid9,
    Grid25,
}

impl AttendeeLayout {
    pub const ALL: [AttendeeLayout; 4] = [
        AttendeeLayout::Speaker,
        AttendeeLayout::Grid4,
        AttendeeLayout::Grid9,
        AttendeeLayout::Grid25,
    ];

    /// Attendees shown per grid page. Speaker view pages like a 2x2 grid.
    #[must_use]
    pub const fn per_page(self) -> usize {
        match self {
            AttendeeLayout::Speaker | AttendeeLayout::Grid4 => 4,
            AttendeeLayout::Grid9 => 9,
            AttendeeLayout::Grid25 => 25,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            AttendeeLayout::Speaker => "Speaker",
            AttendeeLayout::Grid4 => "2x2 Grid",
            AttendeeLayout::Grid9 => "3x3 Grid",
            AttendeeLayout::Grid25 => "5x5 Grid",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreAction {
    Connection(MeetingConnection),
    Device {
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
    AttendeeLayout(AttendeeLayout),
    ScreenShareState(RtcScreenShareState),
    WhiteBoardState(WhiteBoardState),
    SetMainAttendee(Option<Uid>),
    FocusMode(bool),
}

impl StoreAction {
    /// The store action an aggregator event maps to, if the store keeps it.
    #[must_use]
    pub fn from_event(ev: CommonEvent) -> Option<Self> {
        let action = match ev {
            CommonEvent::Connection { state, .. } => StoreAction::Connection(state),
            CommonEvent::DeviceList {
                device_type,
                current_device_id,
                devices,
            } => StoreAction::Device {
                device_type,
                current_device_id,
                devices,
            },
            CommonEvent::AttendeeNew { position, attendee } => {
                StoreAction::AttendeeNew { position, attendee }
            }
            CommonEvent::AttendeeUpdate { position, attendee } => {
                StoreAction::AttendeeUpdate { position, attendee }
            }
            CommonEvent::AttendeeRemove { position } => StoreAction::AttendeeRemove { position },
            CommonEvent::AttendeeReplace {
                old_position,
                new_position,
            } => StoreAction::AttendeeReplace {
                old_position,
                new_position,
            },
            CommonEvent::ScreenShareState { state, .. } => StoreAction::ScreenShareState(state),
            CommonEvent::WhiteBoardState(state) => StoreAction::WhiteBoardState(state),
            CommonEvent::VolumeIndications(_)
            | CommonEvent::WhiteboardInfo { .. }
            | CommonEvent::RtcError { .. } => return None,
        };
        Some(action)
    }
}
