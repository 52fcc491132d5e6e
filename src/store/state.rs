use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    attendee::attendee::Attendee,
    common::events::WhiteBoardState,
    log::log_sink::LogSink,
    meeting::types::MeetingConnection,
    rtc::{
        events::RtcScreenShareState,
        types::{RtcDeviceInfo, RtcDeviceType, Uid},
    },
    sink_debug, sink_warn,
    store::action::{AttendeeLayout, StoreAction},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceList {
    pub current_device_id: String,
    pub devices: Vec<RtcDeviceInfo>,
}

/// Render-side snapshot of the meeting.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreState {
    pub connection: MeetingConnection,
    pub attendees: Vec<Attendee>,
    /// Attendee pinned to the main view by the user.
    pub main_attendee: Option<Uid>,
    pub devices: HashMap<RtcDeviceType, DeviceList>,
    pub attendee_layout: AttendeeLayout,
    pub screenshare_state: RtcScreenShareState,
    pub whiteboard_state: WhiteBoardState,
    pub focus_mode: bool,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            connection: MeetingConnection::Disconnected,
            attendees: Vec::new(),
            main_attendee: None,
            devices: HashMap::new(),
            attendee_layout: AttendeeLayout::default(),
            screenshare_state: RtcScreenShareState::Idle,
            whiteboard_state: WhiteBoardState::Idle,
            focus_mode: false,
        }
    }
}

impl StoreState {
    /// The attendee shown in the main view: the pinned one while it is
    /// still present, otherwise the first remote, otherwise self.
    #[must_use]
    pub fn main_attendee(&self) -> Option<&Attendee> {
        self.main_attendee
            .and_then(|uid| self.attendees.iter().find(|a| a.uid == uid))
            .or_else(|| self.attendees.get(1))
            .or_else(|| self.attendees.first())
    }

    #[must_use]
    pub fn device_list(&self, device_type: RtcDeviceType) -> Option<&DeviceList> {
        self.devices.get(&device_type)
    }

    #[must_use]
    pub fn grid_page_count(&self) -> usize {
        self.attendees
            .len()
            .div_ceil(self.attendee_layout.per_page())
    }

    /// Attendees on grid page `page` (0-based). Empty past the last page.
    #[must_use]
    pub fn grid_page(&self, page: usize) -> &[Attendee] {
        let per_page = self.attendee_layout.per_page();
        let start = page.saturating_mul(per_page).min(self.attendees.len());
        let end = start.saturating_add(per_page).min(self.attendees.len());
        &self.attendees[start..end]
    }

    /// `(columns, rows)` of the grid: the full layout square once a page is
    /// full, otherwise the smallest square holding every attendee.
    #[must_use]
    pub fn grid_dimensions(&self) -> (usize, usize) {
        let per_page = self.attendee_layout.per_page();
        let shown = self.attendees.len().min(per_page);
        let mut side = 1;
        while side * side < shown {
            side += 1;
        }
        (side, side)
    }
}

/// Owns the [`StoreState`] and applies [`StoreAction`]s to it.
pub struct Store {
    log: Arc<dyn LogSink>,
    state: StoreState,
}

impl Store {
    pub fn new(log: Arc<dyn LogSink>) -> Self {
        Self {
            log,
            state: StoreState::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn dispatch(&mut self, action: StoreAction) {
        let st = &mut self.state;
        match action {
            StoreAction::Connection(connection) => {
                if connection == MeetingConnection::Connecting {
                    st.attendees.clear();
                    st.main_attendee = None;
                    st.focus_mode = false;
                }
                st.connection = connection;
            }
            StoreAction::Device {
                device_type,
                current_device_id,
                devices,
            } => {
                st.devices.insert(
                    device_type,
                    DeviceList {
                        current_device_id,
                        devices,
                    },
                );
            }
            StoreAction::AttendeeNew { position, attendee } => {
                if position > st.attendees.len() {
                    sink_warn!(
                        self.log,
                        "store attendee new at {} out of range {}",
                        position,
                        st.attendees.len()
                    );
                    return;
                }
                st.attendees.insert(position, attendee);
            }
            StoreAction::AttendeeUpdate { position, attendee } => {
                match st.attendees.get_mut(position) {
                    Some(slot) => *slot = attendee,
                    None => sink_warn!(self.log, "store attendee update at {} out of range", position),
                }
            }
            StoreAction::AttendeeRemove { position } => {
                if position >= st.attendees.len() {
                    sink_warn!(self.log, "store attendee remove at {} out of range", position);
                    return;
                }
                st.attendees.remove(position);
            }
            StoreAction::AttendeeReplace {
                old_position,
                new_position,
            } => {
                let len = st.attendees.len();
                if old_position >= len || new_position >= len {
                    sink_warn!(
                        self.log,
                        "store attendee replace {} -> {} out of range {}",
                        old_position,
                        new_position,
                        len
                    );
                    return;
                }
                let moved = st.attendees.remove(old_position);
                st.attendees.insert(new_position, moved);
            }
            StoreAction::AttendeeLayout(layout) => st.attendee_layout = layout,
            StoreAction::ScreenShareState(state) => st.screenshare_state = state,
            StoreAction::WhiteBoardState(state) => st.whiteboard_state = state,
            StoreAction::SetMainAttendee(uid) => {
                sink_debug!(self.log, "store main attendee {:?}", uid);
                st.main_attendee = uid;
            }
            StoreAction::FocusMode(on) => st.focus_mode = on,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::log::{MemoryLogSink, NoopLogSink, log_level::LogLevel};

    fn attendee(uid: Uid) -> Attendee {
        Attendee {
            uid,
            is_self: uid == 1,
            ..Attendee::default()
        }
    }

    fn store_with(uids: &[Uid]) -> Store {
        let mut store = Store::new(Arc::new(NoopLogSink));
        for (position, uid) in uids.iter().enumerate() {
            store.dispatch(StoreAction::AttendeeNew {
                position,
                attendee: attendee(*uid),
            });
        }
        store
    }

    fn uids(store: &Store) -> Vec<Uid> {
        store.state().attendees.iter().map(|a| a.uid).collect()
    }

    #[test]
    fn positional_actions_follow_the_reducer_contract() {
        let mut store = store_with(&[1, 2, 3, 4]);
        store.dispatch(StoreAction::AttendeeReplace {
            old_position: 3,
            new_position: 1,
        });
        assert_eq!(uids(&store), vec![1, 4, 2, 3]);

        store.dispatch(StoreAction::AttendeeRemove { position: 2 });
        assert_eq!(uids(&store), vec![1, 4, 3]);

        let mut renamed = attendee(3);
        renamed.nickname = Some("zoe".into());
        store.dispatch(StoreAction::AttendeeUpdate {
            position: 2,
            attendee: renamed,
        });
        assert_eq!(store.state().attendees[2].nickname.as_deref(), Some("zoe"));
    }

    #[test]
    fn out_of_range_positions_are_logged_and_ignored() {
        let log = Arc::new(MemoryLogSink::new());
        let mut store = Store::new(log.clone());
        store.dispatch(StoreAction::AttendeeNew {
            position: 0,
            attendee: attendee(1),
        });
        let before = store.state().clone();

        store.dispatch(StoreAction::AttendeeNew {
            position: 5,
            attendee: attendee(2),
        });
        store.dispatch(StoreAction::AttendeeRemove { position: 1 });
        store.dispatch(StoreAction::AttendeeReplace {
            old_position: 0,
            new_position: 3,
        });
        store.dispatch(StoreAction::AttendeeUpdate {
            position: 9,
            attendee: attendee(9),
        });

        assert_eq!(store.state(), &before);
        assert_eq!(
            log.lines()
                .iter()
                .filter(|(lvl, _)| *lvl == LogLevel::Warn)
                .count(),
            4
        );
    }

    #[test]
    fn connecting_clears_meeting_state() {
        let mut store = store_with(&[1, 2]);
        store.dispatch(StoreAction::SetMainAttendee(Some(2)));
        store.dispatch(StoreAction::AttendeeLayout(AttendeeLayout::Grid9));
        store.dispatch(StoreAction::Connection(MeetingConnection::Connecting));

        assert!(store.state().attendees.is_empty());
        assert_eq!(store.state().main_attendee, None);
        assert_eq!(store.state().attendee_layout, AttendeeLayout::Grid9);
        assert_eq!(store.state().connection, MeetingConnection::Connecting);
    }

    #[test]
    fn main_attendee_prefers_pin_then_first_remote_then_self() {
        let mut store = store_with(&[1]);
        assert_eq!(store.state().main_attendee().map(|a| a.uid), Some(1));

        store.dispatch(StoreAction::AttendeeNew {
            position: 1,
            attendee: attendee(2),
        });
        store.dispatch(StoreAction::AttendeeNew {
            position: 2,
            attendee: attendee(3),
        });
        assert_eq!(store.state().main_attendee().map(|a| a.uid), Some(2));

        store.dispatch(StoreAction::SetMainAttendee(Some(3)));
        assert_eq!(store.state().main_attendee().map(|a| a.uid), Some(3));

        store.dispatch(StoreAction::AttendeeRemove { position: 2 });
        assert_eq!(store.state().main_attendee().map(|a| a.uid), Some(2));
    }

    #[test]
    fn grid_paging_and_dimensions() {
        let all: Vec<Uid> = (1..=11).collect();
        let mut store = store_with(&all);
        store.dispatch(StoreAction::AttendeeLayout(AttendeeLayout::Grid4));
        assert_eq!(store.state().grid_page_count(), 3);
        assert_eq!(store.state().grid_page(2).len(), 3);
        assert!(store.state().grid_page(7).is_empty());
        assert_eq!(store.state().grid_dimensions(), (2, 2));

        store.dispatch(StoreAction::AttendeeLayout(AttendeeLayout::Grid25));
        assert_eq!(store.state().grid_page_count(), 1);
        assert_eq!(store.state().grid_dimensions(), (4, 4));

        let small = store_with(&[1, 2, 3]);
        assert_eq!(small.state().grid_dimensions(), (2, 2));
        assert_eq!(Store::new(Arc::new(NoopLogSink)).state().grid_page_count(), 0);
    }

    #[test]
    fn device_lists_are_kept_per_type() {
        let mut store = Store::new(Arc::new(NoopLogSink));
        store.dispatch(StoreAction::Device {
            device_type: RtcDeviceType::Microphone,
            current_device_id: "mic-1".into(),
            devices: vec![RtcDeviceInfo::new("mic-1", "Desk mic")],
        });
        let mics = store
            .state()
            .device_list(RtcDeviceType::Microphone)
            .expect("microphones");
        assert_eq!(mics.current_device_id, "mic-1");
        assert!(store.state().device_list(RtcDeviceType::Camera).is_none());
    }
}
