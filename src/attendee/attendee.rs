use crate::rtc::{
    types::Uid,
    user::{AttendeeKind, RtcUser},
};

/// One roster entry: a participant, or a stream a participant owns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attendee {
    pub uid: Uid,
    pub nickname: Option<String>,
    /// Uid of this attendee's screen-share stream, 0 if none.
    pub share_id: Uid,
    /// Uid of the owning attendee for share/player streams, 0 otherwise.
    pub parent_id: Uid,
    pub kind: AttendeeKind,
    pub is_self: bool,
    pub is_camera_on: bool,
    pub is_audio_on: bool,
    pub is_camera_muted: bool,
    pub is_audio_muted: bool,
    pub whiteboard_uuid: Option<String>,
    pub whiteboard_time_span: Option<String>,
    /// Derived: both whiteboard fields present and non-empty.
    pub has_whiteboard: bool,
}

fn set_if_present<T: Clone>(dst: &mut T, src: Option<&T>) {
    if let Some(v) = src {
        dst.clone_from(v);
    }
}

impl Attendee {
    #[must_use]
    pub fn from_user(user: &RtcUser) -> Self {
        let mut attendee = Attendee {
            uid: user.uid,
            ..Attendee::default()
        };
        attendee.apply(user);
        attendee
    }

    /// Overwrites every field `patch` carries and recomputes `has_whiteboard`.
    pub fn apply(&mut self, patch: &RtcUser) {
        if patch.nickname.is_some() {
            self.nickname.clone_from(&patch.nickname);
        }
        set_if_present(&mut self.share_id, patch.share_id.as_ref());
        set_if_present(&mut self.parent_id, patch.parent_id.as_ref());
        set_if_present(&mut self.kind, patch.kind.as_ref());
        set_if_present(&mut self.is_self, patch.is_self.as_ref());
        set_if_present(&mut self.is_camera_on, patch.is_camera_on.as_ref());
        set_if_present(&mut self.is_audio_on, patch.is_audio_on.as_ref());
        set_if_present(&mut self.is_camera_muted, patch.is_camera_muted.as_ref());
        set_if_present(&mut self.is_audio_muted, patch.is_audio_muted.as_ref());
        if patch.whiteboard_uuid.is_some() {
            self.whiteboard_uuid.clone_from(&patch.whiteboard_uuid);
        }
        if patch.whiteboard_time_span.is_some() {
            self.whiteboard_time_span.clone_from(&patch.whiteboard_time_span);
        }
        self.has_whiteboard = non_empty(self.whiteboard_uuid.as_deref())
            && non_empty(self.whiteboard_time_span.as_deref());
    }

    /// Name to show in the UI, falling back to the uid.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self.nickname.as_deref() {
            Some(name) if !name.is_empty() => name.to_owned(),
            _ => self.uid.to_string(),
        }
    }
}

fn non_empty(s: Option<&str>) -> bool {
    s.is_some_and(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn absent_fields_keep_their_value() {
        let mut a = Attendee::from_user(&RtcUser::remote(4).with_nickname("kim").with_audio(true));
        a.apply(&RtcUser::new(4).with_camera(true));

        assert_eq!(a.nickname.as_deref(), Some("kim"));
        assert!(a.is_audio_on);
        assert!(a.is_camera_on);
        assert_eq!(a.uid, 4);
    }

    #[test]
    fn whiteboard_needs_both_values() {
        let mut a = Attendee::from_user(&RtcUser::new(1));
        assert!(!a.has_whiteboard);

        a.apply(&RtcUser {
            whiteboard_uuid: Some("room".into()),
            ..RtcUser::new(1)
        });
        assert!(!a.has_whiteboard);

        a.apply(&RtcUser {
            whiteboard_time_span: Some("span".into()),
            ..RtcUser::new(1)
        });
        assert!(a.has_whiteboard);

        a.apply(&RtcUser::new(1).with_whiteboard("", ""));
        assert!(!a.has_whiteboard);
    }

    #[test]
    fn display_name_falls_back_to_uid() {
        assert_eq!(Attendee::from_user(&RtcUser::remote(12)).display_name(), "12");
        assert_eq!(
            Attendee::from_user(&RtcUser::new(12).with_nickname("li")).display_name(),
            "li"
        );
    }
}
