use serde::{Deserialize, Serialize};

use crate::rtc::types::Uid;

/// What stream an attendee entry stands for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendeeKind {
    /// A real participant (camera and microphone).
    #[default]
    Camera,
    /// A screen-share stream owned by `parent_id`.
    ScreenShare,
    /// A media-player stream owned by `parent_id`.
    MediaPlayer,
}

/// Partial user record carried by RTC events.
///
/// Every field except `uid` is optional: `None` means "not part of this
/// change" and [`RtcUser::merge`] leaves the target field untouched. The serde
/// shape is the one exchanged over the data stream between clients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtcUser {
    pub uid: Uid,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub share_id: Option<Uid>,
    #[serde(default)]
    pub parent_id: Option<Uid>,
    #[serde(default)]
    pub kind: Option<AttendeeKind>,
    #[serde(default)]
    pub is_self: Option<bool>,
    #[serde(default)]
    pub is_camera_on: Option<bool>,
    #[serde(default)]
    pub is_audio_on: Option<bool>,
    #[serde(default)]
    pub is_camera_muted: Option<bool>,
    #[serde(default)]
    pub is_audio_muted: Option<bool>,
    #[serde(default, rename = "whiteboardUUID")]
    pub whiteboard_uuid: Option<String>,
    #[serde(default)]
    pub whiteboard_time_span: Option<String>,
}

/// Copies `src` into `dst` when `src` is present.
fn overwrite<T: Clone>(dst: &mut Option<T>, src: &Option<T>) {
    if src.is_some() {
        dst.clone_from(src);
    }
}

impl RtcUser {
    /// A patch that only identifies the user.
    #[must_use]
    pub fn new(uid: Uid) -> Self {
        Self {
            uid,
            ..Self::default()
        }
    }

    /// A fully populated remote user with every media flag off.
    #[must_use]
    pub fn remote(uid: Uid) -> Self {
        Self {
            uid,
            nickname: Some(String::new()),
            share_id: Some(0),
            parent_id: Some(0),
            kind: Some(AttendeeKind::Camera),
            is_self: Some(false),
            is_camera_on: Some(false),
            is_audio_on: Some(false),
            is_camera_muted: Some(false),
            is_audio_muted: Some(false),
            whiteboard_uuid: None,
            whiteboard_time_span: None,
        }
    }

    /// Overwrites every field present in `patch`. `uid` is never changed.
    pub fn merge(&mut self, patch: &RtcUser) {
        overwrite(&mut self.nickname, &patch.nickname);
        overwrite(&mut self.share_id, &patch.share_id);
        overwrite(&mut self.parent_id, &patch.parent_id);
        overwrite(&mut self.kind, &patch.kind);
        overwrite(&mut self.is_self, &patch.is_self);
        overwrite(&mut self.is_camera_on, &patch.is_camera_on);
        overwrite(&mut self.is_audio_on, &patch.is_audio_on);
        overwrite(&mut self.is_camera_muted, &patch.is_camera_muted);
        overwrite(&mut self.is_audio_muted, &patch.is_audio_muted);
        overwrite(&mut self.whiteboard_uuid, &patch.whiteboard_uuid);
        overwrite(&mut self.whiteboard_time_span, &patch.whiteboard_time_span);
    }

    #[must_use]
    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    #[must_use]
    pub fn with_camera(mut self, on: bool) -> Self {
        self.is_camera_on = Some(on);
        self
    }

    #[must_use]
    pub fn with_audio(mut self, on: bool) -> Self {
        self.is_audio_on = Some(on);
        self
    }

    #[must_use]
    pub fn with_whiteboard(mut self, uuid: impl Into<String>, time_span: impl Into<String>) -> Self {
        self.whiteboard_uuid = Some(uuid.into());
        self.whiteboard_time_span = Some(time_span.into());
        self
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn merge_only_overwrites_present_fields() {
        let mut base = RtcUser::remote(7).with_nickname("ana").with_audio(true);
        let patch = RtcUser::new(7).with_camera(true);

        base.merge(&patch);

        assert_eq!(base.nickname.as_deref(), Some("ana"));
        assert_eq!(base.is_audio_on, Some(true));
        assert_eq!(base.is_camera_on, Some(true));
        assert_eq!(base.is_self, Some(false));
    }

    #[test]
    fn merge_keeps_uid_of_target() {
        let mut base = RtcUser::new(1);
        base.merge(&RtcUser::new(2).with_nickname("x"));
        assert_eq!(base.uid, 1);
        assert_eq!(base.nickname.as_deref(), Some("x"));
    }

    #[test]
    fn empty_string_is_a_present_value() {
        let mut base = RtcUser::new(1).with_whiteboard("room", "span");
        base.merge(&RtcUser::new(1).with_whiteboard("", ""));
        assert_eq!(base.whiteboard_uuid.as_deref(), Some(""));
    }

    #[test]
    fn data_stream_shape_uses_camel_case_and_tolerates_missing_fields() {
        let json = r#"{"uid":42,"nickname":"bo","shareId":43,"whiteboardUUID":"u"}"#;
        let user: RtcUser = serde_json::from_str(json).expect("valid user json");
        assert_eq!(user.uid, 42);
        assert_eq!(user.share_id, Some(43));
        assert_eq!(user.whiteboard_uuid.as_deref(), Some("u"));
        assert_eq!(user.is_camera_on, None);

        let back = serde_json::to_string(&user).expect("serializable");
        assert!(back.contains("\"shareId\":43"));
        assert!(back.contains("\"whiteboardUUID\":\"u\""));
    }
}
