//! On-screen priority of roster entries. Lower sorts earlier.

use crate::{attendee::attendee::Attendee, rtc::user::AttendeeKind};

pub const SELF_PRIORITY: i32 = -9999;
pub const SELF_MEDIA_PLAYER_PRIORITY: i32 = -9998;
pub const SELF_SCREEN_SHARE_PRIORITY: i32 = -9997;

const AUDIO_WEIGHT: i32 = 1;
const CAMERA_WEIGHT: i32 = 2;
const WHITEBOARD_WEIGHT: i32 = 4;

#[must_use]
pub fn priority(attendee: &Attendee) -> i32 {
    if attendee.is_self {
        return match attendee.kind {
            AttendeeKind::ScreenShare => SELF_SCREEN_SHARE_PRIORITY,
            AttendeeKind::MediaPlayer => SELF_MEDIA_PLAYER_PRIORITY,
            AttendeeKind::Camera => SELF_PRIORITY,
        };
    }
    let mut p = 0;
    if attendee.is_audio_on {
        p -= AUDIO_WEIGHT;
    }
    if attendee.is_camera_on {
        p -= CAMERA_WEIGHT;
    }
    if attendee.has_whiteboard {
        p -= WHITEBOARD_WEIGHT;
    }
    p
}
