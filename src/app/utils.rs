use eframe::egui;

use crate::{attendee::attendee::Attendee, rtc::user::AttendeeKind};

const TILE_BG: egui::Color32 = egui::Color32::from_rgb(32, 34, 40);
const TILE_BG_CAMERA: egui::Color32 = egui::Color32::from_rgb(40, 70, 96);
const SPEAKING_STROKE: egui::Color32 = egui::Color32::from_rgb(80, 200, 120);

/// Engine volume (`0..=255`) as a rounded-up percentage.
pub fn volume_to_percent(volume: u8) -> u8 {
    let pct = (u32::from(volume) * 100).div_ceil(255).min(100);
    u8::try_from(pct).unwrap_or(100)
}

/// Percentage back to engine volume, rounded up and capped at 255.
pub fn percent_to_volume(percent: u8) -> u8 {
    let volume = (u32::from(percent) * 255).div_ceil(100).min(255);
    u8::try_from(volume).unwrap_or(u8::MAX)
}

/// Short status line for an attendee: media flags and extra streams.
pub fn attendee_badges(attendee: &Attendee) -> String {
    let mic = match (attendee.is_audio_on, attendee.is_audio_muted) {
        (true, false) => "mic",
        (true, true) => "mic (muted)",
        (false, _) => "mic off",
    };
    let cam = match (attendee.is_camera_on, attendee.is_camera_muted) {
        (true, false) => "cam",
        (true, true) => "cam (muted)",
        (false, _) => "cam off",
    };
    let mut line = format!("{mic} | {cam}");
    if attendee.has_whiteboard {
        line.push_str(" | whiteboard");
    }
    if attendee.share_id != 0 {
        line.push_str(" | sharing");
    }
    match attendee.kind {
        AttendeeKind::ScreenShare => line.push_str(" | screen"),
        AttendeeKind::MediaPlayer => line.push_str(" | player"),
        AttendeeKind::Camera => {}
    }
    line
}

/// Paints a placeholder video tile. Video itself is rendered by the engine.
pub fn attendee_tile(
    ui: &mut egui::Ui,
    attendee: &Attendee,
    size: egui::Vec2,
    speaking: bool,
) -> egui::Response {
    let (rect, response) = ui.allocate_exact_size(size, egui::Sense::click());
    let painter = ui.painter();
    let bg = if attendee.is_camera_on {
        TILE_BG_CAMERA
    } else {
        TILE_BG
    };
    painter.rect_filled(rect, 6.0, bg);
    if speaking {
        painter.rect_stroke(rect, 6.0, egui::Stroke::new(2.0, SPEAKING_STROKE));
    }

    let mut name = attendee.display_name();
    if attendee.is_self {
        name.push_str(" (me)");
    }
    painter.text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        name,
        egui::FontId::proportional((size.y / 8.0).clamp(12.0, 28.0)),
        egui::Color32::WHITE,
    );
    painter.text(
        rect.left_bottom() + egui::vec2(8.0, -8.0),
        egui::Align2::LEFT_BOTTOM,
        attendee_badges(attendee),
        egui::FontId::proportional(12.0),
        egui::Color32::LIGHT_GRAY,
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn badges_reflect_media_and_streams() {
        let a = Attendee {
            uid: 3,
            is_audio_on: true,
            is_audio_muted: true,
            has_whiteboard: true,
            ..Attendee::default()
        };
        assert_eq!(attendee_badges(&a), "mic (muted) | cam off | whiteboard");
    }

    #[test]
    fn volume_percent_conversion_covers_the_full_range() {
        assert_eq!(volume_to_percent(0), 0);
        assert_eq!(volume_to_percent(u8::MAX), 100);
        assert_eq!(volume_to_percent(1), 1);
        assert_eq!(percent_to_volume(0), 0);
        assert_eq!(percent_to_volume(100), u8::MAX);
        assert_eq!(percent_to_volume(50), 128);
        assert_eq!(percent_to_volume(200), u8::MAX);
    }
}
