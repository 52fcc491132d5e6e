//! Plain value types exchanged with the native RTC engine.

use std::fmt;

/// Numeric participant identifier assigned by the RTC engine.
pub type Uid = u32;

/// Channel connection state as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RtcConnection {
    Disconnected,
    Connecting,
    Connected,
    ReConnecting,
    Disconnecting,
}

/// Why the connection state changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RtcConnectionReason {
    None,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RtcDeviceType {
    Camera,
    Microphone,
    Speaker,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtcDeviceInfo {
    pub device_id: String,
    pub device_name: String,
}

impl RtcDeviceInfo {
    pub fn new(device_id: impl Into<String>, device_name: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            device_name: device_name.into(),
        }
    }
}

/// Classification of a user-state change.
///
/// `Info` is a lightweight refresh (nickname, share linkage) that never moves
/// an attendee; `Media` and `WhiteBoard` may change its on-screen priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RtcUserUpdateReason {
    Info,
    Media,
    WhiteBoard,
}

/// Why a remote user left, as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtcUserOfflineReason {
    Quit,
    Dropped,
    BecameAudience,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtcVideoStreamType {
    High,
    Low,
}

/// Per-speaker volume sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtcAudioVolumeIndication {
    pub uid: Uid,
    pub volume: u8,
}

/// Parameters for joining a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtcJoinParams {
    pub channel_name: String,
    pub nickname: String,
    pub is_camera_on: bool,
    pub is_audio_on: bool,
}

/// Outgoing video quality preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoEncoderConfigurationType {
    Low,
    Medium,
    High,
}

/// Concrete encoder parameters behind a [`VideoEncoderConfigurationType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoEncoderConfiguration {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub bitrate_kbps: u32,
}

impl VideoEncoderConfigurationType {
    /// Case-insensitive `low`, `medium` or `high`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    #[must_use]
    pub const fn preset(self) -> VideoEncoderConfiguration {
        match self {
            Self::Low => VideoEncoderConfiguration {
                width: 640,
                height: 480,
                frame_rate: 15,
                bitrate_kbps: 800,
            },
            Self::Medium => VideoEncoderConfiguration {
                width: 960,
                height: 720,
                frame_rate: 15,
                bitrate_kbps: 1228,
            },
            Self::High => VideoEncoderConfiguration {
                width: 1920,
                height: 1080,
                frame_rate: 15,
                bitrate_kbps: 2560,
            },
        }
    }
}

impl fmt::Display for VideoEncoderConfigurationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoder_type_names_are_case_insensitive() {
        assert_eq!(
            VideoEncoderConfigurationType::from_name(" Medium "),
            Some(VideoEncoderConfigurationType::Medium)
        );
        assert_eq!(VideoEncoderConfigurationType::from_name("ultra"), None);
    }

    #[test]
    fn presets_grow_with_quality() {
        let low = VideoEncoderConfigurationType::Low.preset();
        let high = VideoEncoderConfigurationType::High.preset();
        assert!(low.width < high.width);
        assert!(low.bitrate_kbps < high.bitrate_kbps);
    }
}
