//! Seam between the meeting client and the native RTC SDK.
//!
//! The SDK owns transport, encoding, rendering and device access. The client
//! issues commands through [`RtcEngine`] and learns about their outcome by
//! draining [`EngineNotification`]s on its own thread.

use crate::rtc::{
    rtc_error::Result,
    types::{
        RtcAudioVolumeIndication, RtcConnection, RtcConnectionReason, RtcDeviceInfo,
        RtcDeviceType, RtcUserOfflineReason, RtcVideoStreamType, Uid, VideoEncoderConfiguration,
    },
};

/// What to capture for a screen share.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenShareTarget {
    Display(u32),
    Window(u32),
}

/// Raw callback from the native engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineNotification {
    JoinedChannel { channel: String, uid: Uid },
    LeftChannel,
    ConnectionStateChanged {
        state: RtcConnection,
        reason: RtcConnectionReason,
    },
    UserJoined(Uid),
    UserOffline { uid: Uid, reason: RtcUserOfflineReason },
    LocalVideoStateChanged { on: bool },
    RemoteVideoStateChanged { uid: Uid, on: bool },
    RemoteAudioStateChanged { uid: Uid, on: bool },
    DeviceStateChanged(RtcDeviceType),
    VolumeIndication(Vec<RtcAudioVolumeIndication>),
    StreamMessage { uid: Uid, payload: String },
    ScreenShareStarted,
    ScreenShareStopped { window_closed: bool },
    Error { code: i32, message: String },
}

/// Command surface of the native RTC SDK.
pub trait RtcEngine: Send {
    /// # Errors
    /// Returns [`RtcError::Engine`](crate::rtc::rtc_error::RtcError::Engine) if the SDK rejects the app id.
    fn initialize(&mut self, app_id: &str, log_path: &str) -> Result<()>;
    fn release(&mut self);

    /// # Errors
    /// Returns an engine error if the SDK refuses the join.
    fn join_channel(&mut self, channel: &str, uid: Uid) -> Result<()>;
    /// # Errors
    /// Returns an engine error if the SDK refuses to leave.
    fn leave_channel(&mut self) -> Result<()>;

    fn enable_local_video(&mut self, enable: bool);
    fn enable_local_audio(&mut self, enable: bool);
    fn mute_local_audio_stream(&mut self, mute: bool);
    fn mute_local_video_stream(&mut self, mute: bool);
    fn set_remote_video_stream_type(&mut self, uid: Uid, stream_type: RtcVideoStreamType);
    fn set_video_encoder_configuration(&mut self, configuration: VideoEncoderConfiguration);

    fn devices(&self, device_type: RtcDeviceType) -> Vec<RtcDeviceInfo>;
    fn current_device(&self, device_type: RtcDeviceType) -> String;
    /// # Errors
    /// Returns an engine error for an unknown device id.
    fn set_current_device(&mut self, device_type: RtcDeviceType, device_id: &str) -> Result<()>;

    /// Playback (speaker) volume, `0..=255`.
    fn set_audio_playback_volume(&mut self, volume: u8);
    fn audio_playback_volume(&self) -> u8;
    /// Recording (microphone) volume, `0..=255`.
    fn set_audio_recording_volume(&mut self, volume: u8);
    fn audio_recording_volume(&self) -> u8;

    /// Plays `file_path` on the current playback device.
    ///
    /// # Errors
    /// Returns an engine error if the file cannot be played.
    fn start_audio_playback_device_test(&mut self, file_path: &str) -> Result<()>;
    fn stop_audio_playback_device_test(&mut self);
    /// Captures from the current recording device and reports its level as a
    /// [`EngineNotification::VolumeIndication`] for uid 0 every
    /// `indication_interval_ms`.
    ///
    /// # Errors
    /// Returns an engine error if capture cannot start.
    fn start_audio_recording_device_test(&mut self, indication_interval_ms: u32) -> Result<()>;
    fn stop_audio_recording_device_test(&mut self);

    /// # Errors
    /// Returns an engine error if the data stream is not open.
    fn send_stream_message(&mut self, payload: &str) -> Result<()>;

    /// # Errors
    /// Returns an engine error if capture cannot start.
    fn start_screen_share(&mut self, channel: &str, share_uid: Uid, target: ScreenShareTarget)
    -> Result<()>;
    fn stop_screen_share(&mut self);

    /// Takes every notification raised since the last call, oldest first.
    fn drain_notifications(&mut self) -> Vec<EngineNotification>;
}
