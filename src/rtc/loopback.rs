//! In-process [`RtcEngine`] used by the demo client and the tests.
//!
//! It answers `join_channel`/`leave_channel`/screen-share calls with the
//! notifications a real SDK would raise, records every command, and lets the
//! caller inject arbitrary notifications (remote users joining, media toggles).
//! Clones share the same state, so one clone can be boxed into an
//! [`RtcManager`](crate::rtc::manager::RtcManager) while another drives it.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::rtc::{
    engine::{EngineNotification, RtcEngine, ScreenShareTarget},
    rtc_error::{Result, RtcError},
    types::{
        RtcAudioVolumeIndication, RtcDeviceInfo, RtcDeviceType, RtcUserOfflineReason, RtcVideoStreamType, Uid,
        VideoEncoderConfiguration,
    },
};

/// A command the client issued to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    Initialize { app_id: String },
    Release,
    JoinChannel { channel: String, uid: Uid },
    LeaveChannel,
    EnableLocalVideo(bool),
    EnableLocalAudio(bool),
    MuteLocalAudio(bool),
    MuteLocalVideo(bool),
    SetRemoteVideoStreamType { uid: Uid, stream_type: RtcVideoStreamType },
    SetVideoEncoderConfiguration(VideoEncoderConfiguration),
    SetCurrentDevice { device_type: RtcDeviceType, device_id: String },
    SetAudioPlaybackVolume(u8),
    SetAudioRecordingVolume(u8),
    StartAudioPlaybackDeviceTest(String),
    StopAudioPlaybackDeviceTest,
    StartAudioRecordingDeviceTest { indication_interval_ms: u32 },
    StopAudioRecordingDeviceTest,
    SendStreamMessage(String),
    StartScreenShare { share_uid: Uid, target: ScreenShareTarget },
    StopScreenShare,
}

#[derive(Default)]
struct LoopbackState {
    auto_ack: bool,
    in_channel: bool,
    sharing: bool,
    channel: String,
    playback_volume: u8,
    recording_volume: u8,
    commands: Vec<EngineCommand>,
    pending: VecDeque<EngineNotification>,
    devices: HashMap<RtcDeviceType, (String, Vec<RtcDeviceInfo>)>,
    fail_next_join: Option<RtcError>,
    fail_next_leave: Option<RtcError>,
}

#[derive(Clone)]
pub struct LoopbackEngine {
    state: Arc<Mutex<LoopbackState>>,
}

impl Default for LoopbackEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackEngine {
    /// An engine that acknowledges join/leave/share commands on its own.
    #[must_use]
    pub fn new() -> Self {
        let mut devices = HashMap::new();
        devices.insert(
            RtcDeviceType::Camera,
            ("cam-0".to_owned(), vec![RtcDeviceInfo::new("cam-0", "Loopback Camera")]),
        );
        devices.insert(
            RtcDeviceType::Microphone,
            ("mic-0".to_owned(), vec![RtcDeviceInfo::new("mic-0", "Loopback Microphone")]),
        );
        devices.insert(
            RtcDeviceType::Speaker,
            ("spk-0".to_owned(), vec![RtcDeviceInfo::new("spk-0", "Loopback Speaker")]),
        );
        Self {
            state: Arc::new(Mutex::new(LoopbackState {
                auto_ack: true,
                playback_volume: u8::MAX,
                recording_volume: u8::MAX,
                devices,
                ..LoopbackState::default()
            })),
        }
    }

    /// An engine that never raises notifications by itself.
    #[must_use]
    pub fn manual() -> Self {
        let engine = Self::new();
        engine.lock().auto_ack = false;
        engine
    }

    fn lock(&self) -> MutexGuard<'_, LoopbackState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Queues a notification for the next drain.
    pub fn inject(&self, notification: EngineNotification) {
        self.lock().pending.push_back(notification);
    }

    /// Simulates a remote participant joining with the given media state.
    pub fn remote_joined(&self, uid: Uid, camera_on: bool, audio_on: bool) {
        let mut st = self.lock();
        st.pending.push_back(EngineNotification::UserJoined(uid));
        if camera_on {
            st.pending
                .push_back(EngineNotification::RemoteVideoStateChanged { uid, on: true });
        }
        if audio_on {
            st.pending
                .push_back(EngineNotification::RemoteAudioStateChanged { uid, on: true });
        }
    }

    pub fn remote_left(&self, uid: Uid) {
        self.inject(EngineNotification::UserOffline {
            uid,
            reason: RtcUserOfflineReason::Quit,
        });
    }

    /// Replaces the device list for `device_type` and raises a device change.
    pub fn set_devices(&self, device_type: RtcDeviceType, current: &str, devices: Vec<RtcDeviceInfo>) {
        let mut st = self.lock();
        st.devices.insert(device_type, (current.to_owned(), devices));
        st.pending
            .push_back(EngineNotification::DeviceStateChanged(device_type));
    }

    /// Makes the next `join_channel` fail with `err`.
    pub fn fail_next_join(&self, err: RtcError) {
        self.lock().fail_next_join = Some(err);
    }

    pub fn fail_next_leave(&self, err: RtcError) {
        self.lock().fail_next_leave = Some(err);
    }

    #[must_use]
    pub fn commands(&self) -> Vec<EngineCommand> {
        self.lock().commands.clone()
    }

    /// Payloads passed to `send_stream_message`, oldest first.
    #[must_use]
    pub fn sent_messages(&self) -> Vec<String> {
        self.lock()
            .commands
            .iter()
            .filter_map(|c| match c {
                EngineCommand::SendStreamMessage(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn is_in_channel(&self) -> bool {
        self.lock().in_channel
    }
}

impl RtcEngine for LoopbackEngine {
    fn initialize(&mut self, app_id: &str, _log_path: &str) -> Result<()> {
        self.lock().commands.push(EngineCommand::Initialize {
            app_id: app_id.to_owned(),
        });
        Ok(())
    }

    fn release(&mut self) {
        let mut st = self.lock();
        st.commands.push(EngineCommand::Release);
        st.in_channel = false;
        st.sharing = false;
        st.pending.clear();
    }

    fn join_channel(&mut self, channel: &str, uid: Uid) -> Result<()> {
        let mut st = self.lock();
        if let Some(err) = st.fail_next_join.take() {
            return Err(err);
        }
        st.commands.push(EngineCommand::JoinChannel {
            channel: channel.to_owned(),
            uid,
        });
        st.in_channel = true;
        st.channel = channel.to_owned();
        if st.auto_ack {
            st.pending.push_back(EngineNotification::JoinedChannel {
                channel: channel.to_owned(),
                uid,
            });
        }
        Ok(())
    }

    fn leave_channel(&mut self) -> Result<()> {
        let mut st = self.lock();
        if let Some(err) = st.fail_next_leave.take() {
            return Err(err);
        }
        st.commands.push(EngineCommand::LeaveChannel);
        st.in_channel = false;
        st.channel.clear();
        if st.auto_ack {
            st.pending.push_back(EngineNotification::LeftChannel);
        }
        Ok(())
    }

    fn enable_local_video(&mut self, enable: bool) {
        let mut st = self.lock();
        st.commands.push(EngineCommand::EnableLocalVideo(enable));
        if st.auto_ack && st.in_channel {
            st.pending
                .push_back(EngineNotification::LocalVideoStateChanged { on: enable });
        }
    }

    fn enable_local_audio(&mut self, enable: bool) {
        self.lock().commands.push(EngineCommand::EnableLocalAudio(enable));
    }

    fn mute_local_audio_stream(&mut self, mute: bool) {
        self.lock().commands.push(EngineCommand::MuteLocalAudio(mute));
    }

    fn mute_local_video_stream(&mut self, mute: bool) {
        self.lock().commands.push(EngineCommand::MuteLocalVideo(mute));
    }

    fn set_remote_video_stream_type(&mut self, uid: Uid, stream_type: RtcVideoStreamType) {
        self.lock()
            .commands
            .push(EngineCommand::SetRemoteVideoStreamType { uid, stream_type });
    }

    fn set_video_encoder_configuration(&mut self, configuration: VideoEncoderConfiguration) {
        self.lock()
            .commands
            .push(EngineCommand::SetVideoEncoderConfiguration(configuration));
    }

    fn devices(&self, device_type: RtcDeviceType) -> Vec<RtcDeviceInfo> {
        self.lock()
            .devices
            .get(&device_type)
            .map(|(_, list)| list.clone())
            .unwrap_or_default()
    }

    fn current_device(&self, device_type: RtcDeviceType) -> String {
        self.lock()
            .devices
            .get(&device_type)
            .map(|(current, _)| current.clone())
            .unwrap_or_default()
    }

    fn set_current_device(&mut self, device_type: RtcDeviceType, device_id: &str) -> Result<()> {
        let mut st = self.lock();
        let Some((current, list)) = st.devices.get_mut(&device_type) else {
            return Err(RtcError::Engine {
                code: -2,
                message: format!("no {device_type:?} devices"),
            });
        };
        if !list.iter().any(|d| d.device_id == device_id) {
            return Err(RtcError::Engine {
                code: -2,
                message: format!("unknown device '{device_id}'"),
            });
        }
        *current = device_id.to_owned();
        st.commands.push(EngineCommand::SetCurrentDevice {
            device_type,
            device_id: device_id.to_owned(),
        });
        Ok(())
    }

    fn set_audio_playback_volume(&mut self, volume: u8) {
        let mut st = self.lock();
        st.playback_volume = volume;
        st.commands.push(EngineCommand::SetAudioPlaybackVolume(volume));
    }

    fn audio_playback_volume(&self) -> u8 {
        self.lock().playback_volume
    }

    fn set_audio_recording_volume(&mut self, volume: u8) {
        let mut st = self.lock();
        st.recording_volume = volume;
        st.commands.push(EngineCommand::SetAudioRecordingVolume(volume));
    }

    fn audio_recording_volume(&self) -> u8 {
        self.lock().recording_volume
    }

    fn start_audio_playback_device_test(&mut self, file_path: &str) -> Result<()> {
        if file_path.is_empty() {
            return Err(RtcError::Engine {
                code: -2,
                message: "no sound file to play".into(),
            });
        }
        self.lock()
            .commands
            .push(EngineCommand::StartAudioPlaybackDeviceTest(file_path.to_owned()));
        Ok(())
    }

    fn stop_audio_playback_device_test(&mut self) {
        self.lock()
            .commands
            .push(EngineCommand::StopAudioPlaybackDeviceTest);
    }

    fn start_audio_recording_device_test(&mut self, indication_interval_ms: u32) -> Result<()> {
        let mut st = self.lock();
        st.commands.push(EngineCommand::StartAudioRecordingDeviceTest {
            indication_interval_ms,
        });
        if st.auto_ack {
            let volume = st.recording_volume;
            st.pending
                .push_back(EngineNotification::VolumeIndication(vec![RtcAudioVolumeIndication {
                    uid: 0,
                    volume,
                }]));
        }
        Ok(())
    }

    fn stop_audio_recording_device_test(&mut self) {
        self.lock()
            .commands
            .push(EngineCommand::StopAudioRecordingDeviceTest);
    }

    fn send_stream_message(&mut self, payload: &str) -> Result<()> {
        let mut st = self.lock();
        if !st.in_channel {
            return Err(RtcError::Engine {
                code: -7,
                message: "data stream not open".into(),
            });
        }
        st.commands
            .push(EngineCommand::SendStreamMessage(payload.to_owned()));
        Ok(())
    }

    fn start_screen_share(
        &mut self,
        _channel: &str,
        share_uid: Uid,
        target: ScreenShareTarget,
    ) -> Result<()> {
        let mut st = self.lock();
        st.commands
            .push(EngineCommand::StartScreenShare { share_uid, target });
        st.sharing = true;
        if st.auto_ack {
            st.pending.push_back(EngineNotification::ScreenShareStarted);
        }
        Ok(())
    }

    fn stop_screen_share(&mut self) {
        let mut st = self.lock();
        st.commands.push(EngineCommand::StopScreenShare);
        let was_sharing = std::mem::replace(&mut st.sharing, false);
        if st.auto_ack && was_sharing {
            st.pending.push_back(EngineNotification::ScreenShareStopped {
                window_closed: false,
            });
        }
    }

    fn drain_notifications(&mut self) -> Vec<EngineNotification> {
        self.lock().pending.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn join_and_leave_are_acknowledged() {
        let mut engine = LoopbackEngine::new();
        engine.join_channel("room", 5).expect("join accepted");
        engine.leave_channel().expect("leave accepted");

        assert_eq!(
            engine.drain_notifications(),
            vec![
                EngineNotification::JoinedChannel { channel: "room".into(), uid: 5 },
                EngineNotification::LeftChannel,
            ]
        );
        assert!(engine.drain_notifications().is_empty());
    }

    #[test]
    fn manual_engine_stays_silent() {
        let mut engine = LoopbackEngine::manual();
        engine.join_channel("room", 5).expect("join accepted");
        assert!(engine.drain_notifications().is_empty());
        assert!(engine.is_in_channel());
    }

    #[test]
    fn clones_share_state() {
        let driver = LoopbackEngine::manual();
        let mut boxed: Box<dyn RtcEngine> = Box::new(driver.clone());

        driver.remote_joined(9, true, false);
        assert_eq!(
            boxed.drain_notifications(),
            vec![
                EngineNotification::UserJoined(9),
                EngineNotification::RemoteVideoStateChanged { uid: 9, on: true },
            ]
        );
    }

    #[test]
    fn unknown_device_is_rejected() {
        let mut engine = LoopbackEngine::new();
        assert!(engine.set_current_device(RtcDeviceType::Camera, "nope").is_err());
        engine
            .set_current_device(RtcDeviceType::Camera, "cam-0")
            .expect("known device");
        assert_eq!(engine.current_device(RtcDeviceType::Camera), "cam-0");
    }

    #[test]
    fn forced_join_failure_is_reported_once() {
        let mut engine = LoopbackEngine::new();
        engine.fail_next_join(RtcError::Engine { code: 17, message: "refused".into() });
        assert!(engine.join_channel("room", 1).is_err());
        assert!(engine.join_channel("room", 1).is_ok());
    }
}
