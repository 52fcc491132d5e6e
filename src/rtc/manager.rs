use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    log::log_sink::LogSink,
    rtc::{
        engine::{EngineNotification, RtcEngine, ScreenShareTarget},
        events::{RtcEvent, RtcEventKind, RtcScreenShareState, RtcScreenShareStateReason},
        hub::{RtcEventHub, Subscription},
        rtc_error::{Result, RtcError},
        types::{
            RtcConnection, RtcConnectionReason, RtcDeviceType, RtcJoinParams,
            RtcUserOfflineReason, RtcUserUpdateReason, RtcVideoStreamType, Uid,
            VideoEncoderConfigurationType,
        },
        user::{AttendeeKind, RtcUser},
    },
    sink_debug, sink_error, sink_info, sink_trace, sink_warn,
};

/// Self-description each client broadcasts on the data stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DataStreamMessage {
    info: RtcUser,
}

const ALL_DEVICE_TYPES: [RtcDeviceType; 3] = [
    RtcDeviceType::Camera,
    RtcDeviceType::Speaker,
    RtcDeviceType::Microphone,
];

/// Interval of the local level reports while the microphone test runs.
const MICROPHONE_TEST_INDICATION_MS: u32 = 200;

/// The RTC event source.
///
/// Wraps the native engine, keeps the per-uid user table, and turns engine
/// notifications into [`RtcEvent`]s published through its [`RtcEventHub`].
/// Everything runs on the caller's thread: notifications are only processed
/// inside [`poll`](Self::poll) / [`poll_one`](Self::poll_one).
pub struct RtcManager {
    log: Arc<dyn LogSink>,
    engine: Box<dyn RtcEngine>,
    hub: RtcEventHub,
    backlog: VecDeque<EngineNotification>,

    initialized: bool,
    uid: Uid,
    share_id: Uid,
    channel_name: String,
    connection: RtcConnection,
    screenshare: RtcScreenShareState,
    users: HashMap<Uid, RtcUser>,
    speaker_test: bool,
    microphone_test: bool,
}

impl RtcManager {
    pub fn new(engine: Box<dyn RtcEngine>, log: Arc<dyn LogSink>) -> Self {
        Self {
            log,
            engine,
            hub: RtcEventHub::new(),
            backlog: VecDeque::new(),
            initialized: false,
            uid: 0,
            share_id: 0,
            channel_name: String::new(),
            connection: RtcConnection::Disconnected,
            screenshare: RtcScreenShareState::Idle,
            users: HashMap::new(),
            speaker_test: false,
            microphone_test: false,
        }
    }

    /// Initializes the engine, assigns the local uids and publishes the
    /// initial device lists. No-op if already initialized.
    ///
    /// # Errors
    /// Propagates the engine's refusal to initialize.
    pub fn initialize(&mut self, app_id: &str, log_path: &str) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        sink_info!(
            self.log,
            "rtc manager initialize with appId length {} logPath {}",
            app_id.len(),
            log_path
        );

        self.engine.initialize(app_id, log_path)?;
        let (uid, share_id) = generate_uids();
        self.uid = uid;
        self.share_id = share_id;
        self.initialized = true;

        for device_type in ALL_DEVICE_TYPES {
            self.refresh_device_list(device_type);
        }
        Ok(())
    }

    /// Leaves the channel if needed, drops every subscriber and releases the
    /// engine. No-op if not initialized.
    pub fn release(&mut self) {
        if !self.initialized {
            return;
        }
        sink_info!(self.log, "rtc manager release");

        if self.is_in_channel() {
            if let Err(e) = self.leave_channel() {
                sink_warn!(self.log, "rtc manager release, leave channel failed: {}", e);
            }
        }
        self.stop_device_tests();
        self.hub.unsubscribe_all();
        self.reset();
        self.engine.release();

        self.uid = 0;
        self.share_id = 0;
        self.initialized = false;
    }

    /// Forgets the connection state, screen-share state and user table.
    pub fn reset(&mut self) {
        self.connection = RtcConnection::Disconnected;
        self.screenshare = RtcScreenShareState::Idle;
        self.users.clear();
        self.backlog.clear();
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[must_use]
    pub fn is_in_channel(&self) -> bool {
        self.connection != RtcConnection::Disconnected
    }

    #[must_use]
    pub fn connection(&self) -> RtcConnection {
        self.connection
    }

    #[must_use]
    pub fn uid(&self) -> Uid {
        self.uid
    }

    /// Uid used by the local screen-share stream.
    #[must_use]
    pub fn share_id(&self) -> Uid {
        self.share_id
    }

    #[must_use]
    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    #[must_use]
    pub fn screenshare_state(&self) -> RtcScreenShareState {
        self.screenshare
    }

    #[must_use]
    pub fn user(&self, uid: Uid) -> Option<&RtcUser> {
        self.users.get(&uid)
    }

    #[must_use]
    pub fn self_user(&self) -> Option<&RtcUser> {
        self.users.get(&self.uid)
    }

    /// Subscribes to the given event kinds.
    pub fn subscribe(&mut self, kinds: &[RtcEventKind]) -> Subscription {
        self.hub.subscribe(kinds)
    }

    /// Starts joining `params.channel_name` and adds the local user.
    ///
    /// Publishes `Connection(Connecting)` followed by `UserNew(self)`;
    /// `Connected` follows once the engine reports the join.
    ///
    /// # Errors
    /// [`RtcError::NotInitialized`], [`RtcError::AlreadyInChannel`], or the
    /// engine's refusal.
    pub fn join_channel(&mut self, params: &RtcJoinParams) -> Result<()> {
        if !self.initialized {
            return Err(RtcError::NotInitialized);
        }
        if self.is_in_channel() {
            sink_warn!(self.log, "rtc manager join channel failed, already joined");
            return Err(RtcError::AlreadyInChannel);
        }
        sink_info!(
            self.log,
            "rtc manager join channel '{}' as {}",
            params.channel_name,
            self.uid
        );

        self.engine.enable_local_video(params.is_camera_on);
        self.engine.enable_local_audio(true);
        self.engine.join_channel(&params.channel_name, self.uid)?;
        self.engine.mute_local_audio_stream(!params.is_audio_on);
        self.channel_name.clone_from(&params.channel_name);

        self.set_connection(RtcConnection::Connecting, RtcConnectionReason::None);
        self.add_user(RtcUser {
            uid: self.uid,
            nickname: Some(params.nickname.clone()),
            share_id: Some(0),
            parent_id: Some(0),
            kind: Some(AttendeeKind::Camera),
            is_self: Some(true),
            is_camera_on: Some(params.is_camera_on),
            is_audio_on: Some(params.is_audio_on),
            is_camera_muted: Some(false),
            is_audio_muted: Some(false),
            whiteboard_uuid: None,
            whiteboard_time_span: None,
        });
        Ok(())
    }

    /// Starts leaving the channel; `Disconnected` follows once the engine
    /// confirms.
    ///
    /// # Errors
    /// [`RtcError::NotInChannel`] or the engine's refusal.
    pub fn leave_channel(&mut self) -> Result<()> {
        if !self.is_in_channel() {
            sink_warn!(self.log, "rtc manager leave channel failed, not in channel");
            return Err(RtcError::NotInChannel);
        }
        if self.screenshare != RtcScreenShareState::Idle {
            self.engine.stop_screen_share();
        }
        sink_info!(self.log, "rtc manager leave channel");
        self.engine.leave_channel()?;
        self.set_connection(RtcConnection::Disconnecting, RtcConnectionReason::None);
        Ok(())
    }

    /// Publishes or withdraws the local microphone.
    pub fn enable_audio(&mut self, enable: bool) {
        sink_info!(self.log, "rtc manager enable audio {}", enable);
        self.engine.mute_local_audio_stream(!enable);
        self.update_user(
            RtcUser::new(self.uid).with_audio(enable),
            RtcUserUpdateReason::Media,
        );
    }

    /// Starts or stops the local camera.
    pub fn enable_video(&mut self, enable: bool) {
        sink_info!(self.log, "rtc manager enable video {}", enable);
        self.engine.enable_local_video(enable);
        self.update_user(
            RtcUser::new(self.uid).with_camera(enable),
            RtcUserUpdateReason::Media,
        );
    }

    /// Mutes the outgoing audio stream without touching capture.
    pub fn mute_audio(&mut self, mute: bool) {
        sink_info!(self.log, "rtc manager mute audio {}", mute);
        self.engine.mute_local_audio_stream(mute);
        let patch = RtcUser {
            is_audio_muted: Some(mute),
            ..RtcUser::new(self.uid)
        };
        self.update_user(patch, RtcUserUpdateReason::Info);
    }

    pub fn mute_video(&mut self, mute: bool) {
        sink_info!(self.log, "rtc manager mute video {}", mute);
        self.engine.mute_local_video_stream(mute);
        let patch = RtcUser {
            is_camera_muted: Some(mute),
            ..RtcUser::new(self.uid)
        };
        self.update_user(patch, RtcUserUpdateReason::Info);
    }

    /// Switches the active device and republishes that device list.
    ///
    /// # Errors
    /// Propagates the engine's refusal (unknown device id).
    pub fn set_current_device(&mut self, device_type: RtcDeviceType, device_id: &str) -> Result<()> {
        self.engine.set_current_device(device_type, device_id)?;
        self.refresh_device_list(device_type);
        Ok(())
    }

    pub fn set_video_encoder_configuration(&mut self, configuration: VideoEncoderConfigurationType) {
        sink_info!(
            self.log,
            "rtc manager set video encoder configuration {}",
            configuration
        );
        self.engine
            .set_video_encoder_configuration(configuration.preset());
    }

    pub fn set_speaker_volume(&mut self, volume: u8) {
        sink_debug!(self.log, "rtc manager set speaker volume {}", volume);
        self.engine.set_audio_playback_volume(volume);
    }

    #[must_use]
    pub fn speaker_volume(&self) -> u8 {
        self.engine.audio_playback_volume()
    }

    pub fn set_microphone_volume(&mut self, volume: u8) {
        sink_debug!(self.log, "rtc manager set microphone volume {}", volume);
        self.engine.set_audio_recording_volume(volume);
    }

    #[must_use]
    pub fn microphone_volume(&self) -> u8 {
        self.engine.audio_recording_volume()
    }

    /// Plays `sound_file` on the speaker, or stops the test with `None`.
    /// Starting while a test runs restarts it with the new file.
    ///
    /// # Errors
    /// The engine's refusal to play the file.
    pub fn set_speaker_test(&mut self, sound_file: Option<&str>) -> Result<()> {
        if self.speaker_test {
            self.engine.stop_audio_playback_device_test();
            self.speaker_test = false;
        }
        let Some(path) = sound_file else {
            return Ok(());
        };
        sink_info!(self.log, "rtc manager start speaker test with {}", path);
        self.engine.start_audio_playback_device_test(path)?;
        self.speaker_test = true;
        Ok(())
    }

    /// Starts or stops the microphone test. While it runs the local level is
    /// reported as a volume indication for uid 0.
    ///
    /// # Errors
    /// The engine's refusal to start capturing.
    pub fn set_microphone_test(&mut self, enable: bool) -> Result<()> {
        if enable == self.microphone_test {
            return Ok(());
        }
        if enable {
            sink_info!(self.log, "rtc manager start microphone test");
            self.engine
                .start_audio_recording_device_test(MICROPHONE_TEST_INDICATION_MS)?;
        } else {
            self.engine.stop_audio_recording_device_test();
        }
        self.microphone_test = enable;
        Ok(())
    }

    #[must_use]
    pub fn is_speaker_testing(&self) -> bool {
        self.speaker_test
    }

    #[must_use]
    pub fn is_microphone_testing(&self) -> bool {
        self.microphone_test
    }

    fn stop_device_tests(&mut self) {
        if self.speaker_test {
            self.engine.stop_audio_playback_device_test();
            self.speaker_test = false;
        }
        if self.microphone_test {
            self.engine.stop_audio_recording_device_test();
            self.microphone_test = false;
        }
    }

    pub fn set_remote_video_stream_type(&mut self, uid: Uid, stream_type: RtcVideoStreamType) {
        sink_debug!(
            self.log,
            "rtc manager set remote video stream type {} {:?}",
            uid,
            stream_type
        );
        self.engine.set_remote_video_stream_type(uid, stream_type);
    }

    /// Records the whiteboard room the local user currently presents.
    /// `None` clears it. Publishes a `Media` update only when it changed.
    pub fn set_local_whiteboard_info(&mut self, uuid: Option<&str>, time_span: Option<&str>) {
        let uuid = uuid.unwrap_or_default().to_owned();
        let time_span = time_span.unwrap_or_default().to_owned();
        let Some(me) = self.self_user() else {
            sink_trace!(self.log, "rtc manager whiteboard info ignored, no self user");
            return;
        };
        let unchanged = me.whiteboard_uuid.as_deref().unwrap_or_default() == uuid
            && me.whiteboard_time_span.as_deref().unwrap_or_default() == time_span;
        if unchanged {
            return;
        }
        self.update_user(
            RtcUser::new(self.uid).with_whiteboard(uuid, time_span),
            RtcUserUpdateReason::Media,
        );
    }

    /// Starts sharing a display or window through the share uid.
    ///
    /// # Errors
    /// [`RtcError::NotInChannel`] or the engine's refusal.
    pub fn start_screen_share(&mut self, target: ScreenShareTarget) -> Result<()> {
        if !self.is_in_channel() {
            return Err(RtcError::NotInChannel);
        }
        if self.screenshare != RtcScreenShareState::Idle {
            sink_debug!(self.log, "rtc manager screenshare already {:?}", self.screenshare);
            return Ok(());
        }
        sink_info!(self.log, "rtc manager start screenshare {:?}", target);
        self.engine
            .start_screen_share(&self.channel_name, self.share_id, target)?;
        self.set_screenshare(RtcScreenShareState::Waiting, RtcScreenShareStateReason::None);
        Ok(())
    }

    pub fn stop_screen_share(&mut self) {
        if self.screenshare == RtcScreenShareState::Idle {
            return;
        }
        sink_info!(self.log, "rtc manager stop screenshare");
        self.engine.stop_screen_share();
    }

    /// Sends the local user's info to every other client on the data stream.
    pub fn broadcast_self_info(&mut self) {
        if self.connection != RtcConnection::Connected {
            return;
        }
        let Some(me) = self.self_user().cloned() else {
            return;
        };
        match serde_json::to_string(&DataStreamMessage { info: me }) {
            Ok(payload) => {
                if let Err(e) = self.engine.send_stream_message(&payload) {
                    sink_warn!(self.log, "rtc manager send data stream failed: {}", e);
                }
            }
            Err(e) => sink_error!(self.log, "rtc manager pack data stream message failed: {}", e),
        }
    }

    /// Processes every pending engine notification.
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;
        while self.poll_one() {
            handled += 1;
        }
        handled
    }

    /// Processes the oldest pending engine notification, if any.
    pub fn poll_one(&mut self) -> bool {
        if self.backlog.is_empty() {
            self.backlog.extend(self.engine.drain_notifications());
        }
        match self.backlog.pop_front() {
            Some(n) => {
                self.handle_notification(n);
                true
            }
            None => false,
        }
    }

    fn handle_notification(&mut self, notification: EngineNotification) {
        match notification {
            EngineNotification::JoinedChannel { channel, uid } => {
                sink_info!(self.log, "rtc manager on joinedChannel: {} uid: {}", channel, uid);
                self.set_connection(RtcConnection::Connected, RtcConnectionReason::None);
            }
            EngineNotification::LeftChannel => {
                sink_info!(self.log, "rtc manager on leavechannel");
                self.screenshare = RtcScreenShareState::Idle;
                self.users.clear();
                self.set_connection(RtcConnection::Disconnected, RtcConnectionReason::None);
            }
            EngineNotification::ConnectionStateChanged { state, reason } => {
                sink_info!(self.log, "rtc manager connection state {:?} {:?}", state, reason);
                self.set_connection(state, reason);
            }
            EngineNotification::UserJoined(uid) => self.on_user_joined(uid),
            EngineNotification::UserOffline { uid, reason } => {
                if uid == self.share_id || reason == RtcUserOfflineReason::BecameAudience {
                    return;
                }
                sink_info!(self.log, "rtc manager on userOffline {} reason: {:?}", uid, reason);
                self.remove_user(uid);
            }
            EngineNotification::LocalVideoStateChanged { on } => {
                let changed = self
                    .self_user()
                    .is_some_and(|me| me.is_camera_on != Some(on));
                if changed {
                    self.update_user(
                        RtcUser::new(self.uid).with_camera(on),
                        RtcUserUpdateReason::Media,
                    );
                }
            }
            EngineNotification::RemoteVideoStateChanged { uid, on } => {
                if uid == self.share_id {
                    return;
                }
                if self.user(uid).is_some_and(|u| u.is_camera_on != Some(on)) {
                    sink_debug!(self.log, "remote video state changed {} {}", uid, on);
                    self.update_user(RtcUser::new(uid).with_camera(on), RtcUserUpdateReason::Media);
                }
            }
            EngineNotification::RemoteAudioStateChanged { uid, on } => {
                if uid == self.share_id {
                    return;
                }
                if self.user(uid).is_some_and(|u| u.is_audio_on != Some(on)) {
                    sink_debug!(self.log, "remote audio state changed {} {}", uid, on);
                    self.update_user(RtcUser::new(uid).with_audio(on), RtcUserUpdateReason::Media);
                }
            }
            EngineNotification::DeviceStateChanged(device_type) => {
                sink_info!(self.log, "rtc manager device state changed {:?}", device_type);
                self.refresh_device_list(device_type);
            }
            EngineNotification::VolumeIndication(speakers) => {
                self.hub.publish(&RtcEvent::VolumeIndications(speakers));
            }
            EngineNotification::StreamMessage { uid, payload } => {
                sink_trace!(self.log, "rtc manager stream message from {}", uid);
                self.on_data_stream_message(&payload);
            }
            EngineNotification::ScreenShareStarted => {
                self.update_user(
                    RtcUser {
                        share_id: Some(self.share_id),
                        ..RtcUser::new(self.uid)
                    },
                    RtcUserUpdateReason::Info,
                );
                self.set_screenshare(RtcScreenShareState::Running, RtcScreenShareStateReason::None);
            }
            EngineNotification::ScreenShareStopped { window_closed } => {
                self.update_user(
                    RtcUser {
                        share_id: Some(0),
                        ..RtcUser::new(self.uid)
                    },
                    RtcUserUpdateReason::Info,
                );
                let reason = if window_closed {
                    RtcScreenShareStateReason::WindowClosed
                } else {
                    RtcScreenShareStateReason::None
                };
                self.set_screenshare(RtcScreenShareState::Idle, reason);
            }
            EngineNotification::Error { code, message } => {
                sink_error!(self.log, "rtc manager on error {} {}", code, message);
                self.hub.publish(&RtcEvent::Error { code, message });
            }
        }
    }

    fn on_user_joined(&mut self, uid: Uid) {
        sink_info!(self.log, "rtc manager on userJoined {}", uid);
        if uid == self.share_id {
            return;
        }
        self.set_remote_video_stream_type(uid, RtcVideoStreamType::Low);
        self.add_user(RtcUser::remote(uid));
    }

    fn on_data_stream_message(&mut self, payload: &str) {
        let info = match serde_json::from_str::<DataStreamMessage>(payload) {
            Ok(msg) => msg.info,
            Err(e) => {
                sink_error!(self.log, "rtc manager unpack data stream message failed: {}", e);
                return;
            }
        };
        let Some(old) = self.user(info.uid).cloned() else {
            return;
        };

        if old.nickname != info.nickname
            || old.parent_id != info.parent_id
            || old.share_id != info.share_id
        {
            self.update_user(
                RtcUser {
                    nickname: info.nickname.clone(),
                    parent_id: info.parent_id,
                    share_id: info.share_id,
                    ..RtcUser::new(info.uid)
                },
                RtcUserUpdateReason::Info,
            );
        }

        if old.whiteboard_uuid != info.whiteboard_uuid
            || old.whiteboard_time_span != info.whiteboard_time_span
        {
            self.update_user(
                RtcUser {
                    whiteboard_uuid: info.whiteboard_uuid.clone(),
                    whiteboard_time_span: info.whiteboard_time_span.clone(),
                    ..RtcUser::new(info.uid)
                },
                RtcUserUpdateReason::WhiteBoard,
            );
        }

        if let (Some(uuid), Some(time_span)) = (
            info.whiteboard_uuid.as_deref().filter(|s| !s.is_empty()),
            info.whiteboard_time_span.as_deref().filter(|s| !s.is_empty()),
        ) {
            self.hub.publish(&RtcEvent::WhiteboardInfo {
                uuid: uuid.to_owned(),
                time_span: time_span.to_owned(),
            });
        }

        let Some(share_uid) = info.share_id.filter(|id| *id != 0) else {
            return;
        };
        let relink = self.user(share_uid).is_some_and(|share| {
            share.nickname != info.nickname || share.parent_id != Some(info.uid)
        });
        if relink {
            self.update_user(
                RtcUser {
                    nickname: info.nickname,
                    parent_id: Some(info.uid),
                    kind: Some(AttendeeKind::ScreenShare),
                    ..RtcUser::new(share_uid)
                },
                RtcUserUpdateReason::Info,
            );
        }
    }

    fn refresh_device_list(&mut self, device_type: RtcDeviceType) {
        let devices = self.engine.devices(device_type);
        let current_device_id = self.engine.current_device(device_type);
        self.hub.publish(&RtcEvent::DeviceList {
            device_type,
            current_device_id,
            devices,
        });
    }

    fn set_connection(&mut self, state: RtcConnection, reason: RtcConnectionReason) {
        self.connection = state;
        self.hub.publish(&RtcEvent::Connection { state, reason });
    }

    fn set_screenshare(&mut self, state: RtcScreenShareState, reason: RtcScreenShareStateReason) {
        sink_info!(self.log, "rtc manager screenshare state {:?} {:?}", state, reason);
        self.screenshare = state;
        self.hub.publish(&RtcEvent::ScreenShare { state, reason });
    }

    fn add_user(&mut self, user: RtcUser) {
        let entry = self
            .users
            .entry(user.uid)
            .or_insert_with(|| RtcUser::new(user.uid));
        entry.merge(&user);
        let merged = entry.clone();
        self.hub.publish(&RtcEvent::UserNew(merged));
    }

    fn update_user(&mut self, patch: RtcUser, reason: RtcUserUpdateReason) {
        let Some(entry) = self.users.get_mut(&patch.uid) else {
            sink_trace!(self.log, "rtc manager update for unknown user {}", patch.uid);
            return;
        };
        let old = entry.clone();
        entry.merge(&patch);
        let new = entry.clone();
        self.hub.publish(&RtcEvent::UserUpdate {
            old: Some(old),
            new,
            reason,
        });
    }

    fn remove_user(&mut self, uid: Uid) {
        if self.users.remove(&uid).is_some() {
            self.hub.publish(&RtcEvent::UserRemove(uid));
        }
    }
}

/// Random local uid plus a distinct uid for the screen-share stream.
fn generate_uids() -> (Uid, Uid) {
    let mut rng = rand::thread_rng();
    let uid = rng.gen_range(1..=999_999_999);
    let mut share_id = rng.gen_range(1..=999_999_999);
    while share_id == uid {
        share_id = rng.gen_range(1..=999_999_999);
    }
    (uid, share_id)
}
