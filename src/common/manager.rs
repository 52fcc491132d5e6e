use std::sync::{
    Arc,
    mpsc::{self, Receiver, Sender},
};

use crate::{
    attendee::{attendee::Attendee, manager::AttendeeManager},
    common::events::{CommonEvent, WhiteBoardState},
    config::ClientSettings,
    log::log_sink::LogSink,
    meeting::{
        manager::MeetingManager,
        types::{MeetingConnection, MeetingEvent, MeetingParams},
    },
    rtc::{
        engine::{RtcEngine, ScreenShareTarget},
        events::{RtcEvent, RtcEventKind, RtcScreenShareState, RtcScreenShareStateReason},
        hub::Subscription,
        manager::RtcManager,
        rtc_error::Result,
        types::{RtcDeviceType, Uid, VideoEncoderConfigurationType},
    },
    sink_error, sink_info,
};

/// Interval between two self-info broadcasts on the data stream.
pub const INFO_BROADCAST_INTERVAL_MS: u128 = 2_000;

const PASSTHROUGH_KINDS: [RtcEventKind; 5] = [
    RtcEventKind::DeviceList,
    RtcEventKind::VolumeIndications,
    RtcEventKind::ScreenShare,
    RtcEventKind::WhiteboardInfo,
    RtcEventKind::Error,
];

/// Facade the UI talks to.
///
/// Owns the RTC, meeting and attendee managers, fans commands out to them
/// and folds everything they report into one ordered stream of
/// [`CommonEvent`]s, drained with [`poll`](Self::poll) once per UI frame.
pub struct CommonManager {
    log: Arc<dyn LogSink>,
    rtc: RtcManager,
    meeting: MeetingManager,
    attendee: AttendeeManager,
    passthrough: Option<Subscription>,

    event_tx: Sender<CommonEvent>,
    event_rx: Receiver<CommonEvent>,

    initialized: bool,
    screenshare: RtcScreenShareState,
    whiteboard: WhiteBoardState,
    last_info_broadcast: u128,
}

impl CommonManager {
    pub fn new(engine: Box<dyn RtcEngine>, log: Arc<dyn LogSink>) -> Self {
        let (event_tx, event_rx) = mpsc::channel();
        Self {
            rtc: RtcManager::new(engine, Arc::clone(&log)),
            meeting: MeetingManager::new(Arc::clone(&log)),
            attendee: AttendeeManager::new(Arc::clone(&log)),
            log,
            passthrough: None,
            event_tx,
            event_rx,
            initialized: false,
            screenshare: RtcScreenShareState::Idle,
            whiteboard: WhiteBoardState::Idle,
            last_info_broadcast: 0,
        }
    }

    /// Brings up the RTC engine and wires the managers together.
    /// No-op if already initialized.
    ///
    /// # Errors
    /// Propagates the engine's refusal to initialize.
    pub fn initialize(&mut self, settings: &ClientSettings) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        sink_info!(self.log, "common manager initialize");

        self.passthrough = Some(self.rtc.subscribe(&PASSTHROUGH_KINDS));
        self.rtc.initialize(&settings.app_id, &settings.rtc_log_path)?;
        self.rtc
            .set_video_encoder_configuration(settings.encoder_configuration);

        self.meeting.initialize(&mut self.rtc);

        self.attendee.initialize(&mut self.rtc);
        let tx = self.event_tx.clone();
        self.attendee.on(Box::new(move |ev| {
            let _ = tx.send(CommonEvent::from(ev));
        }));

        self.initialized = true;
        Ok(())
    }

    pub fn release(&mut self) {
        if !self.initialized {
            return;
        }
        sink_info!(self.log, "common manager release");
        self.attendee.release();
        self.meeting.release();
        self.rtc.release();
        self.passthrough = None;
        self.screenshare = RtcScreenShareState::Idle;
        self.whiteboard = WhiteBoardState::Idle;
        self.initialized = false;
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Starts a meeting: clears every meeting-scoped state, then joins.
    ///
    /// # Errors
    /// [`RtcError::AlreadyInChannel`](crate::rtc::rtc_error::RtcError::AlreadyInChannel)
    /// while a meeting is in progress, or the RTC layer's refusal.
    pub fn join_meeting(&mut self, params: &MeetingParams) -> Result<()> {
        if self.meeting.is_in_meeting() || self.rtc.is_in_channel() {
            return self.meeting.join_meeting(&mut self.rtc, params);
        }
        self.rtc.reset();
        self.meeting.reset();
        self.attendee.reset();
        sink_info!(self.log, "common manager join meeting '{}'", params.channel_name);
        self.meeting.join_meeting(&mut self.rtc, params)
    }

    /// # Errors
    /// [`RtcError::NotInChannel`](crate::rtc::rtc_error::RtcError::NotInChannel)
    /// when no meeting is in progress.
    pub fn leave_meeting(&mut self) -> Result<()> {
        self.meeting.leave_meeting(&mut self.rtc)
    }

    #[must_use]
    pub fn is_in_meeting(&self) -> bool {
        self.meeting.is_in_meeting()
    }

    #[must_use]
    pub fn connection(&self) -> MeetingConnection {
        self.meeting.connection()
    }

    #[must_use]
    pub fn channel_name(&self) -> &str {
        self.meeting.channel_name()
    }

    /// Current roster, in presentation order.
    #[must_use]
    pub fn attendees(&self) -> &[Attendee] {
        self.attendee.attendees()
    }

    #[must_use]
    pub fn uid(&self) -> Uid {
        self.rtc.uid()
    }

    pub fn enable_audio(&mut self, enable: bool) {
        sink_info!(self.log, "common manager enable audio {}", enable);
        self.rtc.enable_audio(enable);
    }

    pub fn enable_video(&mut self, enable: bool) {
        sink_info!(self.log, "common manager enable video {}", enable);
        self.rtc.enable_video(enable);
    }

    pub fn mute_audio(&mut self, mute: bool) {
        self.rtc.mute_audio(mute);
    }

    pub fn mute_video(&mut self, mute: bool) {
        self.rtc.mute_video(mute);
    }

    /// # Errors
    /// The engine's refusal (unknown device id).
    pub fn set_current_device(&mut self, device_type: RtcDeviceType, device_id: &str) -> Result<()> {
        self.rtc.set_current_device(device_type, device_id)
    }

    pub fn set_video_encoder_configuration(&mut self, configuration: VideoEncoderConfigurationType) {
        self.rtc.set_video_encoder_configuration(configuration);
    }

    pub fn set_speaker_volume(&mut self, volume: u8) {
        self.rtc.set_speaker_volume(volume);
    }

    #[must_use]
    pub fn speaker_volume(&self) -> u8 {
        self.rtc.speaker_volume()
    }

    pub fn set_microphone_volume(&mut self, volume: u8) {
        self.rtc.set_microphone_volume(volume);
    }

    #[must_use]
    pub fn microphone_volume(&self) -> u8 {
        self.rtc.microphone_volume()
    }

    /// # Errors
    /// The engine's refusal to play `sound_file`.
    pub fn set_speaker_test(&mut self, sound_file: Option<&str>) -> Result<()> {
        self.rtc.set_speaker_test(sound_file)
    }

    /// # Errors
    /// The engine's refusal to start capturing.
    pub fn set_microphone_test(&mut self, enable: bool) -> Result<()> {
        self.rtc.set_microphone_test(enable)
    }

    #[must_use]
    pub fn screenshare_state(&self) -> RtcScreenShareState {
        self.screenshare
    }

    /// # Errors
    /// [`RtcError::NotInChannel`](crate::rtc::rtc_error::RtcError::NotInChannel)
    /// or the engine's refusal.
    pub fn start_screen_share(&mut self, target: ScreenShareTarget) -> Result<()> {
        self.rtc.start_screen_share(target)
    }

    pub fn stop_screen_share(&mut self) {
        self.rtc.stop_screen_share();
    }

    #[must_use]
    pub fn whiteboard_state(&self) -> WhiteBoardState {
        self.whiteboard
    }

    /// Marks the whiteboard as opening while its room is being prepared.
    pub fn open_whiteboard(&mut self) {
        if self.whiteboard != WhiteBoardState::Idle || !self.meeting.is_in_meeting() {
            return;
        }
        self.set_whiteboard(WhiteBoardState::Waiting);
    }

    /// The whiteboard room is live; advertise it to the other attendees.
    pub fn whiteboard_ready(&mut self, uuid: &str, time_span: &str) {
        if self.whiteboard == WhiteBoardState::Idle {
            return;
        }
        self.rtc.set_local_whiteboard_info(Some(uuid), Some(time_span));
        self.set_whiteboard(WhiteBoardState::Running);
    }

    pub fn close_whiteboard(&mut self) {
        if self.whiteboard == WhiteBoardState::Idle {
            return;
        }
        self.rtc.set_local_whiteboard_info(None, None);
        self.set_whiteboard(WhiteBoardState::Idle);
    }

    /// Broadcasts the local user's info every
    /// [`INFO_BROADCAST_INTERVAL_MS`] while connected.
    pub fn tick(&mut self, now_ms: u128) {
        if self.meeting.connection() != MeetingConnection::Connected {
            return;
        }
        if now_ms.saturating_sub(self.last_info_broadcast) >= INFO_BROADCAST_INTERVAL_MS {
            self.last_info_broadcast = now_ms;
            self.rtc.broadcast_self_info();
        }
    }

    /// Processes pending engine notifications one at a time and returns the
    /// resulting events in order.
    pub fn poll(&mut self) -> Vec<CommonEvent> {
        if !self.initialized {
            return Vec::new();
        }
        loop {
            self.pump_managers();
            if !self.rtc.poll_one() {
                break;
            }
        }
        self.event_rx.try_iter().collect()
    }

    fn pump_managers(&mut self) {
        for MeetingEvent::Connection { state, reason } in self.meeting.pump() {
            self.emit(CommonEvent::Connection { state, reason });
            if state == MeetingConnection::Disconnected {
                self.on_disconnected();
            }
        }

        let passthrough: Vec<RtcEvent> = self
            .passthrough
            .as_ref()
            .map(|sub| std::iter::from_fn(|| sub.try_next()).collect())
            .unwrap_or_default();
        for ev in passthrough {
            self.on_passthrough(ev);
        }

        self.attendee.pump();
    }

    fn on_disconnected(&mut self) {
        self.attendee.reset();
        if self.screenshare != RtcScreenShareState::Idle {
            self.screenshare = RtcScreenShareState::Idle;
            self.emit(CommonEvent::ScreenShareState {
                state: RtcScreenShareState::Idle,
                reason: RtcScreenShareStateReason::None,
            });
        }
        if self.whiteboard != WhiteBoardState::Idle {
            self.set_whiteboard(WhiteBoardState::Idle);
        }
        self.last_info_broadcast = 0;
    }

    fn on_passthrough(&mut self, ev: RtcEvent) {
        match ev {
            RtcEvent::DeviceList {
                device_type,
                current_device_id,
                devices,
            } => self.emit(CommonEvent::DeviceList {
                device_type,
                current_device_id,
                devices,
            }),
            RtcEvent::VolumeIndications(v) => self.emit(CommonEvent::VolumeIndications(v)),
            RtcEvent::ScreenShare { state, reason } => {
                self.screenshare = state;
                self.emit(CommonEvent::ScreenShareState { state, reason });
            }
            RtcEvent::WhiteboardInfo { uuid, time_span } => {
                self.emit(CommonEvent::WhiteboardInfo { uuid, time_span });
            }
            RtcEvent::Error { code, message } => {
                sink_error!(self.log, "common manager rtc error {}: {}", code, message);
                self.emit(CommonEvent::RtcError { code, message });
            }
            RtcEvent::Connection { .. }
            | RtcEvent::UserNew(_)
            | RtcEvent::UserUpdate { .. }
            | RtcEvent::UserRemove(_) => {}
        }
    }

    fn set_whiteboard(&mut self, state: WhiteBoardState) {
        sink_info!(self.log, "common manager whiteboard state {:?}", state);
        self.whiteboard = state;
        self.emit(CommonEvent::WhiteBoardState(state));
    }

    fn emit(&self, ev: CommonEvent) {
        let _ = self.event_tx.send(ev);
    }
}

impl Drop for CommonManager {
    fn drop(&mut self) {
        self.release();
    }
}
