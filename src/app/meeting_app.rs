use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::Duration,
};

use eframe::{App, Frame, egui};

use super::{gui_error::GuiError, utils};
use crate::{
    common::{
        events::{CommonEvent, WhiteBoardState},
        manager::CommonManager,
    },
    config::{ClientSettings, Preferences},
    log::{log_sink::LogSink, logger::Logger, now_millis},
    meeting::types::{MeetingConnection, MeetingParams},
    rtc::{
        engine::{EngineNotification, ScreenShareTarget},
        events::RtcScreenShareState,
        loopback::LoopbackEngine,
        types::{RtcDeviceType, Uid, VideoEncoderConfigurationType},
    },
    sink_info, sink_warn,
    store::{AttendeeLayout, Store, StoreAction},
};

const UI_LOG_CAPACITY: usize = 256;
const FIRST_DEMO_UID: Uid = 1_000;

/// Join form contents.
#[derive(Debug, Clone, Default)]
struct JoinForm {
    channel_name: String,
    nickname: String,
    camera_on: bool,
    audio_on: bool,
}

/// User intent collected while drawing a frame, applied afterwards.
#[derive(Debug, Clone)]
enum UiCommand {
    Leave,
    EnableAudio(bool),
    EnableVideo(bool),
    MuteAudio(bool),
    ToggleScreenShare,
    ToggleWhiteboard,
    Layout(AttendeeLayout),
    Page(usize),
    MainAttendee(Option<Uid>),
    Device(RtcDeviceType, String),
    Encoder(VideoEncoderConfigurationType),
    SpeakerVolume(u8),
    MicrophoneVolume(u8),
    SpeakerTest(bool),
    MicrophoneTest(bool),
    AddRemote,
    RemoteCamera(Uid, bool),
    RemoteAudio(Uid, bool),
    RemoveRemote(Uid),
}

pub struct MeetingApp {
    log: Arc<dyn LogSink>,
    logger: Option<Logger>,
    common: CommonManager,
    engine: LoopbackEngine,
    store: Store,

    form: JoinForm,
    encoder: VideoEncoderConfigurationType,
    preferences: Option<Preferences>,
    speaker_test_file: String,
    speaker_testing: bool,
    microphone_testing: bool,
    /// Local microphone level in percent, reported while testing.
    microphone_level: u8,
    grid_page: usize,
    next_demo_uid: Uid,
    speaking: HashMap<Uid, u8>,

    status: String,
    ui_logs: VecDeque<String>,
}

impl MeetingApp {
    /// Builds the app around an in-process engine. `logger` feeds the log
    /// panel when present; otherwise `log` is the only sink.
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        settings: &ClientSettings,
        log: Arc<dyn LogSink>,
        logger: Option<Logger>,
    ) -> Self {
        let preferences = match Preferences::open(&settings.preferences_path) {
            Ok(p) => Some(p),
            Err(e) => {
                sink_warn!(log, "preferences unavailable: {}", e);
                None
            }
        };
        let mut settings = settings.clone();
        if let Some(p) = &preferences {
            p.apply_to(&mut settings);
        }

        let engine = LoopbackEngine::new();
        let mut common = CommonManager::new(Box::new(engine.clone()), Arc::clone(&log));
        let status = match common.initialize(&settings) {
            Ok(()) => "Ready.".to_owned(),
            Err(e) => format!("Failed to initialize RTC engine: {e}"),
        };

        Self {
            store: Store::new(Arc::clone(&log)),
            log,
            logger,
            common,
            engine,
            form: JoinForm {
                channel_name: settings.channel_name.clone(),
                nickname: settings.nickname.clone(),
                camera_on: settings.camera_on,
                audio_on: settings.audio_on,
            },
            encoder: settings.encoder_configuration,
            preferences,
            speaker_test_file: settings.speaker_test_file.clone(),
            speaker_testing: false,
            microphone_testing: false,
            microphone_level: 0,
            grid_page: 0,
            next_demo_uid: FIRST_DEMO_UID,
            speaking: HashMap::new(),
            status,
            ui_logs: VecDeque::with_capacity(UI_LOG_CAPACITY),
        }
    }

    fn push_log<T: Into<String>>(&mut self, s: T) {
        if self.ui_logs.len() == UI_LOG_CAPACITY {
            self.ui_logs.pop_front();
        }
        self.ui_logs.push_back(s.into());
    }

    fn join(&mut self) -> Result<(), GuiError> {
        let channel_name = self.form.channel_name.trim();
        if channel_name.is_empty() {
            return Err(GuiError::InvalidInput("channel name is empty".into()));
        }
        let params = MeetingParams {
            channel_name: channel_name.to_owned(),
            nickname: self.form.nickname.trim().to_owned(),
            is_camera_on: self.form.camera_on,
            is_audio_on: self.form.audio_on,
        };
        self.grid_page = 0;
        self.speaking.clear();
        self.common.join_meeting(&params)?;
        Ok(())
    }

    fn on_event(&mut self, ev: CommonEvent) {
        match &ev {
            CommonEvent::Connection { state, reason } => {
                self.status = format!("Meeting {state:?} ({reason:?})");
            }
            CommonEvent::RtcError { code, message } => {
                self.status = format!("RTC error {code}: {message}");
                self.push_log(format!("[RTC] error {code}: {message}"));
            }
            CommonEvent::WhiteboardInfo { uuid, time_span } => {
                self.push_log(format!("[WB] room {uuid} ({time_span})"));
            }
            CommonEvent::VolumeIndications(samples) => {
                if let Some(local) = samples.iter().find(|s| s.uid == 0) {
                    self.microphone_level = utils::volume_to_percent(local.volume);
                }
                self.speaking = samples
                    .iter()
                    .filter(|s| s.volume > 0)
                    .map(|s| (s.uid, s.volume))
                    .collect();
            }
            _ => {}
        }
        if let Some(action) = StoreAction::from_event(ev) {
            self.store.dispatch(action);
        }
    }

    fn apply(&mut self, cmd: UiCommand) -> Result<(), GuiError> {
        match cmd {
            UiCommand::Leave => self.common.leave_meeting()?,
            UiCommand::EnableAudio(on) => self.common.enable_audio(on),
            UiCommand::EnableVideo(on) => self.common.enable_video(on),
            UiCommand::MuteAudio(mute) => self.common.mute_audio(mute),
            UiCommand::ToggleScreenShare => {
                if self.common.screenshare_state() == RtcScreenShareState::Idle {
                    self.common.start_screen_share(ScreenShareTarget::Display(0))?;
                } else {
                    self.common.stop_screen_share();
                }
            }
            UiCommand::ToggleWhiteboard => {
                if self.common.whiteboard_state() == WhiteBoardState::Idle {
                    self.common.open_whiteboard();
                    let uuid = format!("wb-{}", self.common.uid());
                    self.common.whiteboard_ready(&uuid, &now_millis().to_string());
                } else {
                    self.common.close_whiteboard();
                }
            }
            UiCommand::Layout(layout) => {
                self.grid_page = 0;
                self.store.dispatch(StoreAction::AttendeeLayout(layout));
            }
            UiCommand::Page(page) => self.grid_page = page,
            UiCommand::MainAttendee(uid) => self.store.dispatch(StoreAction::SetMainAttendee(uid)),
            UiCommand::Device(device_type, id) => self.common.set_current_device(device_type, &id)?,
            UiCommand::Encoder(cfg) => {
                self.encoder = cfg;
                self.common.set_video_encoder_configuration(cfg);
                if let Some(p) = &mut self.preferences {
                    if let Err(e) = p.set_encoder_configuration(cfg) {
                        sink_warn!(self.log, "saving encoder preference failed: {}", e);
                    }
                }
            }
            UiCommand::SpeakerVolume(pct) => {
                self.common.set_speaker_volume(utils::percent_to_volume(pct));
            }
            UiCommand::MicrophoneVolume(pct) => {
                self.common
                    .set_microphone_volume(utils::percent_to_volume(pct));
            }
            UiCommand::SpeakerTest(on) => {
                let file = on.then_some(self.speaker_test_file.as_str());
                self.common.set_speaker_test(file)?;
                self.speaker_testing = on;
            }
            UiCommand::MicrophoneTest(on) => {
                self.common.set_microphone_test(on)?;
                self.microphone_testing = on;
                self.microphone_level = 0;
            }
            UiCommand::AddRemote => {
                let uid = self.next_demo_uid;
                self.next_demo_uid += 1;
                sink_info!(self.log, "demo remote attendee {} joins", uid);
                self.engine.remote_joined(uid, false, true);
            }
            UiCommand::RemoteCamera(uid, on) => self
                .engine
                .inject(EngineNotification::RemoteVideoStateChanged { uid, on }),
            UiCommand::RemoteAudio(uid, on) => self
                .engine
                .inject(EngineNotification::RemoteAudioStateChanged { uid, on }),
            UiCommand::RemoveRemote(uid) => self.engine.remote_left(uid),
        }
        Ok(())
    }

    fn show_join_form(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.heading("RustyMeet");
                ui.add_space(10.);
            });
            egui::Grid::new("join_form").num_columns(2).show(ui, |ui| {
                ui.label("Channel");
                ui.text_edit_singleline(&mut self.form.channel_name);
                ui.end_row();
                ui.label("Nickname");
                ui.text_edit_singleline(&mut self.form.nickname);
                ui.end_row();
            });
            ui.checkbox(&mut self.form.camera_on, "Camera on");
            ui.checkbox(&mut self.form.audio_on, "Microphone on");
            ui.add_space(8.);

            let can_join = !self.form.channel_name.trim().is_empty();
            if ui
                .add_enabled(can_join, egui::Button::new("Join meeting"))
                .clicked()
            {
                if let Err(e) = self.join() {
                    sink_warn!(self.log, "join failed: {}", e);
                    self.status = format!("Failed to join: {e}");
                }
            }
            ui.separator();
            ui.label(&self.status);
        });
    }

    fn show_toolbar(&self, ui: &mut egui::Ui, cmds: &mut Vec<UiCommand>) {
        let state = self.store.state();
        let me = state.attendees.iter().find(|a| a.is_self);
        let audio_on = me.is_some_and(|a| a.is_audio_on);
        let audio_muted = me.is_some_and(|a| a.is_audio_muted);
        let camera_on = me.is_some_and(|a| a.is_camera_on);

        ui.horizontal(|ui| {
            ui.strong(self.common.channel_name());
            ui.label(format!("{:?}", state.connection));
            ui.separator();
            if ui.selectable_label(audio_on, "Mic").clicked() {
                cmds.push(UiCommand::EnableAudio(!audio_on));
            }
            if ui
                .add_enabled(audio_on, egui::SelectableLabel::new(audio_muted, "Mute"))
                .clicked()
            {
                cmds.push(UiCommand::MuteAudio(!audio_muted));
            }
            if ui.selectable_label(camera_on, "Camera").clicked() {
                cmds.push(UiCommand::EnableVideo(!camera_on));
            }
            let sharing = state.screenshare_state != RtcScreenShareState::Idle;
            if ui.selectable_label(sharing, "Share screen").clicked() {
                cmds.push(UiCommand::ToggleScreenShare);
            }
            let whiteboard = state.whiteboard_state != WhiteBoardState::Idle;
            if ui.selectable_label(whiteboard, "Whiteboard").clicked() {
                cmds.push(UiCommand::ToggleWhiteboard);
            }
            ui.separator();
            egui::ComboBox::from_id_source("layout")
                .selected_text(state.attendee_layout.label())
                .show_ui(ui, |ui| {
                    for layout in AttendeeLayout::ALL {
                        if ui
                            .selectable_label(state.attendee_layout == layout, layout.label())
                            .clicked()
                        {
                            cmds.push(UiCommand::Layout(layout));
                        }
                    }
                });
            ui.separator();
            let can_leave = !matches!(
                state.connection,
                MeetingConnection::Disconnecting | MeetingConnection::Disconnected
            );
            if ui.add_enabled(can_leave, egui::Button::new("Leave")).clicked() {
                cmds.push(UiCommand::Leave);
            }
        });
    }

    fn show_side_panel(&self, ui: &mut egui::Ui, cmds: &mut Vec<UiCommand>) {
        let state = self.store.state();
        let main_uid = state.main_attendee().map(|a| a.uid);

        ui.heading(format!("Attendees ({})", state.attendees.len()));
        egui::ScrollArea::vertical()
            .id_source("attendee_list")
            .max_height(240.0)
            .show(ui, |ui| {
                for a in &state.attendees {
                    let label = format!("{}  {}", a.display_name(), utils::attendee_badges(a));
                    if ui.selectable_label(main_uid == Some(a.uid), label).clicked() {
                        cmds.push(UiCommand::MainAttendee(Some(a.uid)));
                    }
                }
            });

        ui.separator();
        ui.heading("Devices");
        for (device_type, label) in [
            (RtcDeviceType::Camera, "Camera"),
            (RtcDeviceType::Microphone, "Microphone"),
            (RtcDeviceType::Speaker, "Speaker"),
        ] {
            let Some(list) = state.device_list(device_type) else {
                continue;
            };
            let current = list
                .devices
                .iter()
                .find(|d| d.device_id == list.current_device_id)
                .map_or(list.current_device_id.as_str(), |d| d.device_name.as_str());
            egui::ComboBox::from_label(label)
                .selected_text(current)
                .show_ui(ui, |ui| {
                    for d in &list.devices {
                        let selected = d.device_id == list.current_device_id;
                        if ui.selectable_label(selected, d.device_name.as_str()).clicked() && !selected {
                            cmds.push(UiCommand::Device(device_type, d.device_id.clone()));
                        }
                    }
                });
        }
        egui::ComboBox::from_label("Video quality")
            .selected_text(self.encoder.to_string())
            .show_ui(ui, |ui| {
                for cfg in [
                    VideoEncoderConfigurationType::Low,
                    VideoEncoderConfigurationType::Medium,
                    VideoEncoderConfigurationType::High,
                ] {
                    if ui.selectable_label(self.encoder == cfg, cfg.to_string()).clicked() {
                        cmds.push(UiCommand::Encoder(cfg));
                    }
                }
            });

        ui.separator();
        self.show_audio_settings(ui, cmds);

        ui.separator();
        ui.heading("Loopback peers");
        if ui.button("Add remote attendee").clicked() {
            cmds.push(UiCommand::AddRemote);
        }
        for a in state.attendees.iter().filter(|a| !a.is_self) {
            ui.horizontal(|ui| {
                ui.label(a.display_name());
                if ui.small_button(if a.is_camera_on { "cam off" } else { "cam on" }).clicked() {
                    cmds.push(UiCommand::RemoteCamera(a.uid, !a.is_camera_on));
                }
                if ui.small_button(if a.is_audio_on { "mic off" } else { "mic on" }).clicked() {
                    cmds.push(UiCommand::RemoteAudio(a.uid, !a.is_audio_on));
                }
                if ui.small_button("leave").clicked() {
                    cmds.push(UiCommand::RemoveRemote(a.uid));
                }
            });
        }
    }

    fn show_audio_settings(&self, ui: &mut egui::Ui, cmds: &mut Vec<UiCommand>) {
        ui.heading("Audio");
        let mut speaker = utils::volume_to_percent(self.common.speaker_volume());
        if ui
            .add(egui::Slider::new(&mut speaker, 0..=100).text("Speaker"))
            .changed()
        {
            cmds.push(UiCommand::SpeakerVolume(speaker));
        }
        let mut microphone = utils::volume_to_percent(self.common.microphone_volume());
        if ui
            .add(egui::Slider::new(&mut microphone, 0..=100).text("Microphone"))
            .changed()
        {
            cmds.push(UiCommand::MicrophoneVolume(microphone));
        }
        ui.horizontal(|ui| {
            if ui
                .selectable_label(self.speaker_testing, "Test speaker")
                .clicked()
            {
                cmds.push(UiCommand::SpeakerTest(!self.speaker_testing));
            }
            if ui
                .selectable_label(self.microphone_testing, "Test microphone")
                .clicked()
            {
                cmds.push(UiCommand::MicrophoneTest(!self.microphone_testing));
            }
        });
        if self.microphone_testing {
            ui.add(egui::ProgressBar::new(f32::from(self.microphone_level) / 100.0));
        }
    }

    fn show_attendees(&self, ui: &mut egui::Ui, cmds: &mut Vec<UiCommand>) {
        let state = self.store.state();
        let avail = ui.available_size();

        if state.attendee_layout == AttendeeLayout::Speaker {
            let Some(main) = state.main_attendee() else {
                ui.label("Waiting for the meeting to start…");
                return;
            };
            let main_size = egui::vec2(avail.x, (avail.y - 140.0).max(120.0));
            utils::attendee_tile(ui, main, main_size, self.speaking.contains_key(&main.uid));
            egui::ScrollArea::horizontal().show(ui, |ui| {
                ui.horizontal(|ui| {
                    for a in state.attendees.iter().filter(|a| a.uid != main.uid) {
                        let tile = utils::attendee_tile(
                            ui,
                            a,
                            egui::vec2(160.0, 120.0),
                            self.speaking.contains_key(&a.uid),
                        );
                        if tile.clicked() {
                            cmds.push(UiCommand::MainAttendee(Some(a.uid)));
                        }
                    }
                });
            });
            return;
        }

        let pages = state.grid_page_count().max(1);
        let page = self.grid_page.min(pages - 1);
        let (cols, rows) = state.grid_dimensions();
        let spacing = 6.0;
        let tile = egui::vec2(
            (avail.x - spacing * cols as f32) / cols as f32,
            (avail.y - 40.0 - spacing * rows as f32) / rows as f32,
        );
        egui::Grid::new("attendee_grid")
            .num_columns(cols)
            .spacing([spacing, spacing])
            .show(ui, |ui| {
                for (i, a) in state.grid_page(page).iter().enumerate() {
                    utils::attendee_tile(ui, a, tile, self.speaking.contains_key(&a.uid));
                    if (i + 1) % cols == 0 {
                        ui.end_row();
                    }
                }
            });
        if pages > 1 {
            ui.horizontal(|ui| {
                for p in 0..pages {
                    if ui.selectable_label(p == page, format!("{}", p + 1)).clicked() {
                        cmds.push(UiCommand::Page(p));
                    }
                }
            });
        }
    }

    fn show_meeting(&mut self, ctx: &egui::Context) {
        let mut cmds = Vec::new();
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| self.show_toolbar(ui, &mut cmds));
        egui::SidePanel::right("side")
            .default_width(280.0)
            .show(ctx, |ui| self.show_side_panel(ui, &mut cmds));
        egui::TopBottomPanel::bottom("logs")
            .resizable(true)
            .default_height(140.0)
            .show(ctx, |ui| {
                ui.label(&self.status);
                egui::ScrollArea::vertical()
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        for line in &self.ui_logs {
                            ui.monospace(line);
                        }
                    });
            });
        egui::CentralPanel::default().show(ctx, |ui| self.show_attendees(ui, &mut cmds));

        for cmd in cmds {
            if let Err(e) = self.apply(cmd) {
                sink_warn!(self.log, "ui command failed: {}", e);
                self.status = format!("Error: {e}");
            }
        }
    }
}

impl App for MeetingApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.common.tick(now_millis());
        for ev in self.common.poll() {
            self.on_event(ev);
        }
        let ui_lines: Vec<String> = self
            .logger
            .as_ref()
            .map(|l| std::iter::from_fn(|| l.try_recv_ui()).collect())
            .unwrap_or_default();
        for line in ui_lines {
            self.push_log(line);
        }

        if self.store.state().connection == MeetingConnection::Disconnected {
            self.show_join_form(ctx);
        } else {
            self.show_meeting(ctx);
        }
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}
