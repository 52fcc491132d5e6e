use std::sync::Arc;

use crate::{
    log::log_sink::LogSink,
    meeting::types::{MeetingConnection, MeetingConnectionReason, MeetingEvent, MeetingParams},
    rtc::{
        events::{RtcEvent, RtcEventKind},
        hub::Subscription,
        manager::RtcManager,
        rtc_error::{Result, RtcError},
        types::RtcJoinParams,
    },
    sink_info, sink_warn,
};

/// Meeting connection state machine, driven by the RTC `Connection` events.
pub struct MeetingManager {
    log: Arc<dyn LogSink>,
    initialized: bool,
    channel_name: String,
    connection: MeetingConnection,
    subscription: Option<Subscription>,
}

impl MeetingManager {
    pub fn new(log: Arc<dyn LogSink>) -> Self {
        Self {
            log,
            initialized: false,
            channel_name: String::new(),
            connection: MeetingConnection::Disconnected,
            subscription: None,
        }
    }

    pub fn initialize(&mut self, rtc: &mut RtcManager) {
        if self.initialized {
            return;
        }
        sink_info!(self.log, "meeting manager initialize");
        self.subscription = Some(rtc.subscribe(&[RtcEventKind::Connection]));
        self.initialized = true;
    }

    pub fn release(&mut self) {
        if !self.initialized {
            return;
        }
        sink_info!(self.log, "meeting manager release");
        self.subscription = None;
        self.reset();
        self.initialized = false;
    }

    pub fn reset(&mut self) {
        self.channel_name.clear();
        self.connection = MeetingConnection::Disconnected;
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[must_use]
    pub fn is_in_meeting(&self) -> bool {
        self.connection != MeetingConnection::Disconnected
    }

    #[must_use]
    pub fn connection(&self) -> MeetingConnection {
        self.connection
    }

    #[must_use]
    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    /// Joins through `rtc` unless a meeting is already in progress.
    /// A join whose connection change has not been pumped yet counts as
    /// in progress.
    ///
    /// # Errors
    /// [`RtcError::AlreadyInChannel`] when already in a meeting, or whatever
    /// the RTC layer reports.
    pub fn join_meeting(&mut self, rtc: &mut RtcManager, params: &MeetingParams) -> Result<()> {
        if self.is_in_meeting() || rtc.is_in_channel() {
            sink_warn!(self.log, "meeting manager join meeting failed, already joined");
            return Err(RtcError::AlreadyInChannel);
        }
        sink_info!(
            self.log,
            "meeting manager join meeting '{}' as '{}' camera {} audio {}",
            params.channel_name,
            params.nickname,
            params.is_camera_on,
            params.is_audio_on
        );
        rtc.join_channel(&RtcJoinParams::from(params))?;
        self.channel_name.clone_from(&params.channel_name);
        Ok(())
    }

    /// # Errors
    /// [`RtcError::NotInChannel`] when no meeting is in progress.
    pub fn leave_meeting(&mut self, rtc: &mut RtcManager) -> Result<()> {
        if !self.is_in_meeting() && !rtc.is_in_channel() {
            sink_warn!(self.log, "meeting manager leave meeting failed, not in meeting");
            return Err(RtcError::NotInChannel);
        }
        sink_info!(self.log, "meeting manager leave meeting");
        rtc.leave_channel()
    }

    /// Applies every queued RTC connection change.
    pub fn pump(&mut self) -> Vec<MeetingEvent> {
        let mut queued = Vec::new();
        if let Some(sub) = &self.subscription {
            while let Some(ev) = sub.try_next() {
                queued.push(ev);
            }
        }
        queued
            .iter()
            .filter_map(|ev| self.handle_event(ev))
            .collect()
    }

    pub fn handle_event(&mut self, event: &RtcEvent) -> Option<MeetingEvent> {
        let RtcEvent::Connection { state, reason } = event else {
            return None;
        };
        if !self.initialized {
            return None;
        }
        sink_info!(self.log, "meeting manager on rtc connection {:?} {:?}", state, reason);
        self.connection = MeetingConnection::from(*state);
        Some(MeetingEvent::Connection {
            state: self.connection,
            reason: MeetingConnectionReason::from(*reason),
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::{
        log::MemoryLogSink,
        log::log_level::LogLevel,
        rtc::{
            engine::EngineNotification,
            loopback::{EngineCommand, LoopbackEngine},
            types::{RtcConnection, RtcConnectionReason},
        },
    };

    fn params() -> MeetingParams {
        MeetingParams {
            channel_name: "daily".into(),
            nickname: "sam".into(),
            is_camera_on: true,
            is_audio_on: false,
        }
    }

    fn setup() -> (MeetingManager, RtcManager, LoopbackEngine, Arc<MemoryLogSink>) {
        let log = Arc::new(MemoryLogSink::new());
        let engine = LoopbackEngine::new();
        let mut rtc = RtcManager::new(Box::new(engine.clone()), log.clone());
        rtc.initialize("app", "./log/").expect("initialize");
        let mut meeting = MeetingManager::new(log.clone());
        meeting.initialize(&mut rtc);
        (meeting, rtc, engine, log)
    }

    fn states(events: &[MeetingEvent]) -> Vec<MeetingConnection> {
        events
            .iter()
            .map(|MeetingEvent::Connection { state, .. }| *state)
            .collect()
    }

    #[test]
    fn full_lifecycle_follows_rtc_connection() {
        let (mut meeting, mut rtc, _engine, _log) = setup();
        meeting.join_meeting(&mut rtc, &params()).expect("join");
        assert_eq!(meeting.channel_name(), "daily");
        rtc.poll();
        assert_eq!(
            states(&meeting.pump()),
            vec![MeetingConnection::Connecting, MeetingConnection::Connected]
        );

        meeting.leave_meeting(&mut rtc).expect("leave");
        rtc.poll();
        assert_eq!(
            states(&meeting.pump()),
            vec![MeetingConnection::Disconnecting, MeetingConnection::Disconnected]
        );
        assert!(!meeting.is_in_meeting());
    }

    #[test]
    fn reconnecting_carries_rtc_error_reason() {
        let (mut meeting, mut rtc, engine, _log) = setup();
        meeting.join_meeting(&mut rtc, &params()).expect("join");
        engine.inject(EngineNotification::ConnectionStateChanged {
            state: RtcConnection::ReConnecting,
            reason: RtcConnectionReason::Error,
        });
        rtc.poll();
        let events = meeting.pump();
        assert_eq!(
            events.last(),
            Some(&MeetingEvent::Connection {
                state: MeetingConnection::ReConnecting,
                reason: MeetingConnectionReason::RtcError
            })
        );
    }

    #[test]
    fn join_and_leave_are_guarded_and_logged() {
        let (mut meeting, mut rtc, _engine, log) = setup();
        assert_eq!(meeting.leave_meeting(&mut rtc), Err(RtcError::NotInChannel));

        meeting.join_meeting(&mut rtc, &params()).expect("join");
        meeting.pump();
        assert_eq!(
            meeting.join_meeting(&mut rtc, &params()),
            Err(RtcError::AlreadyInChannel)
        );
        assert!(log.contains(LogLevel::Warn, "already joined"));
        assert!(log.contains(LogLevel::Warn, "not in meeting"));
    }

    #[test]
    fn join_before_connection_is_pumped_is_rejected() {
        let (mut meeting, mut rtc, engine, log) = setup();
        meeting.join_meeting(&mut rtc, &params()).expect("join");
        assert_eq!(
            meeting.join_meeting(&mut rtc, &params()),
            Err(RtcError::AlreadyInChannel)
        );
        assert!(log.contains(LogLevel::Warn, "already joined"));
        let joins = engine
            .commands()
            .iter()
            .filter(|c| matches!(c, EngineCommand::JoinChannel { .. }))
            .count();
        assert_eq!(joins, 1);

        meeting.leave_meeting(&mut rtc).expect("leave before pump");
    }

    #[test]
    fn release_stops_tracking() {
        let (mut meeting, mut rtc, _engine, _log) = setup();
        meeting.join_meeting(&mut rtc, &params()).expect("join");
        meeting.release();
        assert!(!meeting.is_initialized());
        assert_eq!(meeting.connection(), MeetingConnection::Disconnected);
        assert!(meeting.pump().is_empty());
    }
}
