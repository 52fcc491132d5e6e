use std::sync::Arc;

use crate::{
    attendee::{attendee::Attendee, events::AttendeeEvent, roster::Roster},
    log::log_sink::LogSink,
    rtc::{
        events::{RtcEvent, RtcEventKind},
        hub::Subscription,
        manager::RtcManager,
        types::{RtcUserUpdateReason, Uid},
        user::RtcUser,
    },
    sink_debug, sink_info, sink_trace,
};

pub type AttendeeListener = Box<dyn FnMut(&AttendeeEvent) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// The roster engine.
///
/// Consumes the RTC user lifecycle (`UserNew`, `UserUpdate`, `UserRemove`),
/// keeps the ordered [`Roster`] and reports every structural change as an
/// [`AttendeeEvent`] to the registered listeners and to the caller of
/// [`pump`](Self::pump). Lookups that miss are benign races and are ignored.
pub struct AttendeeManager {
    log: Arc<dyn LogSink>,
    initialized: bool,
    roster: Roster,
    subscription: Option<Subscription>,
    listeners: Vec<(ListenerId, AttendeeListener)>,
    next_listener: u64,
}

impl AttendeeManager {
    pub fn new(log: Arc<dyn LogSink>) -> Self {
        Self {
            log,
            initialized: false,
            roster: Roster::new(),
            subscription: None,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    /// Subscribes to the user lifecycle of `rtc`. No-op if already initialized.
    pub fn initialize(&mut self, rtc: &mut RtcManager) {
        if self.initialized {
            return;
        }
        sink_info!(self.log, "attendee manager initialize");
        self.subscription = Some(rtc.subscribe(&RtcEventKind::USER_LIFECYCLE));
        self.initialized = true;
    }

    /// Drops the subscription and every listener, then resets.
    /// No-op if not initialized.
    pub fn release(&mut self) {
        if !self.initialized {
            return;
        }
        sink_info!(self.log, "attendee manager release");
        self.subscription = None;
        self.listeners.clear();
        self.reset();
        self.initialized = false;
    }

    /// Empties the roster. Subscription and listeners are kept.
    pub fn reset(&mut self) {
        self.roster.clear();
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Registers a listener called synchronously for every emitted event.
    pub fn on(&mut self, listener: AttendeeListener) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    #[must_use]
    pub fn attendees(&self) -> &[Attendee] {
        self.roster.as_slice()
    }

    #[must_use]
    pub fn attendee(&self, uid: Uid) -> Option<&Attendee> {
        self.roster.position(uid).and_then(|i| self.roster.get(i))
    }

    /// Handles every queued RTC user event and returns what was emitted.
    pub fn pump(&mut self) -> Vec<AttendeeEvent> {
        let mut queued = Vec::new();
        if let Some(sub) = &self.subscription {
            while let Some(ev) = sub.try_next() {
                queued.push(ev);
            }
        }
        queued
            .iter()
            .flat_map(|ev| self.handle_event(ev))
            .collect()
    }

    /// Applies one RTC event to the roster, notifies listeners and returns
    /// the emitted events. Ignored when not initialized.
    pub fn handle_event(&mut self, event: &RtcEvent) -> Vec<AttendeeEvent> {
        if !self.initialized {
            return Vec::new();
        }
        let emitted = match event {
            RtcEvent::UserNew(user) => self.on_user_new(user),
            RtcEvent::UserUpdate { new, reason, .. } => self.on_user_update(new, *reason),
            RtcEvent::UserRemove(uid) => self.on_user_remove(*uid),
            _ => Vec::new(),
        };
        for ev in &emitted {
            for (_, listener) in &mut self.listeners {
                listener(ev);
            }
        }
        emitted
    }

    fn on_user_new(&mut self, user: &RtcUser) -> Vec<AttendeeEvent> {
        if let Some(position) = self.roster.position(user.uid) {
            let Some(existing) = self.roster.get_mut(position) else {
                return Vec::new();
            };
            existing.apply(user);
            let attendee = existing.clone();
            sink_debug!(self.log, "attendee {} appeared again at {}", user.uid, position);
            return vec![AttendeeEvent::Update { position, attendee }];
        }

        let attendee = Attendee::from_user(user);
        let position = self.roster.insert_by_priority(attendee.clone());
        sink_debug!(self.log, "attendee {} new at {}", user.uid, position);
        vec![AttendeeEvent::New { position, attendee }]
    }

    fn on_user_update(&mut self, user: &RtcUser, reason: RtcUserUpdateReason) -> Vec<AttendeeEvent> {
        let Some(old_position) = self.roster.position(user.uid) else {
            sink_trace!(self.log, "attendee update for unknown uid {}", user.uid);
            return Vec::new();
        };
        let Some(existing) = self.roster.get_mut(old_position) else {
            return Vec::new();
        };
        existing.apply(user);
        let attendee = existing.clone();

        if reason == RtcUserUpdateReason::Info || old_position <= 1 {
            return vec![AttendeeEvent::Update {
                position: old_position,
                attendee,
            }];
        }

        let Some(new_position) = self.roster.reposition(old_position) else {
            return Vec::new();
        };
        if new_position == old_position {
            return vec![AttendeeEvent::Update {
                position: old_position,
                attendee,
            }];
        }
        sink_debug!(
            self.log,
            "attendee {} moved {} -> {}",
            user.uid,
            old_position,
            new_position
        );
        vec![
            AttendeeEvent::Update {
                position: old_position,
                attendee,
            },
            AttendeeEvent::Replace {
                old_position,
                new_position,
            },
        ]
    }

    fn on_user_remove(&mut self, uid: Uid) -> Vec<AttendeeEvent> {
        match self.roster.remove(uid) {
            Some((position, _)) => {
                sink_debug!(self.log, "attendee {} removed from {}", uid, position);
                vec![AttendeeEvent::Remove { position }]
            }
            None => {
                sink_trace!(self.log, "attendee remove for unknown uid {}", uid);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use std::sync::Mutex;

    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        attendee::priority::priority,
        log::NoopLogSink,
        rtc::{loopback::LoopbackEngine, types::RtcJoinParams},
    };

    fn rtc() -> RtcManager {
        let mut rtc = RtcManager::new(Box::new(LoopbackEngine::manual()), Arc::new(NoopLogSink));
        rtc.initialize("app", "./log/").expect("initialize");
        rtc
    }

    fn manager() -> (AttendeeManager, RtcManager) {
        let mut rtc = rtc();
        let mut m = AttendeeManager::new(Arc::new(NoopLogSink));
        m.initialize(&mut rtc);
        (m, rtc)
    }

    fn me(uid: Uid) -> RtcUser {
        RtcUser {
            is_self: Some(true),
            ..RtcUser::remote(uid)
        }
    }

    fn remote(uid: Uid, audio: bool, camera: bool) -> RtcUser {
        RtcUser::remote(uid).with_audio(audio).with_camera(camera)
    }

    fn update(uid: Uid, patch: RtcUser, reason: RtcUserUpdateReason) -> RtcEvent {
        RtcEvent::UserUpdate {
            old: None,
            new: RtcUser { uid, ..patch },
            reason,
        }
    }

    fn uids(m: &AttendeeManager) -> Vec<Uid> {
        m.attendees().iter().map(|a| a.uid).collect()
    }

    fn seed(m: &mut AttendeeManager, users: Vec<RtcUser>) {
        for u in users {
            m.handle_event(&RtcEvent::UserNew(u));
        }
    }

    #[test]
    fn self_user_lands_at_zero() {
        let (mut m, _rtc) = manager();
        let out = m.handle_event(&RtcEvent::UserNew(me(1)));
        assert_eq!(out.len(), 1);
        assert!(matches!(&out[0], AttendeeEvent::New { position: 0, attendee } if attendee.is_self));
        assert_eq!(uids(&m), vec![1]);
    }

    #[test]
    fn silent_remote_joins_after_self() {
        let (mut m, _rtc) = manager();
        seed(&mut m, vec![me(1)]);
        let out = m.handle_event(&RtcEvent::UserNew(remote(2, false, false)));
        assert!(matches!(&out[0], AttendeeEvent::New { position: 1, .. }));
        assert_eq!(uids(&m), vec![1, 2]);
    }

    #[test]
    fn camera_on_overtakes_audio_only_attendee() {
        let (mut m, _rtc) = manager();
        seed(&mut m, vec![me(1), remote(2, false, false), remote(3, true, false)]);
        assert_eq!(uids(&m), vec![1, 3, 2]);

        let out = m.handle_event(&update(
            2,
            RtcUser::new(2).with_camera(true),
            RtcUserUpdateReason::Media,
        ));
        assert_eq!(out.len(), 2);
        assert!(matches!(&out[0], AttendeeEvent::Update { position: 2, attendee } if attendee.is_camera_on));
        assert_eq!(
            out[1],
            AttendeeEvent::Replace {
                old_position: 2,
                new_position: 1
            }
        );
        assert_eq!(uids(&m), vec![1, 2, 3]);

        let out = m.handle_event(&update(
            2,
            RtcUser::new(2).with_audio(true),
            RtcUserUpdateReason::Media,
        ));
        assert!(matches!(&out[..], [AttendeeEvent::Update { position: 1, .. }]));
    }

    #[test]
    fn media_update_that_keeps_its_slot_emits_update_only() {
        let (mut m, _rtc) = manager();
        seed(
            &mut m,
            vec![me(1), remote(2, true, true), remote(3, true, false), remote(4, false, false)],
        );
        assert_eq!(uids(&m), vec![1, 2, 3, 4]);

        let out = m.handle_event(&update(
            3,
            RtcUser::new(3).with_camera(true),
            RtcUserUpdateReason::Media,
        ));
        assert!(matches!(&out[..], [AttendeeEvent::Update { position: 2, .. }]));
        assert_eq!(uids(&m), vec![1, 2, 3, 4]);
    }

    #[test]
    fn remove_reports_prior_position() {
        let (mut m, _rtc) = manager();
        seed(
            &mut m,
            vec![me(1), remote(10, false, false), remote(11, false, false), remote(12, false, false)],
        );
        let out = m.handle_event(&RtcEvent::UserRemove(11));
        assert_eq!(out, vec![AttendeeEvent::Remove { position: 2 }]);
        assert_eq!(uids(&m), vec![1, 10, 12]);

        assert!(m.handle_event(&RtcEvent::UserRemove(11)).is_empty());
    }

    #[test]
    fn update_for_unknown_uid_is_ignored() {
        let (mut m, _rtc) = manager();
        seed(&mut m, vec![me(1), remote(2, false, false)]);
        let before = m.attendees().to_vec();
        let out = m.handle_event(&update(
            99,
            RtcUser::new(99).with_camera(true),
            RtcUserUpdateReason::Media,
        ));
        assert!(out.is_empty());
        assert_eq!(m.attendees(), &before[..]);
    }

    #[test]
    fn info_updates_and_pinned_slots_never_move() {
        let (mut m, _rtc) = manager();
        seed(
            &mut m,
            vec![me(1), remote(2, false, false), remote(3, false, false), remote(4, false, false)],
        );

        let out = m.handle_event(&update(
            4,
            RtcUser::new(4).with_camera(true).with_nickname("x"),
            RtcUserUpdateReason::Info,
        ));
        assert!(matches!(&out[..], [AttendeeEvent::Update { position: 3, .. }]));

        let out = m.handle_event(&update(
            2,
            RtcUser::new(2).with_audio(true),
            RtcUserUpdateReason::Media,
        ));
        assert!(matches!(&out[..], [AttendeeEvent::Update { position: 1, .. }]));
        assert_eq!(uids(&m), vec![1, 2, 3, 4]);
    }

    #[test]
    fn whiteboard_update_is_priority_relevant() {
        let (mut m, _rtc) = manager();
        seed(
            &mut m,
            vec![me(1), remote(2, true, true), remote(3, false, false)],
        );
        let out = m.handle_event(&update(
            3,
            RtcUser::new(3).with_whiteboard("room", "span"),
            RtcUserUpdateReason::WhiteBoard,
        ));
        assert_eq!(
            out[1],
            AttendeeEvent::Replace {
                old_position: 2,
                new_position: 1
            }
        );
        assert!(m.attendee(3).is_some_and(|a| a.has_whiteboard));
    }

    #[test]
    fn duplicate_new_merges_in_place() {
        let (mut m, _rtc) = manager();
        seed(&mut m, vec![me(1), remote(2, false, false), remote(3, false, false)]);
        let out = m.handle_event(&RtcEvent::UserNew(RtcUser::new(2).with_camera(true)));
        assert!(matches!(&out[..], [AttendeeEvent::Update { position: 1, attendee }] if attendee.is_camera_on));
        assert_eq!(uids(&m), vec![1, 2, 3]);
    }

    #[test]
    fn initialize_is_idempotent_and_release_stops_handling() {
        let mut rtc = rtc();
        let mut m = AttendeeManager::new(Arc::new(NoopLogSink));
        assert!(m.handle_event(&RtcEvent::UserNew(me(1))).is_empty());

        m.initialize(&mut rtc);
        m.initialize(&mut rtc);
        rtc.join_channel(&RtcJoinParams {
            channel_name: "room".into(),
            nickname: "me".into(),
            is_camera_on: true,
            is_audio_on: true,
        })
        .expect("join");

        let out = m.pump();
        assert_eq!(out.len(), 1, "one subscription, one event");
        assert_eq!(m.attendees().len(), 1);

        m.release();
        m.release();
        assert!(!m.is_initialized());
        assert!(m.attendees().is_empty());
        assert!(m.handle_event(&RtcEvent::UserNew(me(1))).is_empty());
    }

    #[test]
    fn listeners_receive_events_until_removed() {
        let (mut m, _rtc) = manager();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = m.on(Box::new(move |ev| sink.lock().expect("lock").push(ev.clone())));

        seed(&mut m, vec![me(1), remote(2, false, false)]);
        assert!(m.off(id));
        seed(&mut m, vec![remote(3, false, false)]);

        let seen = seen.lock().expect("lock");
        assert_eq!(seen.len(), 2);
        assert!(matches!(seen[1], AttendeeEvent::New { position: 1, .. }));
    }

    #[test]
    fn reset_keeps_subscription() {
        let (mut m, _rtc) = manager();
        seed(&mut m, vec![me(1)]);
        m.reset();
        assert!(m.attendees().is_empty());
        assert!(m.is_initialized());
    }

    #[test]
    fn random_event_streams_keep_roster_invariants() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _round in 0..40 {
            let (mut m, _rtc) = manager();
            let mut mirror: Vec<Attendee> = Vec::new();
            for ev in m.handle_event(&RtcEvent::UserNew(me(1))) {
                assert!(ev.apply_to(&mut mirror));
            }

            for _step in 0..60 {
                let uid = rng.gen_range(2..12);
                let event = match rng.gen_range(0..4) {
                    0 => RtcEvent::UserNew(remote(uid, rng.gen_bool(0.5), rng.gen_bool(0.5))),
                    1 => RtcEvent::UserRemove(uid),
                    2 => {
                        let patch = if rng.gen_bool(0.2) {
                            RtcUser::new(uid).with_whiteboard("wb", "ts")
                        } else {
                            RtcUser::new(uid)
                                .with_audio(rng.gen_bool(0.5))
                                .with_camera(rng.gen_bool(0.5))
                        };
                        let reason = if rng.gen_bool(0.5) {
                            RtcUserUpdateReason::Media
                        } else {
                            RtcUserUpdateReason::WhiteBoard
                        };
                        update(uid, patch, reason)
                    }
                    _ => update(uid, RtcUser::new(uid).with_nickname("n"), RtcUserUpdateReason::Info),
                };

                let out = m.handle_event(&event);
                for (i, ev) in out.iter().enumerate() {
                    assert!(ev.apply_to(&mut mirror), "event {ev:?} out of range");
                    if let AttendeeEvent::Replace { old_position, .. } = ev {
                        assert!(
                            matches!(out.get(i.wrapping_sub(1)), Some(AttendeeEvent::Update { position, .. }) if position == old_position),
                            "replace must follow an update at its old position"
                        );
                    }
                    let target = match ev {
                        AttendeeEvent::Update { position, .. } if *position > 1 && out.len() == 1 => Some(*position),
                        AttendeeEvent::Replace { new_position, .. } => Some(*new_position),
                        _ => None,
                    };
                    if let (Some(t), RtcEvent::UserUpdate { reason, .. }) = (target, &event) {
                        if *reason != RtcUserUpdateReason::Info {
                            let p = priority(&m.attendees()[t]);
                            assert!(m.attendees()[..t].iter().all(|a| priority(a) <= p));
                        }
                    }
                }

                let list = m.attendees();
                assert!(list[0].is_self);
                let mut seen: Vec<Uid> = list.iter().map(|a| a.uid).collect();
                seen.sort_unstable();
                seen.dedup();
                assert_eq!(seen.len(), list.len(), "duplicate uid in roster");
                assert_eq!(mirror, list, "mirror diverged after {event:?}");
            }
        }
    }
}
