use std::sync::mpsc::{self, Receiver, Sender};

use crate::rtc::events::{RtcEvent, RtcEventKind};

struct Subscriber {
    kinds: Vec<RtcEventKind>,
    tx: Sender<RtcEvent>,
}

/// Receiving end of a hub subscription.
///
/// Events are queued in publish order. Dropping the subscription ends
/// delivery and discards anything still queued; the hub forgets the
/// subscriber on its next publish.
#[derive(Debug)]
pub struct Subscription {
    rx: Receiver<RtcEvent>,
}

impl Subscription {
    /// Next queued event, if any.
    #[must_use]
    pub fn try_next(&self) -> Option<RtcEvent> {
        self.rx.try_recv().ok()
    }
}

/// Typed fan-out of [`RtcEvent`]s to the managers that asked for them.
#[derive(Default)]
pub struct RtcEventHub {
    subscribers: Vec<Subscriber>,
}

impl RtcEventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers interest in `kinds`.
    pub fn subscribe(&mut self, kinds: &[RtcEventKind]) -> Subscription {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(Subscriber {
            kinds: kinds.to_vec(),
            tx,
        });
        Subscription { rx }
    }

    pub fn unsubscribe_all(&mut self) {
        self.subscribers.clear();
    }

    /// Delivers `event` to every subscriber interested in its kind and
    /// returns how many received it.
    pub fn publish(&mut self, event: &RtcEvent) -> usize {
        let kind = event.kind();
        let mut delivered = 0;
        self.subscribers.retain(|s| {
            if !s.kinds.contains(&kind) {
                return true;
            }
            match s.tx.send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => false,
            }
        });
        delivered
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::rtc::{types::Uid, user::RtcUser};

    fn remove(uid: Uid) -> RtcEvent {
        RtcEvent::UserRemove(uid)
    }

    #[test]
    fn delivers_only_subscribed_kinds_in_order() {
        let mut hub = RtcEventHub::new();
        let users = hub.subscribe(&RtcEventKind::USER_LIFECYCLE);
        let errors = hub.subscribe(&[RtcEventKind::Error]);

        hub.publish(&RtcEvent::UserNew(RtcUser::new(1)));
        hub.publish(&remove(1));

        assert_eq!(users.try_next(), Some(RtcEvent::UserNew(RtcUser::new(1))));
        assert_eq!(users.try_next(), Some(remove(1)));
        assert_eq!(users.try_next(), None);
        assert_eq!(errors.try_next(), None);
    }

    #[test]
    fn dropped_subscription_is_pruned_on_publish() {
        let mut hub = RtcEventHub::new();
        let kept = hub.subscribe(&[RtcEventKind::UserRemove]);
        let dropped = hub.subscribe(&[RtcEventKind::UserRemove]);
        drop(dropped);

        assert_eq!(hub.publish(&remove(3)), 1);
        assert_eq!(hub.subscribers.len(), 1);
        assert_eq!(kept.try_next(), Some(remove(3)));
    }

    #[test]
    fn unsubscribe_all_stops_delivery() {
        let mut hub = RtcEventHub::new();
        let sub = hub.subscribe(&[RtcEventKind::UserRemove]);

        hub.unsubscribe_all();
        assert_eq!(hub.publish(&remove(9)), 0);
        assert_eq!(sub.try_next(), None);
    }
}
