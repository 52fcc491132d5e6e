use crate::{
    attendee::{attendee::Attendee, priority::priority},
    rtc::types::Uid,
};

/// Ordered attendee sequence. Order is presentation order; index 0 holds the
/// local attendee once a meeting is joined.
#[derive(Debug, Default, Clone)]
pub struct Roster {
    entries: Vec<Attendee>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Attendee] {
        &self.entries
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Attendee> {
        self.entries.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Attendee> {
        self.entries.get_mut(index)
    }

    #[must_use]
    pub fn position(&self, uid: Uid) -> Option<usize> {
        self.entries.iter().position(|a| a.uid == uid)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Index at which an entry with priority `p` belongs: the first slot
    /// from the scan start whose occupant has a strictly greater priority,
    /// or the end. The scan skips slot 0 while it holds the local attendee.
    #[must_use]
    pub fn insertion_point(&self, p: i32) -> usize {
        // Remote events can arrive before the local attendee is added. Until
        // then slot 0 holds a remote and is ordered like every other slot.
        let start = match self.entries.first() {
            Some(first) if first.is_self => 1,
            _ => 0,
        };
        self.entries
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, a)| priority(a) > p)
            .map_or(self.entries.len(), |(i, _)| i)
    }

    /// Inserts at the priority-determined index and returns it.
    pub fn insert_by_priority(&mut self, attendee: Attendee) -> usize {
        let index = self.insertion_point(priority(&attendee));
        self.entries.insert(index, attendee);
        index
    }

    /// Removes the entry for `uid`, returning its former index and value.
    pub fn remove(&mut self, uid: Uid) -> Option<(usize, Attendee)> {
        let index = self.position(uid)?;
        Some((index, self.entries.remove(index)))
    }

    /// Takes the entry at `index` out and reinserts it by priority against
    /// the remaining entries. Returns the new index, or `None` if `index` is
    /// out of range. Relative order of all other entries is preserved.
    pub fn reposition(&mut self, index: usize) -> Option<usize> {
        if index >= self.entries.len() {
            return None;
        }
        let attendee = self.entries.remove(index);
        Some(self.insert_by_priority(attendee))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attendee> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    fn me() -> Attendee {
        Attendee {
            uid: 1,
            is_self: true,
            ..Attendee::default()
        }
    }

    fn remote(uid: Uid, audio: bool, camera: bool) -> Attendee {
        Attendee {
            uid,
            is_audio_on: audio,
            is_camera_on: camera,
            ..Attendee::default()
        }
    }

    fn uids(r: &Roster) -> Vec<Uid> {
        r.iter().map(|a| a.uid).collect()
    }

    #[test]
    fn equal_priorities_settle_after_existing_entries() {
        let mut r = Roster::new();
        assert_eq!(r.insert_by_priority(me()), 0);
        assert_eq!(r.insert_by_priority(remote(2, false, false)), 1);
        assert_eq!(r.insert_by_priority(remote(3, false, false)), 2);
        assert_eq!(r.insert_by_priority(remote(4, true, false)), 1);
        assert_eq!(uids(&r), vec![1, 4, 2, 3]);
    }

    #[test]
    fn slot_zero_is_never_displaced_by_a_remote() {
        let mut r = Roster::new();
        r.insert_by_priority(me());
        assert_eq!(r.insert_by_priority(remote(2, true, true)), 1);
        assert_eq!(r.get(0).map(|a| a.uid), Some(1));
    }

    #[test]
    fn self_arriving_late_still_takes_slot_zero() {
        let mut r = Roster::new();
        r.insert_by_priority(remote(2, false, false));
        assert_eq!(r.insert_by_priority(me()), 0);
        assert_eq!(uids(&r), vec![1, 2]);
    }

    #[test]
    fn remotes_ahead_of_self_are_ordered_from_slot_zero() {
        let mut r = Roster::new();
        r.insert_by_priority(remote(2, false, false));
        assert_eq!(r.insert_by_priority(remote(3, true, true)), 0);
        assert_eq!(r.insert_by_priority(me()), 0);
        assert_eq!(uids(&r), vec![1, 3, 2]);
    }

    #[test]
    fn reposition_keeps_other_entries_in_order() {
        let mut r = Roster::new();
        for a in [me(), remote(2, true, false), remote(3, false, false), remote(4, false, false)] {
            r.insert_by_priority(a);
        }
        assert_eq!(uids(&r), vec![1, 2, 3, 4]);

        r.get_mut(3).expect("entry").is_camera_on = true;
        assert_eq!(r.reposition(3), Some(1));
        assert_eq!(uids(&r), vec![1, 4, 2, 3]);
        assert_eq!(r.reposition(9), None);
    }

    #[test]
    fn remove_reports_prior_index() {
        let mut r = Roster::new();
        for a in [me(), remote(2, false, false), remote(3, false, false)] {
            r.insert_by_priority(a);
        }
        assert_eq!(r.remove(2).map(|(i, _)| i), Some(1));
        assert!(r.remove(2).is_none());
        assert_eq!(uids(&r), vec![1, 3]);
    }
}
