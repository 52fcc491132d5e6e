use crate::attendee::attendee::Attendee;

/// Position-addressed roster mutation.
///
/// Applied in emission order, these keep a mirrored list identical to the
/// roster: `New` inserts at `position`, `Update` replaces in place, `Remove`
/// deletes, and `Replace` moves the element at `old_position` to
/// `new_position`. A `Replace` is always preceded by an `Update` addressed
/// to its `old_position`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttendeeEvent {
    New { position: usize, attendee: Attendee },
    Update { position: usize, attendee: Attendee },
    Remove { position: usize },
    Replace { old_position: usize, new_position: usize },
}

impl AttendeeEvent {
    /// Applies the event to a mirrored list. Returns false, leaving the list
    /// untouched, if a position is out of range.
    pub fn apply_to(&self, list: &mut Vec<Attendee>) -> bool {
        match self {
            AttendeeEvent::New { position, attendee } => {
                if *position > list.len() {
                    return false;
                }
                list.insert(*position, attendee.clone());
            }
            AttendeeEvent::Update { position, attendee } => match list.get_mut(*position) {
                Some(slot) => *slot = attendee.clone(),
                None => return false,
            },
            AttendeeEvent::Remove { position } => {
                if *position >= list.len() {
                    return false;
                }
                list.remove(*position);
            }
            AttendeeEvent::Replace {
                old_position,
                new_position,
            } => {
                if *old_position >= list.len() || *new_position >= list.len() {
                    return false;
                }
                let moved = list.remove(*old_position);
                list.insert(*new_position, moved);
            }
        }
        true
    }
}
