use crate::roles::SystemLabels;

/// A request the network collaborator must carry out. The tree has already
/// applied the optimistic local change by the time one of these is queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelAction {
    Create { name: String, parent: String },
    Rename { full_name_raw: String, new_name: String },
    Delete { full_name_raw: String },
    Subscribe { full_name_raw: String, subscribed: bool },
    Checkable { full_name_raw: String, checkable: bool },
    Clear { full_name_raw: String },
}

/// Everything the tree tells the outside world, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelEvent {
    /// A count setter ran on this label, whether or not the value was accepted.
    CountsChanged { full_name_raw: String },
    /// The Inbox unread count was written. Fired on every write, even when the
    /// value did not change.
    InboxUnreadCount(u32),
    /// A system-role slot changed; the settings collaborator should persist it.
    SystemLabelsChanged(SystemLabels),
    Action(LabelAction),
}

/// Ordered queue of pending events, drained by whoever owns the tree.
#[derive(Debug, Default)]
pub struct Outbox {
    events: Vec<LabelEvent>,
}

impl Outbox {
    pub fn push(&mut self, event: LabelEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<LabelEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_empties_in_order() {
        let mut outbox = Outbox::default();
        outbox.push(LabelEvent::InboxUnreadCount(3));
        outbox.push(LabelEvent::Action(LabelAction::Delete {
            full_name_raw: "Old".into(),
        }));
        assert_eq!(outbox.len(), 2);

        let events = outbox.drain();
        assert!(outbox.is_empty());
        assert_eq!(events[0], LabelEvent::InboxUnreadCount(3));
        assert!(matches!(events[1], LabelEvent::Action(LabelAction::Delete { .. })));
    }
}
