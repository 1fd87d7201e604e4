/// Domain events raised from classified board mutations.

pub mod bus;

use std::fmt;

pub use bus::{EventBus, Handler};

use crate::tree::NodeId;

/// Closed set of event labels handlers subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    BoardChanged,
    CardAdded,
    CardRemoved,
    CardModified,
    ListAdded,
    ListRemoved,
    ListModified,
    ListTitleModified,
    ListDragged,
    ListDropped,
    BadgesModified,
    MembersModified,
}

impl EventKind {
    pub const ALL: [EventKind; 12] = [
        EventKind::BoardChanged,
        EventKind::CardAdded,
        EventKind::CardRemoved,
        EventKind::CardModified,
        EventKind::ListAdded,
        EventKind::ListRemoved,
        EventKind::ListModified,
        EventKind::ListTitleModified,
        EventKind::ListDragged,
        EventKind::ListDropped,
        EventKind::BadgesModified,
        EventKind::MembersModified,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::BoardChanged => "board_changed",
            EventKind::CardAdded => "card_added",
            EventKind::CardRemoved => "card_removed",
            EventKind::CardModified => "card_modified",
            EventKind::ListAdded => "list_added",
            EventKind::ListRemoved => "list_removed",
            EventKind::ListModified => "list_modified",
            EventKind::ListTitleModified => "list_title_modified",
            EventKind::ListDragged => "list_dragged",
            EventKind::ListDropped => "list_dropped",
            EventKind::BadgesModified => "badges_modified",
            EventKind::MembersModified => "members_modified",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified change of the board.
///
/// Node payloads point into the live tree. Removed nodes stay readable
/// (detached) so handlers can still inspect them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    /// A board became active. `old == Some(new)` is a forced refresh.
    BoardChanged { old: Option<String>, new: String },
    CardAdded(NodeId),
    CardRemoved(NodeId),
    CardModified {
        card: NodeId,
        title: String,
        old_title: String,
    },
    /// Payload is the panel wrapper.
    ListAdded(NodeId),
    /// Payload is the removed panel wrapper.
    ListRemoved(NodeId),
    /// Payload is the panel.
    ListModified(NodeId),
    ListTitleModified { list: NodeId, title: String },
    /// Wrapper being dragged, if the drag helper could be found.
    ListDragged(Option<NodeId>),
    /// Payload is the dropped panel wrapper.
    ListDropped(NodeId),
    BadgesModified(NodeId),
    MembersModified(NodeId),
}

impl DomainEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DomainEvent::BoardChanged { .. } => EventKind::BoardChanged,
            DomainEvent::CardAdded(_) => EventKind::CardAdded,
            DomainEvent::CardRemoved(_) => EventKind::CardRemoved,
            DomainEvent::CardModified { .. } => EventKind::CardModified,
            DomainEvent::ListAdded(_) => EventKind::ListAdded,
            DomainEvent::ListRemoved(_) => EventKind::ListRemoved,
            DomainEvent::ListModified(_) => EventKind::ListModified,
            DomainEvent::ListTitleModified { .. } => EventKind::ListTitleModified,
            DomainEvent::ListDragged(_) => EventKind::ListDragged,
            DomainEvent::ListDropped(_) => EventKind::ListDropped,
            DomainEvent::BadgesModified(_) => EventKind::BadgesModified,
            DomainEvent::MembersModified(_) => EventKind::MembersModified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_labels_are_unique() {
        let labels: HashSet<&str> = EventKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(labels.len(), EventKind::ALL.len());
        assert_eq!(EventKind::ListTitleModified.to_string(), "list_title_modified");
    }

    #[test]
    fn test_event_kind() {
        let event = DomainEvent::BoardChanged {
            old: None,
            new: "abc".to_string(),
        };
        assert_eq!(event.kind(), EventKind::BoardChanged);
        assert_eq!(DomainEvent::ListDragged(None).kind(), EventKind::ListDragged);
    }
}
