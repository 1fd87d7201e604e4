/// Mutation batch classification.
///
/// Rules match on the shape of each record (counts and kinds of added and
/// removed nodes, and the target). They are heuristics over what the host
/// page does, not guarantees: records that fit no rule produce nothing.
use crate::events::DomainEvent;
use crate::tree::shape;
use crate::tree::{MutationRecord, NodeId, Tree};

fn single(nodes: &[NodeId]) -> Option<NodeId> {
    match nodes {
        [node] => Some(*node),
        _ => None,
    }
}

/// Classify a batch delivered to the panel-container watch.
pub fn classify_container_batch(tree: &Tree, batch: &[MutationRecord]) -> Vec<DomainEvent> {
    let mut events = Vec::new();
    let mut dropped = false;
    let mut added_panel = None;

    for record in batch {
        let added = single(&record.added);
        let removed = single(&record.removed);

        if let Some(node) = added.filter(|&n| shape::is_placeholder(tree, n)) {
            let helper = tree.find_first(tree.document(), shape::is_drag_helper);
            log::debug!(
                "[foldboard.watcher.classify] placeholder {} added, dragging {:?}",
                node.index(),
                helper
            );
            events.push(DomainEvent::ListDragged(helper));
        } else if removed.is_some_and(|n| shape::is_placeholder(tree, n)) {
            dropped = true;
        } else if let Some(wrapper) = added.filter(|&n| shape::is_panel_wrapper(tree, n)) {
            added_panel = Some(wrapper);
        } else if let Some(wrapper) = removed.filter(|&n| shape::is_panel_wrapper(tree, n)) {
            events.push(DomainEvent::ListRemoved(wrapper));
        }
    }

    if let Some(wrapper) = added_panel {
        events.push(if dropped {
            DomainEvent::ListDropped(wrapper)
        } else {
            DomainEvent::ListAdded(wrapper)
        });
    }
    events
}

/// Classify a batch delivered to the per-panel watches.
pub fn classify_item_batch(
    tree: &Tree,
    batch: &[MutationRecord],
    board_id: &str,
) -> Vec<DomainEvent> {
    let mut events = Vec::new();
    for record in batch {
        classify_item_record(tree, record, board_id, &mut events);
    }
    events
}

fn classify_item_record(
    tree: &Tree,
    record: &MutationRecord,
    board_id: &str,
    events: &mut Vec<DomainEvent>,
) {
    let target = record.target;
    let first_added = record.added.first().copied();
    let first_removed = record.removed.first().copied();
    let item_of_target = || tree.closest(target, shape::is_item);

    let is_member = |nodes: &[NodeId]| single(nodes).is_some_and(|n| shape::is_member(tree, n));
    let member_changed = is_member(&record.removed) || is_member(&record.added);

    if member_changed {
        if let Some(item) = item_of_target() {
            events.push(DomainEvent::MembersModified(item));
        }
    } else if record.added.len() == 1 && shape::is_custom_badge_row(tree, target) {
        if let Some(item) = item_of_target() {
            events.push(DomainEvent::BadgesModified(item));
        }
    } else if let Some(item) = first_added.filter(|&n| shape::is_item(tree, n)) {
        if !shape::is_placeholder_item(tree, item) {
            events.push(DomainEvent::CardAdded(item));
        }
        if let Some(panel) = tree.containing_panel(target) {
            events.push(DomainEvent::ListModified(panel));
        }
    } else if let Some(item) = first_removed.filter(|&n| shape::is_item(tree, n)) {
        events.push(DomainEvent::CardRemoved(item));
        if tree.is_attached(target) {
            if let Some(panel) = tree.containing_panel(target) {
                events.push(DomainEvent::ListModified(panel));
            }
        }
    } else if is_title_edit(tree, record) {
        if let Some(card) = item_of_target() {
            events.push(DomainEvent::CardModified {
                card,
                title: tree.text_content(record.added[1]),
                old_title: tree.text_content(record.removed[1]),
            });
        }
    } else if shape::is_panel_title_assist(tree, target) && record.added.len() == 1 {
        if let Some(list) = tree.containing_panel(target) {
            events.push(DomainEvent::ListTitleModified {
                list,
                title: tree.text_content(record.added[0]),
            });
        }
    } else if first_added.is_some_and(|n| shape::is_cover_image(tree, n)) {
        // Cover images load after the item renders and knock derived state out of step.
        events.push(DomainEvent::BoardChanged {
            old: Some(board_id.to_string()),
            new: board_id.to_string(),
        });
    }
}

/// Exactly two nodes swapped for two, the second landing inside an item title.
fn is_title_edit(tree: &Tree, record: &MutationRecord) -> bool {
    record.added.len() == 2
        && record.removed.len() == 2
        && tree
            .parent(record.added[1])
            .is_some_and(|p| shape::is_item_title(tree, p))
}
