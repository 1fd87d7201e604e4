/// Item formatting: section headers, comments and blocked items.
use crate::parser;
use crate::tree::shape;
use crate::tree::{NodeId, Tree};

use super::{EngineError, FrameTask, PanelStateEngine};

impl PanelStateEngine {
    pub fn format_cards(&mut self, tree: &Tree) {
        let items = tree.all_items();
        log::debug!("[foldboard.engine.cards] Formatting {} items", items.len());
        for item in items {
            self.format_card(tree, item);
        }
    }

    /// Queue the decoration matching the item's kind for the next frame.
    pub fn format_card(&mut self, tree: &Tree, item: NodeId) {
        let Some(title) = tree.item_title(item) else {
            log::debug!("[foldboard.engine.cards] Item {} has no title", item.index());
            return;
        };
        if self.marker.is_section(&title) {
            self.defer(FrameTask::FormatSection(item));
        } else if parser::is_comment(&title) {
            self.defer(FrameTask::MarkComment(item));
        } else if tree.is_blocked(item) {
            self.defer(FrameTask::MarkBlocked(item));
        }
    }

    /// Title edited in place: reclassify the item and recount its panel.
    pub fn card_modified(
        &mut self,
        tree: &mut Tree,
        card: NodeId,
        title: &str,
        old_title: &str,
    ) -> Result<(), EngineError> {
        tree.remove_class(card, shape::COMMENT_CARD);
        self.check_section_change(tree, card, title, old_title)?;
        if !self.marker.is_section(title) && parser::is_comment(title) {
            tree.add_class(card, shape::COMMENT_CARD);
        }
        match tree.containing_panel(card) {
            Some(panel) => self.show_wip_limit(tree, panel),
            None => Ok(()),
        }
    }

    pub fn check_section_change(
        &mut self,
        tree: &mut Tree,
        card: NodeId,
        title: &str,
        old_title: &str,
    ) -> Result<(), EngineError> {
        match (self.marker.is_section(old_title), self.marker.is_section(title)) {
            (false, false) => Ok(()),
            (true, true) if tree.has_class(card, shape::SECTION_CARD) => {
                tree.set_attr(card, shape::ATTR_SECTION_TITLE, &self.marker.strip(title));
                self.rename_section(tree, card, old_title)
            }
            (_, true) => self.format_as_section(tree, card),
            (true, false) => {
                self.remove_section_formatting(tree, card);
                Ok(())
            }
        }
    }

    pub fn badges_modified(&mut self, tree: &mut Tree, card: NodeId) {
        let blocked = tree.is_blocked(card);
        self.set_blocked(tree, card, blocked);
    }

    pub(crate) fn set_blocked(&mut self, tree: &mut Tree, card: NodeId, blocked: bool) {
        tree.set_class(card, shape::BLOCKED_CARD, blocked);
        if let Some(title) = tree.find_first(card, shape::is_item_title) {
            tree.set_class(title, shape::BLOCKED_TITLE, blocked);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::engine::tests::{ready, LOCATION};
    use crate::events::DomainEvent;
    use crate::tree::fixture::{self, BoardBuilder};
    use crate::types::{ItemKind, WipStatus};

    #[test]
    fn test_kinds_after_setup() {
        let builder = BoardBuilder::new(LOCATION).panel("Todo", &["## Head", "a // b", "plain"]);
        let (tree, engine, _) = ready(builder, Settings::default());
        let items = tree.items_in_panel(tree.panels()[0]);
        assert!(tree.has_class(items[0], shape::SECTION_CARD));
        assert!(tree.has_class(items[1], shape::COMMENT_CARD));
        assert!(!tree.has_class(items[2], shape::COMMENT_CARD));
        let kinds: Vec<ItemKind> = engine.snapshot(&tree)[0].items.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![ItemKind::SectionHeader, ItemKind::Comment, ItemKind::Ordinary]
        );
    }

    #[test]
    fn test_plain_to_header_to_renamed_header() {
        let builder = BoardBuilder::new(LOCATION).panel("Doing [1]", &["task"]);
        let (mut tree, mut engine, _) = ready(builder, Settings::default());
        let panel = tree.panels()[0];
        let item = tree.items_in_panel(panel)[0];
        assert_eq!(engine.wip_status(&tree, panel).unwrap(), WipStatus::Reached);

        fixture::edit_item_title(&mut tree, item, "## Group").unwrap();
        let event = DomainEvent::CardModified {
            card: item,
            title: "## Group".to_string(),
            old_title: "task".to_string(),
        };
        engine.handle(&mut tree, &event).unwrap();
        assert!(tree.has_class(item, shape::SECTION_CARD));
        assert_eq!(tree.attr(panel, shape::ATTR_WIP_TITLE), Some("Doing 0 / 1"));

        fixture::edit_item_title(&mut tree, item, "## Renamed").unwrap();
        engine
            .card_modified(&mut tree, item, "## Renamed", "## Group")
            .unwrap();
        assert_eq!(tree.attr(item, shape::ATTR_SECTION_TITLE), Some("Renamed"));
    }

    #[test]
    fn test_comment_marker_anywhere() {
        let builder = BoardBuilder::new(LOCATION).panel("Todo", &["task"]);
        let (mut tree, mut engine, _) = ready(builder, Settings::default());
        let item = tree.items_in_panel(tree.panels()[0])[0];

        fixture::edit_item_title(&mut tree, item, "task // later").unwrap();
        engine
            .card_modified(&mut tree, item, "task // later", "task")
            .unwrap();
        assert!(tree.has_class(item, shape::COMMENT_CARD));

        fixture::edit_item_title(&mut tree, item, "task").unwrap();
        engine
            .card_modified(&mut tree, item, "task", "task // later")
            .unwrap();
        assert!(!tree.has_class(item, shape::COMMENT_CARD));
    }

    #[test]
    fn test_blocked_badge_toggles_flag() {
        let builder = BoardBuilder::new(LOCATION).panel("Todo", &["task"]);
        let (mut tree, mut engine, _) = ready(builder, Settings::default());
        let item = tree.items_in_panel(tree.panels()[0])[0];

        let badge = fixture::add_badge(&mut tree, item, "Status: Blocked").unwrap();
        engine
            .handle(&mut tree, &DomainEvent::BadgesModified(item))
            .unwrap();
        assert!(tree.has_class(item, shape::BLOCKED_CARD));
        assert_eq!(engine.item_kind(&tree, item), ItemKind::Blocked);

        let row = tree.parent(badge).unwrap();
        tree.remove_child(row, badge).unwrap();
        engine.badges_modified(&mut tree, item);
        assert!(!tree.has_class(item, shape::BLOCKED_CARD));
    }
}
