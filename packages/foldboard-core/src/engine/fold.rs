/// Folding of panels and SuperPanels, and the board-wide compact mode.
use serde_json::Value;

use crate::config::COLLAPSED_LIST_WIDTH;
use crate::parser;
use crate::storage::SettingKey;
use crate::tree::shape;
use crate::tree::{NodeId, Tree, TreeError};
use crate::types::{FoldState, MergeRole};

use super::{EngineError, PanelStateEngine};

impl PanelStateEngine {
    /// Merged panels fold with their SuperPanel and carry no button of their own.
    pub fn add_folding_button(&self, tree: &mut Tree, panel: NodeId) {
        let merged = self.role(tree, panel).is_merged();
        tree.set_class(panel, shape::FOLD_BUTTON, !merged);
    }

    pub fn make_lists_foldable(&mut self, tree: &mut Tree) {
        for wrapper in tree.panel_wrappers() {
            if let Some(panel) = tree.panel_of_wrapper(wrapper) {
                self.add_folding_button(tree, panel);
            }
            if let Err(e) = self.add_collapsed_list(tree, wrapper) {
                log::warn!("[foldboard.engine.fold] Skipping panel: {}", e);
            }
        }
    }

    /// Give the wrapper its collapsed label and restore a remembered fold.
    pub fn add_collapsed_list(&mut self, tree: &mut Tree, wrapper: NodeId) -> Result<(), EngineError> {
        if tree.has_class(wrapper, shape::ADD_PANEL) {
            return Ok(());
        }
        let panel = tree.panel_of_wrapper(wrapper).ok_or_else(|| {
            TreeError::NotFound(format!("panel in wrapper {}", wrapper.index()))
        })?;
        let name = tree.panel_name(panel)?;
        let merged = self.role(tree, panel).is_merged();
        if tree.attr(wrapper, shape::ATTR_COLLAPSED_TITLE).is_none() {
            tree.set_attr(
                wrapper,
                shape::ATTR_COLLAPSED_TITLE,
                &parser::display_title(&name, merged),
            );
        }
        if self.settings.remember_view_states && !merged {
            let key = self.panel_key(tree, panel)?;
            if self.view_state.retrieve_flag(&key, SettingKey::Collapsed) {
                self.set_panel_collapsed(tree, wrapper, true)?;
            }
        }
        Ok(())
    }

    /// Visual fold of one panel, nothing is stored.
    pub(crate) fn set_panel_collapsed(
        &mut self,
        tree: &mut Tree,
        wrapper: NodeId,
        collapsed: bool,
    ) -> Result<(), EngineError> {
        let panel = tree.panel_of_wrapper(wrapper).ok_or_else(|| {
            TreeError::NotFound(format!("panel in wrapper {}", wrapper.index()))
        })?;
        tree.set_class(wrapper, shape::LIST_COLLAPSED, collapsed);
        tree.set_hidden(panel, collapsed);
        let width = if collapsed {
            COLLAPSED_LIST_WIDTH
        } else {
            self.list_width()
        };
        tree.set_width(wrapper, width);
        Ok(())
    }

    pub fn collapse_panel(&mut self, tree: &mut Tree, node: NodeId) -> Result<(), EngineError> {
        self.fold_panel(tree, node, true)
    }

    pub fn expand_panel(&mut self, tree: &mut Tree, node: NodeId) -> Result<(), EngineError> {
        self.fold_panel(tree, node, false)
    }

    pub fn toggle_panel(&mut self, tree: &mut Tree, node: NodeId) -> Result<FoldState, EngineError> {
        let panel = self.resolve_panel(tree, node)?;
        if self.is_folded(tree, panel) {
            self.fold_panel(tree, panel, false)?;
            Ok(FoldState::Expanded)
        } else {
            self.fold_panel(tree, panel, true)?;
            Ok(FoldState::Collapsed)
        }
    }

    fn fold_panel(&mut self, tree: &mut Tree, node: NodeId, collapsed: bool) -> Result<(), EngineError> {
        let panel = self.resolve_panel(tree, node)?;
        let key = self.panel_key(tree, panel)?;
        if self.role(tree, panel).is_merged() {
            return Err(EngineError::NotFoldable(key));
        }
        let wrapper = self.wrapper(tree, panel)?;
        self.set_panel_collapsed(tree, wrapper, collapsed)?;
        if collapsed {
            let title = self.wip_title(tree, panel)?;
            tree.set_attr(wrapper, shape::ATTR_COLLAPSED_TITLE, &title.to_string());
        }
        log::debug!(
            "[foldboard.engine.fold] Panel {:?} {}",
            key,
            if collapsed { "collapsed" } else { "expanded" }
        );
        self.persist(&key, SettingKey::Collapsed, Value::Bool(collapsed));
        Ok(())
    }

    /// Visual fold of a SuperPanel: both halves and the right wrapper are
    /// hidden, the left wrapper shows the collapsed label.
    pub(crate) fn set_super_collapsed(
        &mut self,
        tree: &mut Tree,
        left: NodeId,
        right: NodeId,
        collapsed: bool,
    ) -> Result<(), EngineError> {
        let left_wrapper = self.wrapper(tree, left)?;
        let right_wrapper = self.wrapper(tree, right)?;
        tree.set_class(left_wrapper, shape::SUPER_LIST_COLLAPSED, collapsed);
        tree.set_hidden(left, collapsed);
        tree.set_hidden(right, collapsed);
        tree.set_hidden(right_wrapper, collapsed);
        let width = if collapsed {
            COLLAPSED_LIST_WIDTH
        } else {
            self.list_width()
        };
        tree.set_width(left_wrapper, width);
        Ok(())
    }

    /// Left and right half of the SuperPanel `node` belongs to.
    fn super_pair(&self, tree: &Tree, node: NodeId) -> Result<(NodeId, NodeId), EngineError> {
        let panel = self.resolve_panel(tree, node)?;
        let (left, right) = match self.role(tree, panel) {
            MergeRole::None => return Err(EngineError::NotMerged(tree.panel_name(panel)?)),
            MergeRole::Left => (Some(panel), tree.next_panel(panel)),
            MergeRole::Right => (tree.prev_panel(panel), Some(panel)),
        };
        match (left, right) {
            (Some(left), Some(right)) => Ok((left, right)),
            _ => Err(EngineError::NotMerged(tree.panel_name(panel)?)),
        }
    }

    /// Fold state is stored under the left half's name.
    pub fn collapse_super_list(&mut self, tree: &mut Tree, node: NodeId) -> Result<(), EngineError> {
        let (left, right) = self.super_pair(tree, node)?;
        self.set_super_collapsed(tree, left, right, true)?;
        let key = self.panel_key(tree, left)?;
        self.persist(&key, SettingKey::SuperListCollapsed, Value::Bool(true));
        Ok(())
    }

    pub fn expand_super_list(&mut self, tree: &mut Tree, node: NodeId) -> Result<(), EngineError> {
        let (left, right) = self.super_pair(tree, node)?;
        self.set_super_collapsed(tree, left, right, false)?;
        let key = self.panel_key(tree, left)?;
        self.persist(&key, SettingKey::SuperListCollapsed, Value::Bool(false));
        self.update_super_list(tree, left)
    }

    /// A new panel from the host: format its items, then fit it into the board.
    pub fn list_added(&mut self, tree: &mut Tree, wrapper: NodeId) -> Result<(), EngineError> {
        let panel = self.resolve_panel(tree, wrapper)?;
        for item in tree.items_in_panel(panel) {
            self.format_card(tree, item);
        }
        self.add_folding_button(tree, panel);
        self.add_collapsed_list(tree, wrapper)?;
        self.show_wip_limit(tree, panel)?;
        self.combine_lists(tree)?;
        let width = self.list_width();
        if !tree.has_class(wrapper, shape::LIST_COLLAPSED) {
            tree.set_width(wrapper, width);
        }
        Ok(())
    }

    /// Switch compact mode and remember it for the board.
    pub fn set_compact_mode(&mut self, tree: &mut Tree, enabled: bool) {
        self.apply_compact_mode(tree, enabled);
        if let Err(e) = self
            .view_state
            .store_global(SettingKey::CompactMode, Value::Bool(enabled))
        {
            log::error!("[foldboard.engine.persist] Failed to store compact mode: {}", e);
        }
    }

    pub fn toggle_compact_mode(&mut self, tree: &mut Tree) -> bool {
        let enabled = !self.compact_mode;
        self.set_compact_mode(tree, enabled);
        enabled
    }

    /// Resize every expanded panel and SuperPanel for the current mode.
    pub fn apply_compact_mode(&mut self, tree: &mut Tree, enabled: bool) {
        self.compact_mode = enabled;
        if let Some(container) = tree.panel_container() {
            tree.set_attr(
                container,
                shape::ATTR_COMPACT_MODE,
                if enabled { "true" } else { "false" },
            );
        }
        let width = self.list_width();
        for wrapper in tree.panel_wrappers() {
            let super_collapsed = tree.has_class(wrapper, shape::SUPER_LIST_COLLAPSED);
            if !tree.has_class(wrapper, shape::LIST_COLLAPSED) && !super_collapsed {
                tree.set_width(wrapper, width);
            }
            if tree.has_class(wrapper, shape::SUPER_LIST) && !super_collapsed {
                tree.set_attr(wrapper, shape::ATTR_SUPER_WIDTH, &(width * 2 - 8).to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Settings, DEFAULT_LIST_WIDTH};
    use crate::engine::tests::{engine_with, ready, LOCATION};
    use crate::events::DomainEvent;
    use crate::storage::MemoryStore;
    use crate::tree::fixture::{self, BoardBuilder};
    use serde_json::json;

    #[test]
    fn test_collapse_and_expand_panel() {
        let builder = BoardBuilder::new(LOCATION).panel("Doing [2]", &["a"]);
        let (mut tree, mut engine, store) = ready(builder, Settings::default());
        let panel = tree.panels()[0];
        let wrapper = tree.wrapper_of(panel).unwrap();

        engine.collapse_panel(&mut tree, panel).unwrap();
        assert!(tree.has_class(wrapper, shape::LIST_COLLAPSED));
        assert!(tree.is_hidden(panel));
        assert_eq!(tree.width(wrapper), Some(COLLAPSED_LIST_WIDTH));
        assert_eq!(tree.attr(wrapper, shape::ATTR_COLLAPSED_TITLE), Some("Doing 1 / 2"));
        assert_eq!(store.value("b1"), Some(json!({"Doing [2]": {"collapsed": true}})));

        assert_eq!(engine.toggle_panel(&mut tree, wrapper).unwrap(), FoldState::Expanded);
        assert!(!tree.is_hidden(panel));
        assert_eq!(tree.width(wrapper), Some(DEFAULT_LIST_WIDTH));
        assert_eq!(store.value("b1"), Some(json!({"Doing [2]": {"collapsed": false}})));
    }

    #[test]
    fn test_remembered_fold_is_restored() {
        let store = MemoryStore::new();
        store.insert("b1", json!({"Done": {"collapsed": true}}));
        let mut tree = BoardBuilder::new(LOCATION)
            .panel("Todo", &[])
            .panel("Done", &["x"])
            .build().unwrap();
        let mut engine = engine_with(Settings::default(), &store);
        engine.board_changed(&mut tree).unwrap();

        let panels = tree.panels();
        assert!(!engine.is_folded(&tree, panels[0]));
        assert!(engine.is_folded(&tree, panels[1]));
        assert_eq!(engine.snapshot(&tree)[1].fold, FoldState::Collapsed);
    }

    #[test]
    fn test_merged_panel_cannot_fold_alone() {
        let settings = Settings {
            enable_combining_lists: true,
            ..Settings::default()
        };
        let builder = BoardBuilder::new(LOCATION).panel("x.a", &[]).panel("x.b", &[]);
        let (mut tree, mut engine, _) = ready(builder, settings);
        let right = tree.panels()[1];
        assert!(matches!(
            engine.collapse_panel(&mut tree, right),
            Err(EngineError::NotFoldable(name)) if name == "x.b"
        ));
    }

    #[test]
    fn test_super_list_fold_from_either_half() {
        let settings = Settings {
            enable_combining_lists: true,
            ..Settings::default()
        };
        let builder = BoardBuilder::new(LOCATION)
            .panel("x.a", &[])
            .panel("x.b", &[])
            .panel("Done", &[]);
        let (mut tree, mut engine, store) = ready(builder, settings);
        let panels = tree.panels();
        let wrappers = tree.panel_wrappers();

        engine.collapse_super_list(&mut tree, panels[1]).unwrap();
        assert!(tree.has_class(wrappers[0], shape::SUPER_LIST_COLLAPSED));
        assert!(tree.is_hidden(panels[0]) && tree.is_hidden(panels[1]));
        assert!(tree.is_hidden(wrappers[1]));
        assert!(engine.is_folded(&tree, panels[1]));
        assert!(!engine.is_folded(&tree, panels[2]));
        assert_eq!(
            store.value("b1"),
            Some(json!({"x.a": {"super-list-collapsed": true}}))
        );

        engine.expand_super_list(&mut tree, panels[0]).unwrap();
        assert!(!tree.is_hidden(wrappers[1]));
        assert!(!engine.is_folded(&tree, panels[0]));

        assert!(matches!(
            engine.collapse_super_list(&mut tree, panels[2]),
            Err(EngineError::NotMerged(_))
        ));
    }

    #[test]
    fn test_compact_mode_resizes_and_persists() {
        let builder = BoardBuilder::new(LOCATION).panel("Todo", &[]).panel("Done", &[]);
        let (mut tree, mut engine, store) = ready(builder, Settings::default());
        let wrappers = tree.panel_wrappers();
        engine.collapse_panel(&mut tree, wrappers[1]).unwrap();

        assert!(engine.toggle_compact_mode(&mut tree));
        assert_eq!(tree.width(wrappers[0]), Some(200));
        assert_eq!(tree.width(wrappers[1]), Some(COLLAPSED_LIST_WIDTH));
        let container = tree.panel_container().unwrap();
        assert_eq!(tree.attr(container, shape::ATTR_COMPACT_MODE), Some("true"));
        assert_eq!(
            store.value("b1").unwrap()["trello-folds-board-settings"],
            json!({"compactMode": true})
        );

        // Restored on the next setup without another write.
        let mut other = BoardBuilder::new(LOCATION)
            .panel("Todo", &[])
            .build()
            .unwrap();
        let mut engine = engine_with(Settings::default(), &store);
        engine.board_changed(&mut other).unwrap();
        assert!(engine.compact_mode());
        assert_eq!(other.width(other.panel_wrappers()[0]), Some(200));
    }

    #[test]
    fn test_added_panel_is_formatted() {
        let builder = BoardBuilder::new(LOCATION).panel("Todo", &[]);
        let (mut tree, mut engine, _) = ready(builder, Settings::default());
        let wrapper = fixture::add_panel(&mut tree, "Review [1]", &["## Part", "a", "b"], None).unwrap();
        engine.handle(&mut tree, &DomainEvent::ListAdded(wrapper)).unwrap();

        let panel = tree.panel_of_wrapper(wrapper).unwrap();
        assert!(tree.has_class(panel, shape::FOLD_BUTTON));
        assert!(tree.has_class(panel, shape::WIP_EXCEEDED));
        let header = tree.items_in_panel(panel)[0];
        assert!(tree.has_class(header, shape::SECTION_CARD));
        assert_eq!(tree.width(wrapper), Some(DEFAULT_LIST_WIDTH));
    }
}
