/// SuperPanels: adjacent panels sharing a dotted prefix shown as one.
use crate::parser;
use crate::storage::SettingKey;
use crate::tree::shape;
use crate::tree::{NodeId, Tree};
use crate::types::MergeRole;

use super::{EngineError, PanelStateEngine};

impl PanelStateEngine {
    /// Scan panels left to right and pair related neighbours. A pair consumes
    /// both panels, so `x.a x.b x.c` merges only the first two.
    pub fn combine_lists(&mut self, tree: &mut Tree) -> Result<(), EngineError> {
        if !self.settings.enable_combining_lists {
            return Ok(());
        }
        let panels = tree.panels();
        let names: Vec<Option<String>> = panels
            .iter()
            .map(|&p| match tree.panel_name(p) {
                Ok(name) => Some(name),
                Err(e) => {
                    log::warn!("[foldboard.engine.merge] Skipping panel: {}", e);
                    None
                }
            })
            .collect();

        let mut i = 0;
        while i < panels.len() {
            let related = match (names.get(i), names.get(i + 1)) {
                (Some(Some(left)), Some(Some(right))) => parser::are_related(left, right),
                _ => false,
            };
            if related {
                self.combine_with_next(tree, panels[i], panels[i + 1])?;
                i += 2;
                continue;
            }
            if names[i].is_some() {
                self.remove_sub_list_props(tree, panels[i])?;
            }
            i += 1;
        }
        Ok(())
    }

    /// Mark `left` and `right` as the two halves of one SuperPanel.
    pub fn combine_with_next(
        &mut self,
        tree: &mut Tree,
        left: NodeId,
        right: NodeId,
    ) -> Result<(), EngineError> {
        let left_wrapper = self.wrapper(tree, left)?;
        let right_wrapper = self.wrapper(tree, right)?;

        // A former left half loses its SuperPanel when it becomes a right half.
        if self.role(tree, right) == MergeRole::Left {
            self.remove_super_list(tree, right_wrapper);
        }
        for (panel, wrapper, role) in [
            (left, left_wrapper, MergeRole::Left),
            (right, right_wrapper, MergeRole::Right),
        ] {
            tree.add_class(panel, shape::SUB_LIST);
            if let Some(marker) = role.as_marker() {
                tree.set_attr(panel, shape::ATTR_SUB_LIST, marker);
            }
            self.add_folding_button(tree, panel);
            if tree.has_class(wrapper, shape::LIST_COLLAPSED) {
                self.set_panel_collapsed(tree, wrapper, false)?;
            }
        }

        self.add_super_list(tree, left)?;
        self.show_wip_limit(tree, left)?;
        self.show_wip_limit(tree, right)?;
        Ok(())
    }

    /// Decorate the left wrapper as the SuperPanel and restore its fold state.
    pub fn add_super_list(&mut self, tree: &mut Tree, left: NodeId) -> Result<(), EngineError> {
        let wrapper = self.wrapper(tree, left)?;
        tree.add_class(wrapper, shape::SUPER_LIST);
        let width = self.list_width() * 2 - 8;
        tree.set_attr(wrapper, shape::ATTR_SUPER_WIDTH, &width.to_string());

        if self.settings.remember_view_states {
            let key = self.panel_key(tree, left)?;
            if self.view_state.retrieve_flag(&key, SettingKey::SuperListCollapsed) {
                if let Some(right) = tree.next_panel(left) {
                    self.set_super_collapsed(tree, left, right, true)?;
                }
            }
        }
        self.update_super_list(tree, left)
    }

    /// Drop every SuperPanel decoration from a left wrapper, showing its members again.
    pub(crate) fn remove_super_list(&mut self, tree: &mut Tree, wrapper: NodeId) {
        if tree.has_class(wrapper, shape::SUPER_LIST_COLLAPSED) {
            if let Some(left) = tree.panel_of_wrapper(wrapper) {
                // Once the right half is gone the next panel belongs to nobody's SuperPanel.
                let right = tree
                    .next_panel(left)
                    .filter(|&r| self.role(tree, r) == MergeRole::Right);
                match right {
                    Some(right) => {
                        if let Err(e) = self.set_super_collapsed(tree, left, right, false) {
                            log::warn!("[foldboard.engine.merge] Failed to expand SuperPanel: {}", e);
                        }
                    }
                    None => {
                        tree.set_hidden(left, false);
                        tree.set_width(wrapper, self.list_width());
                    }
                }
            }
        }
        for class in [
            shape::SUPER_LIST,
            shape::SUPER_LIST_COLLAPSED,
            shape::SUPER_REACHED,
            shape::SUPER_EXCEEDED,
        ] {
            tree.remove_class(wrapper, class);
        }
        tree.remove_attr(wrapper, shape::ATTR_SUPER_TITLE);
        tree.remove_attr(wrapper, shape::ATTR_SUPER_WIDTH);
    }

    /// Make `panel` an ordinary panel again.
    pub fn remove_sub_list_props(&mut self, tree: &mut Tree, panel: NodeId) -> Result<(), EngineError> {
        if self.role(tree, panel) == MergeRole::Left {
            let wrapper = self.wrapper(tree, panel)?;
            self.remove_super_list(tree, wrapper);
        }
        tree.remove_class(panel, shape::SUB_LIST);
        tree.remove_attr(panel, shape::ATTR_SUB_LIST);
        self.add_folding_button(tree, panel);
        self.show_wip_limit(tree, panel)
    }

    /// Split a SuperPanel whose halves are no longer related. Returns `true`
    /// when the pair was split.
    pub fn split_lists(&mut self, tree: &mut Tree, panel: NodeId) -> Result<bool, EngineError> {
        let (left, right) = match self.role(tree, panel) {
            MergeRole::None => {
                log::warn!("[foldboard.engine.merge] Split requested for a panel that is not merged");
                return Ok(false);
            }
            MergeRole::Left => (Some(panel), tree.next_panel(panel)),
            MergeRole::Right => (tree.prev_panel(panel), Some(panel)),
        };
        let (Some(left), Some(right)) = (left, right) else {
            log::warn!("[foldboard.engine.merge] Merged panel has no partner");
            return Ok(false);
        };
        if !self.role(tree, left).is_merged() || !self.role(tree, right).is_merged() {
            log::warn!("[foldboard.engine.merge] Partner panel is not merged");
            return Ok(false);
        }
        if parser::are_related(&tree.panel_name(left)?, &tree.panel_name(right)?) {
            return Ok(false);
        }
        self.remove_sub_list_props(tree, left)?;
        self.remove_sub_list_props(tree, right)?;
        Ok(true)
    }

    pub fn list_title_modified(&mut self, tree: &mut Tree, panel: NodeId) -> Result<(), EngineError> {
        if !self.settings.enable_combining_lists {
            return self.show_wip_limit(tree, panel);
        }
        if self.role(tree, panel).is_merged() && self.split_lists(tree, panel)? {
            log::debug!("[foldboard.engine.merge] SuperPanel split after title edit");
        }
        // The new name may pair the panel with either neighbour.
        self.combine_lists(tree)
    }

    /// A merged panel leaves its SuperPanel as soon as it is picked up.
    pub fn list_dragged(&mut self, tree: &mut Tree, helper: Option<NodeId>) -> Result<(), EngineError> {
        let Some(helper) = helper else {
            log::debug!("[foldboard.engine.merge] Drag without a helper");
            return Ok(());
        };
        let panel = self.resolve_panel(tree, helper)?;
        let partner = match self.role(tree, panel) {
            MergeRole::None => return Ok(()),
            MergeRole::Left => tree.next_panel(panel),
            MergeRole::Right => tree.prev_panel(panel),
        };
        let partner = partner.filter(|&p| self.role(tree, p).is_merged());
        // The left half goes first so its SuperPanel still sees the right half.
        match (self.role(tree, panel), partner) {
            (MergeRole::Left, Some(right)) => {
                self.remove_sub_list_props(tree, panel)?;
                self.remove_sub_list_props(tree, right)
            }
            (_, Some(left)) => {
                self.remove_sub_list_props(tree, left)?;
                self.remove_sub_list_props(tree, panel)
            }
            (_, None) => self.remove_sub_list_props(tree, panel),
        }
    }
}
