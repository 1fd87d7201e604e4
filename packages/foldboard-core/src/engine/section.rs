/// Collapsible sections inside a panel.
///
/// A section starts at a header item (title contains the marker) and runs to
/// the next header or the card composer. Collapsed states are stored per
/// panel under `sections`, keyed by the header title with the marker removed.
use serde_json::{Map, Value};

use crate::storage::SettingKey;
use crate::tree::shape;
use crate::tree::{NodeId, Tree, TreeError};

use super::{EngineError, FrameTask, PanelStateEngine};

fn title_span(tree: &Tree, item: NodeId) -> Option<NodeId> {
    tree.find_first(item, shape::is_item_title)
}

impl PanelStateEngine {
    /// Render `item` as a section header. Already formatted headers are left alone.
    pub fn format_as_section(&mut self, tree: &mut Tree, item: NodeId) -> Result<(), EngineError> {
        if tree.has_class(item, shape::SECTION_CARD) {
            return Ok(());
        }
        let title = tree
            .item_title(item)
            .ok_or_else(|| TreeError::NotFound(format!("title of item {}", item.index())))?;
        tree.add_class(item, shape::SECTION_CARD);
        tree.set_attr(item, shape::ATTR_SECTION_TITLE, &self.marker.strip(&title));
        tree.set_attr(item, shape::ATTR_SECTION_STATE, shape::SECTION_EXPANDED);
        if let Some(span) = title_span(tree, item) {
            tree.set_hidden(span, true);
        }
        Ok(())
    }

    /// Back to an ordinary item. A collapsed body is shown again.
    pub fn remove_section_formatting(&mut self, tree: &mut Tree, item: NodeId) {
        if self.is_section_collapsed(tree, item) {
            for body in self.section_body(tree, item) {
                tree.set_hidden(body, false);
            }
        }
        tree.remove_class(item, shape::SECTION_CARD);
        tree.remove_attr(item, shape::ATTR_SECTION_TITLE);
        tree.remove_attr(item, shape::ATTR_SECTION_STATE);
        if let Some(span) = title_span(tree, item) {
            tree.set_hidden(span, false);
        }
    }

    /// Items after `header` up to the next header or the card composer.
    pub fn section_body(&self, tree: &Tree, header: NodeId) -> Vec<NodeId> {
        let mut body = Vec::new();
        let mut next = tree.next_sibling(header);
        while let Some(node) = next {
            if shape::is_card_composer(tree, node) {
                break;
            }
            if shape::is_item(tree, node) && !shape::is_placeholder_item(tree, node) {
                let title = tree.item_title(node).unwrap_or_default();
                if self.marker.is_section(&title) {
                    break;
                }
                body.push(node);
            }
            next = tree.next_sibling(node);
        }
        body
    }

    pub fn is_section_collapsed(&self, tree: &Tree, header: NodeId) -> bool {
        tree.attr(header, shape::ATTR_SECTION_STATE) == Some(shape::SECTION_COLLAPSED)
    }

    /// Show or hide the body of a section without storing anything.
    pub(crate) fn set_section_state(
        &mut self,
        tree: &mut Tree,
        header: NodeId,
        collapsed: bool,
    ) -> Result<(), EngineError> {
        self.format_as_section(tree, header)?;
        let state = if collapsed {
            shape::SECTION_COLLAPSED
        } else {
            shape::SECTION_EXPANDED
        };
        tree.set_attr(header, shape::ATTR_SECTION_STATE, state);
        for item in self.section_body(tree, header) {
            tree.set_hidden(item, collapsed);
        }
        Ok(())
    }

    /// Flip a section and store its state. Returns `true` when now collapsed.
    pub fn toggle_section(&mut self, tree: &mut Tree, node: NodeId) -> Result<bool, EngineError> {
        let header = tree
            .closest(node, shape::is_item)
            .ok_or_else(|| TreeError::NotFound(format!("item for node {}", node.index())))?;
        let title = tree.item_title(header).unwrap_or_default();
        if !self.marker.is_section(&title) {
            return Err(TreeError::Malformed(format!("{:?} is not a section header", title)).into());
        }
        let collapsed = !self.is_section_collapsed(tree, header);
        self.set_section_state(tree, header, collapsed)?;

        let panel = self.resolve_panel(tree, header)?;
        let key = self.panel_key(tree, panel)?;
        let section = self
            .identity
            .section_key(tree, header, &self.marker)
            .ok_or_else(|| TreeError::NotFound(format!("section key of item {}", header.index())))?;
        let mut sections = self.stored_sections(&key).unwrap_or_default();
        sections.insert(section, Value::Bool(collapsed));
        self.persist(&key, SettingKey::Sections, Value::Object(sections));
        Ok(collapsed)
    }

    /// A header renamed to another header title takes its stored state along.
    pub(crate) fn rename_section(
        &mut self,
        tree: &Tree,
        header: NodeId,
        old_title: &str,
    ) -> Result<(), EngineError> {
        let old_section = self.marker.strip(old_title);
        let Some(section) = self.identity.section_key(tree, header, &self.marker) else {
            return Ok(());
        };
        if section == old_section {
            return Ok(());
        }
        let panel = self.resolve_panel(tree, header)?;
        let key = self.panel_key(tree, panel)?;
        let Some(mut sections) = self.stored_sections(&key) else {
            return Ok(());
        };
        let Some(state) = sections.remove(&old_section) else {
            return Ok(());
        };
        log::debug!(
            "[foldboard.engine.section] Moving state of {:?} to {:?}",
            old_section,
            section
        );
        sections.insert(section, state);
        self.persist(&key, SettingKey::Sections, Value::Object(sections));
        Ok(())
    }

    fn stored_sections(&self, key: &str) -> Option<Map<String, Value>> {
        self.view_state
            .retrieve(key, SettingKey::Sections)
            .and_then(Value::as_object)
            .cloned()
    }

    /// Queue a collapse for every header stored as collapsed.
    pub fn restore_sections_view_state(&mut self, tree: &Tree) {
        for panel in tree.panels() {
            let key = match self.panel_key(tree, panel) {
                Ok(key) => key,
                Err(e) => {
                    log::warn!("[foldboard.engine.section] Skipping panel: {}", e);
                    continue;
                }
            };
            let Some(states) = self.stored_sections(&key) else {
                continue;
            };
            for item in tree.items_in_panel(panel) {
                let title = tree.item_title(item).unwrap_or_default();
                if !self.marker.is_section(&title) {
                    continue;
                }
                let Some(section) = self.identity.section_key(tree, item, &self.marker) else {
                    continue;
                };
                if states.get(&section) == Some(&Value::Bool(true)) {
                    self.defer(FrameTask::RestoreSection(item));
                }
            }
        }
    }

    pub(crate) fn restore_section(&mut self, tree: &mut Tree, item: NodeId) -> Result<(), EngineError> {
        self.set_section_state(tree, item, true)
    }
}
