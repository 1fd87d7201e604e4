/// WIP counting, display titles and limit bars.
use crate::parser::{self, COMMENT_MARKER};
use crate::tree::shape;
use crate::tree::{NodeId, PanelFilter, Tree};
use crate::types::{wip_status, MergeRole, WipStatus, WipTitle};

use super::{EngineError, PanelStateEngine};

fn set_bars(tree: &mut Tree, node: NodeId, reached: &str, exceeded: &str, status: WipStatus) {
    tree.set_class(node, reached, status == WipStatus::Reached);
    tree.set_class(node, exceeded, status == WipStatus::Exceeded);
}

impl PanelStateEngine {
    /// Items that represent work: section headers and comments are not counted.
    pub fn count_work_items(&self, tree: &Tree, panel: NodeId) -> usize {
        tree.count_items(panel, &[self.marker.identifier(), COMMENT_MARKER])
    }

    /// Title shown in the panel header. Merged panels show their own count only,
    /// the limit belongs to the SuperPanel.
    pub fn wip_title(&self, tree: &Tree, panel: NodeId) -> Result<WipTitle, EngineError> {
        let name = tree.panel_name(panel)?;
        let merged = self.role(tree, panel).is_merged();
        Ok(WipTitle {
            title: parser::display_title(&name, merged),
            count: self.count_work_items(tree, panel),
            limit: if merged {
                None
            } else {
                parser::extract_wip_limit(&name)
            },
            always_count: self.settings.always_count,
        })
    }

    fn bar_status(&self, count: usize, limit: Option<u32>) -> WipStatus {
        if self.settings.enable_top_bars {
            wip_status(count, limit)
        } else {
            WipStatus::Neutral
        }
    }

    /// Recompute the WIP title and bars of one panel, and of its SuperPanel.
    pub fn show_wip_limit(&mut self, tree: &mut Tree, panel: NodeId) -> Result<(), EngineError> {
        let title = self.wip_title(tree, panel)?;
        let role = self.role(tree, panel);
        self.remove_wip_limit(tree, panel);

        if role.is_merged() {
            self.add_wip_limit(tree, panel, &title);
            self.update_wip_bars(tree, panel, title.count, None);
            let left = match role {
                MergeRole::Left => Some(panel),
                _ => tree.prev_panel(panel),
            };
            match left {
                Some(left) => self.update_super_list(tree, left)?,
                None => log::warn!(
                    "[foldboard.engine.wip] Right half {:?} has no left partner",
                    title.title
                ),
            }
        } else if title.limit.is_some() || self.settings.always_count {
            self.add_wip_limit(tree, panel, &title);
            self.update_wip_bars(tree, panel, title.count, title.limit);
        } else {
            self.set_collapsed_title(tree, panel, &title.title);
            self.update_wip_bars(tree, panel, title.count, None);
        }
        Ok(())
    }

    pub(crate) fn add_wip_limit(&self, tree: &mut Tree, panel: NodeId, title: &WipTitle) {
        let text = title.to_string();
        tree.set_attr(panel, shape::ATTR_WIP_TITLE, &text);
        self.set_collapsed_title(tree, panel, &text);
    }

    pub(crate) fn remove_wip_limit(&self, tree: &mut Tree, panel: NodeId) {
        tree.remove_attr(panel, shape::ATTR_WIP_TITLE);
    }

    fn set_collapsed_title(&self, tree: &mut Tree, panel: NodeId, text: &str) {
        if let Some(wrapper) = tree.wrapper_of(panel) {
            tree.set_attr(wrapper, shape::ATTR_COLLAPSED_TITLE, text);
        }
    }

    /// Bars mirror onto the collapsed representation in the wrapper.
    pub(crate) fn update_wip_bars(
        &self,
        tree: &mut Tree,
        panel: NodeId,
        count: usize,
        limit: Option<u32>,
    ) {
        let status = self.bar_status(count, limit);
        set_bars(tree, panel, shape::WIP_REACHED, shape::WIP_EXCEEDED, status);
        if let Some(wrapper) = tree.wrapper_of(panel) {
            set_bars(
                tree,
                wrapper,
                shape::COLLAPSED_REACHED,
                shape::COLLAPSED_EXCEEDED,
                status,
            );
        }
    }

    /// Aggregate title and bars of the SuperPanel whose left half is `left`.
    /// The limit is read from the left panel's name.
    pub fn update_super_list(&mut self, tree: &mut Tree, left: NodeId) -> Result<(), EngineError> {
        if self.role(tree, left) != MergeRole::Left {
            return Ok(());
        }
        let Some(right) = tree
            .next_panel(left)
            .filter(|&r| self.role(tree, r) == MergeRole::Right)
        else {
            log::warn!("[foldboard.engine.wip] Left half has no right partner");
            return Ok(());
        };
        let wrapper = self.wrapper(tree, left)?;
        let name = tree.panel_name(left)?;
        let title = WipTitle {
            title: parser::merge_group(&name).unwrap_or(&name).to_string(),
            count: self.count_work_items(tree, left) + self.count_work_items(tree, right),
            limit: parser::extract_wip_limit(&name),
            always_count: self.settings.always_count,
        };
        tree.set_attr(wrapper, shape::ATTR_SUPER_TITLE, &title.to_string());
        let status = self.bar_status(title.count, title.limit);
        set_bars(tree, wrapper, shape::SUPER_REACHED, shape::SUPER_EXCEEDED, status);
        Ok(())
    }

    /// Every panel when counting always, otherwise the `[N]` annotated ones.
    pub fn add_wip_limits(&mut self, tree: &mut Tree) {
        let panels = if self.settings.always_count {
            tree.panels()
        } else {
            tree.panels_matching(&PanelFilter::pattern(parser::wip_annotation_pattern()))
        };
        for panel in panels {
            if let Err(e) = self.show_wip_limit(tree, panel) {
                log::warn!("[foldboard.engine.wip] Skipping panel: {}", e);
            }
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

    #[test]
    fn test_limit_reached_then_exceeded() {
        let builder = BoardBuilder::new(LOCATION).panel("Doing [3]", &["a", "b", "c"]);
        let (mut tree, mut engine, _) = ready(builder, Settings::default());
        let panel = tree.panels()[0];
        assert_eq!(engine.wip_status(&tree, panel).unwrap(), WipStatus::Reached);
        assert!(tree.has_class(panel, shape::WIP_REACHED));
        assert_eq!(tree.attr(panel, shape::ATTR_WIP_TITLE), Some("Doing 3 / 3"));

        fixture::add_item(&mut tree, panel, "d").unwrap();
        engine
            .handle(&mut tree, &DomainEvent::ListModified(panel))
            .unwrap();
        assert_eq!(engine.wip_status(&tree, panel).unwrap(), WipStatus::Exceeded);
        assert!(tree.has_class(panel, shape::WIP_EXCEEDED));
        assert!(!tree.has_class(panel, shape::WIP_REACHED));
        let wrapper = tree.wrapper_of(panel).unwrap();
        assert!(tree.has_class(wrapper, shape::COLLAPSED_EXCEEDED));
    }

    #[test]
    fn test_section_headers_and_comments_are_not_work() {
        let builder = BoardBuilder::new(LOCATION).panel("Doing [3]", &["a", "b", "c"]);
        let (mut tree, mut engine, _) = ready(builder, Settings::default());
        let panel = tree.panels()[0];

        fixture::add_item(&mut tree, panel, "## Next up").unwrap();
        fixture::add_item(&mut tree, panel, "remember // later").unwrap();
        engine
            .handle(&mut tree, &DomainEvent::ListModified(panel))
            .unwrap();
        assert_eq!(engine.count_work_items(&tree, panel), 3);
        assert_eq!(engine.wip_status(&tree, panel).unwrap(), WipStatus::Reached);
    }

    #[test]
    fn test_bars_follow_setting() {
        let settings = Settings {
            enable_top_bars: false,
            ..Settings::default()
        };
        let builder = BoardBuilder::new(LOCATION).panel("Doing [1]", &["a", "b"]);
        let (tree, engine, _) = ready(builder, settings);
        let panel = tree.panels()[0];
        assert_eq!(engine.wip_status(&tree, panel).unwrap(), WipStatus::Exceeded);
        assert!(!tree.has_class(panel, shape::WIP_EXCEEDED));
        assert_eq!(tree.attr(panel, shape::ATTR_WIP_TITLE), Some("Doing 2 / 1"));
    }

    #[test]
    fn test_always_count_titles_every_panel() {
        let builder = BoardBuilder::new(LOCATION)
            .panel("Backlog", &["a", "b"])
            .panel("Done", &[]);
        let (tree, _, _) = ready(builder.clone(), Settings::default());
        assert_eq!(tree.attr(tree.panels()[0], shape::ATTR_WIP_TITLE), None);

        let settings = Settings {
            always_count: true,
            ..Settings::default()
        };
        let (tree, _, _) = ready(builder, settings);
        let panels = tree.panels();
        assert_eq!(tree.attr(panels[0], shape::ATTR_WIP_TITLE), Some("Backlog 2"));
        assert_eq!(tree.attr(panels[1], shape::ATTR_WIP_TITLE), Some("Done 0"));
    }

    #[test]
    fn test_limit_removed_clears_bars() {
        let builder = BoardBuilder::new(LOCATION).panel("Doing [1]", &["a", "b"]);
        let (mut tree, mut engine, _) = ready(builder, Settings::default());
        let panel = tree.panels()[0];
        assert!(tree.has_class(panel, shape::WIP_EXCEEDED));

        fixture::rename_panel(&mut tree, panel, "Doing").unwrap();
        engine
            .handle(
                &mut tree,
                &DomainEvent::ListTitleModified {
                    list: panel,
                    title: "Doing".to_string(),
                },
            )
            .unwrap();
        assert!(!tree.has_class(panel, shape::WIP_EXCEEDED));
        assert_eq!(tree.attr(panel, shape::ATTR_WIP_TITLE), None);
        let wrapper = tree.wrapper_of(panel).unwrap();
        assert_eq!(tree.attr(wrapper, shape::ATTR_COLLAPSED_TITLE), Some("Doing"));
    }
}
