/// Text-identity lookups over the board document.
///
/// The host offers no stable ids for panels or items, so everything here is
/// keyed by displayed text. `IdentityScheme` is the seam where a stable id
/// source would plug in.
use regex::Regex;
use std::collections::BTreeMap;

use super::shape;
use super::{NodeId, Tree, TreeError};
use crate::parser::{self, SectionMarker};

/// `true` if `text` contains any of the `needles`.
pub fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

/// How panels are selected by name.
#[derive(Debug, Clone, Default)]
pub enum NameMatch {
    /// Every panel.
    #[default]
    Any,
    Substring(String),
    Pattern(Regex),
}

#[derive(Debug, Clone, Default)]
pub struct PanelFilter {
    pub name: NameMatch,
    /// Panels whose name contains any of these are dropped.
    pub exclude: Vec<String>,
}

impl PanelFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn containing(name: &str) -> Self {
        Self {
            name: NameMatch::Substring(name.to_string()),
            exclude: Vec::new(),
        }
    }

    pub fn pattern(re: Regex) -> Self {
        Self {
            name: NameMatch::Pattern(re),
            exclude: Vec::new(),
        }
    }

    pub fn excluding(mut self, names: &[&str]) -> Self {
        self.exclude.extend(names.iter().map(|n| n.to_string()));
        self
    }

    fn accepts(&self, name: &str) -> bool {
        let selected = match &self.name {
            NameMatch::Any => true,
            NameMatch::Substring(s) => name.contains(s.as_str()),
            NameMatch::Pattern(re) => re.is_match(name),
        };
        selected && !self.exclude.iter().any(|e| name.contains(e.as_str()))
    }
}

impl Tree {
    pub fn board_id(&self) -> Result<String, TreeError> {
        parser::board_id_from_location(self.location())
            .ok_or_else(|| TreeError::Malformed(format!("location {:?}", self.location())))
    }

    pub fn content_root(&self) -> Option<NodeId> {
        self.find_by_id(shape::CONTENT_ROOT_ID)
    }

    pub fn panel_container(&self) -> Option<NodeId> {
        self.find_by_id(shape::PANEL_CONTAINER_ID)
    }

    /// Wrappers of real panels in board order; the add-panel slot is skipped.
    pub fn panel_wrappers(&self) -> Vec<NodeId> {
        let Some(container) = self.panel_container() else {
            return Vec::new();
        };
        self.children(container)
            .iter()
            .copied()
            .filter(|&w| shape::is_panel_wrapper(self, w) && !self.has_class(w, shape::ADD_PANEL))
            .collect()
    }

    /// Panels in board order.
    pub fn panels(&self) -> Vec<NodeId> {
        self.panel_wrappers()
            .into_iter()
            .filter_map(|w| self.panel_of_wrapper(w))
            .collect()
    }

    pub fn panels_matching(&self, filter: &PanelFilter) -> Vec<NodeId> {
        self.panels()
            .into_iter()
            .filter(|&p| {
                let name = self.panel_name(p).unwrap_or_default();
                filter.accepts(&name)
            })
            .collect()
    }

    pub fn panel_of_wrapper(&self, wrapper: NodeId) -> Option<NodeId> {
        self.find_first(wrapper, shape::is_panel)
    }

    pub fn wrapper_of(&self, node: NodeId) -> Option<NodeId> {
        self.closest(node, shape::is_panel_wrapper)
    }

    pub fn containing_panel(&self, node: NodeId) -> Option<NodeId> {
        self.closest(node, shape::is_panel)
    }

    /// Name of the panel `node` is or contains.
    pub fn panel_name(&self, node: NodeId) -> Result<String, TreeError> {
        let titles = self.find_all(node, |t, n| {
            t.tag(n) == "h2" && shape::is_panel_title_assist(t, n)
        });
        match titles.as_slice() {
            [] => Err(TreeError::NotFound(format!(
                "panel title in node {}",
                node.index()
            ))),
            [title] => Ok(self.text_content(*title)),
            _ => Err(TreeError::Ambiguous(format!(
                "panel title in node {}",
                node.index()
            ))),
        }
    }

    /// Item title without the text of nested elements such as the short id.
    pub fn item_title(&self, item: NodeId) -> Option<String> {
        let span = self.find_first(item, shape::is_item_title)?;
        Some(self.own_text(span))
    }

    /// Items of a panel in order, drag placeholders excluded.
    pub fn items_in_panel(&self, panel: NodeId) -> Vec<NodeId> {
        self.find_all(panel, |t, n| {
            shape::is_item(t, n) && !shape::is_placeholder_item(t, n)
        })
    }

    pub fn all_items(&self) -> Vec<NodeId> {
        let root = self.panel_container().unwrap_or(self.document());
        self.find_all(root, |t, n| {
            shape::is_item(t, n) && !shape::is_placeholder_item(t, n)
        })
    }

    /// Items of `panel` whose title contains `name`.
    pub fn items_in_panel_containing(
        &self,
        panel: NodeId,
        name: &str,
    ) -> Result<Vec<NodeId>, TreeError> {
        if name.is_empty() {
            return Err(TreeError::Malformed("empty item name".to_string()));
        }
        Ok(self
            .items_in_panel(panel)
            .into_iter()
            .filter(|&i| self.item_title(i).is_some_and(|t| t.contains(name)))
            .collect())
    }

    /// Items across the board matched by title, exactly or as a substring.
    pub fn items_by_name(&self, name: &str, exact: bool) -> Vec<NodeId> {
        self.all_items()
            .into_iter()
            .filter(|&i| match self.item_title(i) {
                Some(title) if exact => title == name,
                Some(title) => title.contains(name),
                None => false,
            })
            .collect()
    }

    /// Previous panel on the board, stepping over a drag placeholder.
    pub fn prev_panel(&self, panel: NodeId) -> Option<NodeId> {
        let mut sibling = self.prev_sibling(self.wrapper_of(panel)?);
        while let Some(node) = sibling {
            if !shape::is_placeholder(self, node) {
                return self.panel_of_wrapper(node);
            }
            sibling = self.prev_sibling(node);
        }
        None
    }

    /// Next panel on the board, stepping over a drag placeholder.
    pub fn next_panel(&self, panel: NodeId) -> Option<NodeId> {
        let mut sibling = self.next_sibling(self.wrapper_of(panel)?);
        while let Some(node) = sibling {
            if !shape::is_placeholder(self, node) {
                return self.panel_of_wrapper(node);
            }
            sibling = self.next_sibling(node);
        }
        None
    }

    /// Items counted in `panel`, skipping titles that contain any of `exclude`.
    pub fn count_items(&self, panel: NodeId, exclude: &[&str]) -> usize {
        self.items_in_panel(panel)
            .into_iter()
            .filter(|&i| match self.item_title(i) {
                Some(title) => !contains_any(&title, exclude),
                None => true,
            })
            .count()
    }

    fn labels_below(&self, node: NodeId, exclude: &[&str]) -> Vec<String> {
        self.find_all(node, shape::is_card_label)
            .into_iter()
            .filter_map(|l| self.attr(l, "title"))
            .filter(|title| !contains_any(title, exclude))
            .map(str::to_string)
            .collect()
    }

    pub fn item_labels(&self, item: NodeId, exclude: &[&str]) -> Vec<String> {
        self.labels_below(item, exclude)
    }

    /// Label name to number of uses within `panel`.
    pub fn count_labels_in_panel(&self, panel: NodeId, exclude: &[&str]) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for label in self.labels_below(panel, exclude) {
            *counts.entry(label).or_insert(0) += 1;
        }
        counts
    }

    /// Label name to colour for every label shown on the board.
    pub fn label_colors(&self) -> BTreeMap<String, String> {
        let root = self.panel_container().unwrap_or(self.document());
        self.find_all(root, shape::is_card_label)
            .into_iter()
            .filter_map(|l| {
                let title = self.attr(l, "title")?;
                let color = self.attr(l, "data-color").unwrap_or_default();
                Some((title.to_string(), color.to_string()))
            })
            .collect()
    }

    /// Fields shown as badge text on an item.
    pub fn item_fields(&self, item: NodeId) -> BTreeMap<String, String> {
        self.find_all(item, shape::is_badge_text)
            .into_iter()
            .map(|b| parser::parse_badge_field(&self.text_content(b)))
            .collect()
    }

    pub fn is_blocked(&self, item: NodeId) -> bool {
        self.find_all(item, shape::is_badge_text)
            .into_iter()
            .any(|b| parser::is_blocked_badge(&self.text_content(b)))
    }
}

/// Maps panels and section headers to the keys their view state is stored under.
pub trait IdentityScheme {
    fn panel_key(&self, tree: &Tree, panel: NodeId) -> Result<String, TreeError>;

    fn section_key(&self, tree: &Tree, header: NodeId, marker: &SectionMarker) -> Option<String>;
}

/// Identity by displayed text: panel name, and header title with the marker stripped.
#[derive(Debug, Clone, Copy, Default)]
pub struct TitleIdentity;

impl IdentityScheme for TitleIdentity {
    fn panel_key(&self, tree: &Tree, panel: NodeId) -> Result<String, TreeError> {
        tree.panel_name(panel)
    }

    fn section_key(&self, tree: &Tree, header: NodeId, marker: &SectionMarker) -> Option<String> {
        tree.item_title(header).map(|t| marker.strip(&t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::fixture::{self, BoardBuilder};

    fn board() -> Tree {
        BoardBuilder::new("https://trello.com/b/abc123/my-board")
            .panel("Backlog", &["one", "## Later", "two // note"])
            .panel("Doing [3]", &["a", "b"])
            .panel("Done", &[])
            .build().unwrap()
    }

    #[test]
    fn test_board_id_and_panels() {
        let tree = board();
        assert_eq!(tree.board_id().unwrap(), "abc123");
        let panels = tree.panels();
        assert_eq!(panels.len(), 3);
        assert_eq!(tree.panel_name(panels[1]).unwrap(), "Doing [3]");
        assert_eq!(tree.next_panel(panels[0]), Some(panels[1]));
        assert_eq!(tree.prev_panel(panels[0]), None);
        assert_eq!(tree.next_panel(panels[2]), None);

        let bad = Tree::new("nowhere");
        assert!(matches!(bad.board_id(), Err(TreeError::Malformed(_))));
    }

    #[test]
    fn test_item_title_ignores_nested_elements() {
        let tree = board();
        let items = tree.items_in_panel(tree.panels()[0]);
        assert_eq!(items.len(), 3);
        assert_eq!(tree.item_title(items[1]).as_deref(), Some("## Later"));
        // The short id span carries text of its own.
        assert!(tree.text_content(items[1]).starts_with('#'));
    }

    #[test]
    fn test_count_items_with_exclusions() {
        let tree = board();
        let backlog = tree.panels()[0];
        assert_eq!(tree.count_items(backlog, &[]), 3);
        assert_eq!(tree.count_items(backlog, &["##", "//"]), 1);
    }

    #[test]
    fn test_items_by_name() {
        let tree = board();
        assert_eq!(tree.items_by_name("a", true).len(), 1);
        // "a" is a substring of "a" and "Later".
        assert_eq!(tree.items_by_name("a", false).len(), 2);
        let doing = tree.panels()[1];
        assert_eq!(tree.items_in_panel_containing(doing, "b").unwrap().len(), 1);
        assert!(matches!(
            tree.items_in_panel_containing(doing, ""),
            Err(TreeError::Malformed(_))
        ));
    }

    #[test]
    fn test_panel_filters() {
        let tree = board();
        let re = Regex::new(r"\[(\d*)\]").unwrap();
        assert_eq!(tree.panels_matching(&PanelFilter::pattern(re)).len(), 1);
        assert_eq!(tree.panels_matching(&PanelFilter::containing("o")).len(), 3);
        let filter = PanelFilter::all().excluding(&["Do"]);
        assert_eq!(tree.panels_matching(&filter).len(), 1);
    }

    #[test]
    fn test_labels_and_fields() {
        let mut tree = board();
        let doing = tree.panels()[1];
        let items = tree.items_in_panel(doing);
        fixture::add_label(&mut tree, items[0], "bug", "red").unwrap();
        fixture::add_label(&mut tree, items[1], "bug", "red").unwrap();
        fixture::add_label(&mut tree, items[1], "*ops", "blue").unwrap();
        fixture::add_badge(&mut tree, items[1], "Owner: kim").unwrap();
        fixture::add_badge(&mut tree, items[1], "Blocked").unwrap();

        assert_eq!(tree.item_labels(items[1], &["*"]), vec!["bug".to_string()]);
        let counts = tree.count_labels_in_panel(doing, &[]);
        assert_eq!(counts.get("bug"), Some(&2));
        assert_eq!(counts.get("*ops"), Some(&1));
        assert_eq!(tree.label_colors().get("*ops").map(String::as_str), Some("blue"));

        let fields = tree.item_fields(items[1]);
        assert_eq!(fields.get("Owner").map(String::as_str), Some("kim"));
        assert_eq!(fields.get("Blocked").map(String::as_str), Some("true"));
        assert!(tree.is_blocked(items[1]));
        assert!(!tree.is_blocked(items[0]));
    }

    #[test]
    fn test_panel_name_errors() {
        let mut tree = board();
        let backlog = tree.panels()[0];
        let extra = tree.create_element("h2", &[shape::PANEL_TITLE_ASSIST]);
        tree.append_child(backlog, extra).unwrap();
        assert!(matches!(tree.panel_name(backlog), Err(TreeError::Ambiguous(_))));

        let orphan = tree.create_element("div", &[shape::PANEL]);
        assert!(matches!(tree.panel_name(orphan), Err(TreeError::NotFound(_))));
    }

    #[test]
    fn test_title_identity() {
        let tree = board();
        let backlog = tree.panels()[0];
        let header = tree.items_in_panel(backlog)[1];
        let marker = SectionMarker::default();
        assert_eq!(TitleIdentity.panel_key(&tree, backlog).unwrap(), "Backlog");
        assert_eq!(
            TitleIdentity.section_key(&tree, header, &marker).as_deref(),
            Some("Later")
        );
    }
}
