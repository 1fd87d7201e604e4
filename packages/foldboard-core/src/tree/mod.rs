/// Arena model of the live board document.
///
/// Elements carry a tag, a class set, string attributes, a hidden flag and an
/// optional width. Only child-list operations are journaled as mutation
/// records; class, attribute, visibility and width changes are decorations
/// and never show up as mutations.
pub mod fixture;
pub mod lookup;
pub mod mutation;
pub mod shape;

use std::collections::{BTreeMap, BTreeSet};

pub use lookup::{IdentityScheme, PanelFilter, TitleIdentity};
pub use mutation::{MutationRecord, ObserveOptions, Watch};

pub const TEXT_TAG: &str = "#text";
const DOCUMENT_TAG: &str = "#document";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct Node {
    tag: String,
    classes: BTreeSet<String>,
    attrs: BTreeMap<String, String>,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    hidden: bool,
    width: Option<u32>,
}

/// What an id outside the arena reads as.
static UNKNOWN: Node = Node {
    tag: String::new(),
    classes: BTreeSet::new(),
    attrs: BTreeMap::new(),
    text: String::new(),
    parent: None,
    children: Vec::new(),
    hidden: false,
    width: None,
};

#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("more than one {0} found")]
    Ambiguous(String),

    #[error("malformed input: {0}")]
    Malformed(String),
}

#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Node>,
    document: NodeId,
    location: String,
    journal: Vec<MutationRecord>,
}

impl Tree {
    pub fn new(location: &str) -> Self {
        let document = Node {
            tag: DOCUMENT_TAG.to_string(),
            ..Node::default()
        };
        Self {
            nodes: vec![document],
            document: NodeId(0),
            location: location.to_string(),
            journal: Vec::new(),
        }
    }

    pub fn document(&self) -> NodeId {
        self.document
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn set_location(&mut self, location: &str) {
        self.location = location.to_string();
    }

    // ── Node creation ──────────────────────────────────────────────────

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str, classes: &[&str]) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            tag: tag.to_string(),
            classes: classes.iter().map(|c| c.to_string()).collect(),
            ..Node::default()
        });
        id
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            tag: TEXT_TAG.to_string(),
            text: text.to_string(),
            ..Node::default()
        });
        id
    }

    /// `id` was created by this tree.
    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    fn checked(&self, id: NodeId) -> Result<NodeId, TreeError> {
        if self.contains(id) {
            Ok(id)
        } else {
            Err(TreeError::NotFound(format!("node {}", id.0)))
        }
    }

    /// Unknown ids read as an empty, detached node.
    fn node(&self, id: NodeId) -> &Node {
        self.nodes.get(id.0).unwrap_or(&UNKNOWN)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let node = self.nodes.get_mut(id.0);
        if node.is_none() {
            log::warn!("[foldboard.tree] Ignoring write to unknown node {}", id.0);
        }
        node
    }

    // ── Element properties (not journaled) ─────────────────────────────

    pub fn tag(&self, id: NodeId) -> &str {
        &self.node(id).tag
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        self.node(id).tag == TEXT_TAG
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.node(id).classes.contains(class)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if let Some(node) = self.node_mut(id) {
            node.classes.insert(class.to_string());
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if let Some(node) = self.node_mut(id) {
            node.classes.remove(class);
        }
    }

    pub fn set_class(&mut self, id: NodeId, class: &str, on: bool) {
        if on {
            self.add_class(id, class);
        } else {
            self.remove_class(id, class);
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id).attrs.get(name).map(String::as_str)
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(node) = self.node_mut(id) {
            node.attrs.insert(name.to_string(), value.to_string());
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(node) = self.node_mut(id) {
            node.attrs.remove(name);
        }
    }

    pub fn is_hidden(&self, id: NodeId) -> bool {
        self.node(id).hidden
    }

    pub fn set_hidden(&mut self, id: NodeId, hidden: bool) {
        if let Some(node) = self.node_mut(id) {
            node.hidden = hidden;
        }
    }

    pub fn width(&self, id: NodeId) -> Option<u32> {
        self.node(id).width
    }

    pub fn set_width(&mut self, id: NodeId, width: u32) {
        if let Some(node) = self.node_mut(id) {
            node.width = Some(width);
        }
    }

    /// Replace the content of a text node (character data is not observed).
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        if let Some(node) = self.node_mut(id) {
            node.text = text.to_string();
        }
    }

    // ── Navigation ─────────────────────────────────────────────────────

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        self.children(parent).get(idx + 1).copied()
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        idx.checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    /// Ancestors from the parent upwards.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(node) = current {
            out.push(node);
            current = self.parent(node);
        }
        out
    }

    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        self.ancestors(id).contains(&ancestor)
    }

    /// Connected to the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.document || self.is_ancestor(self.document, id)
    }

    /// First of `id` and its ancestors matching `pred`.
    pub fn closest(&self, id: NodeId, pred: impl Fn(&Tree, NodeId) -> bool) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if pred(self, node) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    /// Descendants in document order, `id` excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    pub fn find_first(&self, id: NodeId, pred: impl Fn(&Tree, NodeId) -> bool) -> Option<NodeId> {
        self.descendants(id).into_iter().find(|&n| pred(self, n))
    }

    pub fn find_all(&self, id: NodeId, pred: impl Fn(&Tree, NodeId) -> bool) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&n| pred(self, n))
            .collect()
    }

    /// Attached element carrying the given `id` attribute.
    pub fn find_by_id(&self, element_id: &str) -> Option<NodeId> {
        self.find_first(self.document, |t, n| t.attr(n, "id") == Some(element_id))
    }

    /// Concatenated text of the node and all its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        if self.is_text(id) {
            return self.node(id).text.clone();
        }
        self.descendants(id)
            .into_iter()
            .filter(|&n| self.is_text(n))
            .map(|n| self.node(n).text.as_str())
            .collect()
    }

    /// Text of the direct text children only.
    pub fn own_text(&self, id: NodeId) -> String {
        self.children(id)
            .iter()
            .filter(|&&n| self.is_text(n))
            .map(|&n| self.node(n).text.as_str())
            .collect()
    }

    // ── Child-list operations (journaled) ──────────────────────────────

    /// Append `child` to `parent`, moving it if it is already attached somewhere.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `reference` (or at the end when `None`).
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), TreeError> {
        self.check_insert(parent, child)?;
        // Inserting a node before itself keeps it where it is.
        let reference = if reference == Some(child) {
            self.next_sibling(child)
        } else {
            reference
        };
        if let Some(r) = reference {
            if self.parent(r) != Some(parent) {
                return Err(TreeError::NotFound(format!(
                    "reference {} among children of node {}",
                    r.0, parent.0
                )));
            }
        }
        if let Some(old_parent) = self.parent(child) {
            self.detach(old_parent, child);
        }
        let children = &self.node(parent).children;
        let idx = reference
            .and_then(|r| children.iter().position(|&c| c == r))
            .unwrap_or(children.len());
        self.nodes[parent.0].children.insert(idx, child);
        self.nodes[child.0].parent = Some(parent);
        self.record(parent, vec![child], Vec::new());
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        if self.parent(child) != Some(parent) {
            return Err(TreeError::NotFound(format!(
                "child {} of node {}",
                child.0, parent.0
            )));
        }
        self.detach(parent, child);
        Ok(())
    }

    /// Swap all children of `parent` for `children` in a single mutation record.
    pub fn replace_children(
        &mut self,
        parent: NodeId,
        children: Vec<NodeId>,
    ) -> Result<(), TreeError> {
        self.checked(parent)?;
        for &new in &children {
            self.check_insert(parent, new)?;
        }
        let removed = std::mem::take(&mut self.nodes[parent.0].children);
        for &old in &removed {
            self.nodes[old.0].parent = None;
        }
        for &new in &children {
            if let Some(old_parent) = self.parent(new) {
                self.detach(old_parent, new);
            }
            self.nodes[new.0].parent = Some(parent);
        }
        self.nodes[parent.0].children = children.clone();
        self.record(parent, children, removed);
        Ok(())
    }

    /// Both nodes belong to this tree and `child` is not `parent` or one of its ancestors.
    fn check_insert(&self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.checked(parent)?;
        self.checked(child)?;
        if child == parent || self.is_ancestor(child, parent) {
            return Err(TreeError::Malformed(format!(
                "node {} cannot be inserted under its descendant {}",
                child.0, parent.0
            )));
        }
        Ok(())
    }

    fn detach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0].children.retain(|&c| c != child);
        self.nodes[child.0].parent = None;
        self.record(parent, Vec::new(), vec![child]);
    }

    fn record(&mut self, target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) {
        let mut path = vec![target];
        path.extend(self.ancestors(target));
        self.journal.push(MutationRecord::with_path(target, added, removed, path));
    }

    /// Drain the mutation journal.
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.journal)
    }

    pub fn pending_records(&self) -> usize {
        self.journal.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Tree, NodeId, NodeId, NodeId) {
        let mut tree = Tree::new("https://example.com/b/abc/board");
        let root = tree.create_element("div", &["root"]);
        let a = tree.create_element("span", &["a"]);
        let b = tree.create_element("span", &["b"]);
        let doc = tree.document();
        tree.append_child(doc, root).unwrap();
        tree.append_child(root, a).unwrap();
        tree.append_child(root, b).unwrap();
        (tree, root, a, b)
    }

    #[test]
    fn test_append_records_mutations() {
        let (mut tree, root, a, b) = sample();
        let records = tree.take_records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].target, root);
        assert_eq!(records[1].added, vec![a]);
        assert_eq!(records[2].added, vec![b]);
        assert_eq!(tree.pending_records(), 0);
    }

    #[test]
    fn test_move_records_remove_then_add() {
        let (mut tree, root, a, b) = sample();
        tree.take_records();
        tree.insert_before(root, b, Some(a)).unwrap();
        let records = tree.take_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].removed, vec![b]);
        assert_eq!(records[1].added, vec![b]);
        assert_eq!(tree.children(root), &[b, a]);
    }

    #[test]
    fn test_removed_node_stays_readable() {
        let (mut tree, root, a, _) = sample();
        let text = tree.create_text("hello");
        tree.append_child(a, text).unwrap();
        tree.remove_child(root, a).unwrap();
        assert!(!tree.is_attached(a));
        assert_eq!(tree.text_content(a), "hello");
        assert_eq!(tree.parent(a), None);
        assert!(tree.remove_child(root, a).is_err());
    }

    #[test]
    fn test_decorations_are_not_journaled() {
        let (mut tree, root, a, _) = sample();
        tree.take_records();
        tree.add_class(a, "x");
        tree.set_attr(root, "data-k", "v");
        tree.set_hidden(a, true);
        tree.set_width(root, 40);
        assert_eq!(tree.pending_records(), 0);
        assert!(tree.has_class(a, "x"));
        assert_eq!(tree.attr(root, "data-k"), Some("v"));
    }

    #[test]
    fn test_replace_children_is_one_record() {
        let (mut tree, root, a, b) = sample();
        tree.take_records();
        let c = tree.create_element("span", &[]);
        let d = tree.create_text("d");
        tree.replace_children(root, vec![c, d]).unwrap();
        let records = tree.take_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].added, vec![c, d]);
        assert_eq!(records[0].removed, vec![a, b]);
        assert_eq!(tree.parent(d), Some(root));
    }

    #[test]
    fn test_navigation() {
        let (tree, root, a, b) = sample();
        assert_eq!(tree.next_sibling(a), Some(b));
        assert_eq!(tree.prev_sibling(b), Some(a));
        assert_eq!(tree.prev_sibling(a), None);
        assert_eq!(tree.closest(a, |t, n| t.has_class(n, "root")), Some(root));
        assert_eq!(tree.closest(a, |t, n| t.has_class(n, "a")), Some(a));
        assert_eq!(tree.descendants(root), vec![a, b]);
    }

    #[test]
    fn test_foreign_node_id_reads_empty_and_ignores_writes() {
        let (mut tree, root, _, _) = sample();
        let mut bigger = Tree::new("https://example.com/b/xyz/board");
        let mut foreign = bigger.document();
        for _ in 0..10 {
            foreign = bigger.create_element("div", &["root"]);
        }
        assert!(!tree.contains(foreign));
        assert!(!tree.has_class(foreign, "root"));
        assert_eq!(tree.parent(foreign), None);
        assert!(tree.children(foreign).is_empty());
        assert_eq!(tree.text_content(foreign), "");
        tree.add_class(foreign, "x");
        tree.set_hidden(foreign, true);
        assert!(!tree.has_class(foreign, "x"));
        assert_eq!(tree.children(root).len(), 2);
    }

    #[test]
    fn test_append_unknown_node_is_not_found() {
        let (mut tree, root, _, _) = sample();
        tree.take_records();
        let mut bigger = Tree::new("https://example.com/b/xyz/board");
        let mut foreign = bigger.document();
        for _ in 0..10 {
            foreign = bigger.create_element("div", &[]);
        }
        assert!(matches!(tree.append_child(root, foreign), Err(TreeError::NotFound(_))));
        assert!(matches!(tree.append_child(foreign, root), Err(TreeError::NotFound(_))));
        assert!(matches!(
            tree.replace_children(root, vec![foreign]),
            Err(TreeError::NotFound(_))
        ));
        assert_eq!(tree.pending_records(), 0);
        assert_eq!(tree.children(root).len(), 2);
    }

    #[test]
    fn test_inserting_ancestor_under_descendant_is_rejected() {
        let (mut tree, root, a, b) = sample();
        tree.take_records();
        let doc = tree.document();
        assert!(matches!(tree.append_child(a, root), Err(TreeError::Malformed(_))));
        assert!(matches!(tree.insert_before(a, a, None), Err(TreeError::Malformed(_))));
        assert!(matches!(
            tree.replace_children(a, vec![doc]),
            Err(TreeError::Malformed(_))
        ));
        assert_eq!(tree.pending_records(), 0);
        assert_eq!(tree.parent(root), Some(doc));
        assert_eq!(tree.children(root), &[a, b]);
        assert!(tree.is_attached(b));
    }

    #[test]
    fn test_insert_before_itself_keeps_order() {
        let (mut tree, root, a, b) = sample();
        tree.insert_before(root, a, Some(a)).unwrap();
        assert_eq!(tree.children(root), &[a, b]);
        let stray = tree.create_element("span", &[]);
        assert!(matches!(
            tree.insert_before(root, b, Some(stray)),
            Err(TreeError::NotFound(_))
        ));
        assert_eq!(tree.children(root), &[a, b]);
    }
}
