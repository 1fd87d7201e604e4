/// Mutation records and watches over the board tree.
///
/// A `Watch` plays the role of one observer: it holds a set of observed
/// roots and receives, in order, every record whose target is an observed
/// root (or, with `subtree`, lies below one) at the time of the mutation.
use super::NodeId;

/// One child-list change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
    /// Target followed by its ancestors when the mutation happened.
    path: Vec<NodeId>,
}

impl MutationRecord {
    pub fn new(target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) -> Self {
        Self::with_path(target, added, removed, vec![target])
    }

    pub(crate) fn with_path(
        target: NodeId,
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
        path: Vec<NodeId>,
    ) -> Self {
        Self {
            target,
            added,
            removed,
            path,
        }
    }

    fn is_below(&self, root: NodeId) -> bool {
        self.path.contains(&root)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObserveOptions {
    pub subtree: bool,
}

impl ObserveOptions {
    pub const CHILD_LIST: ObserveOptions = ObserveOptions { subtree: false };
    pub const SUBTREE: ObserveOptions = ObserveOptions { subtree: true };
}

#[derive(Debug, Default)]
pub struct Watch {
    roots: Vec<(NodeId, ObserveOptions)>,
}

impl Watch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe `node`; observing it again only updates the options.
    pub fn observe(&mut self, node: NodeId, options: ObserveOptions) {
        match self.roots.iter_mut().find(|(n, _)| *n == node) {
            Some(entry) => entry.1 = options,
            None => self.roots.push((node, options)),
        }
    }

    pub fn unobserve(&mut self, node: NodeId) {
        self.roots.retain(|(n, _)| *n != node);
    }

    pub fn disconnect(&mut self) {
        self.roots.clear();
    }

    pub fn is_observing(&self, node: NodeId) -> bool {
        self.roots.iter().any(|(n, _)| *n == node)
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn matches(&self, record: &MutationRecord) -> bool {
        self.roots.iter().any(|&(root, options)| {
            record.target == root || (options.subtree && record.is_below(root))
        })
    }

    /// Records delivered to this watch, in journal order.
    pub fn collect(&self, records: &[MutationRecord]) -> Vec<MutationRecord> {
        records
            .iter()
            .filter(|r| self.matches(r))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Tree;

    #[test]
    fn test_child_list_watch_ignores_descendants() {
        let mut tree = Tree::new("loc/x/y");
        let doc = tree.document();
        let board = tree.create_element("div", &[]);
        let panel = tree.create_element("div", &[]);
        let item = tree.create_element("a", &[]);
        tree.append_child(doc, board).unwrap();
        tree.append_child(board, panel).unwrap();
        tree.append_child(panel, item).unwrap();
        let records = tree.take_records();

        let mut watch = Watch::new();
        watch.observe(board, ObserveOptions::CHILD_LIST);
        let batch = watch.collect(&records);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].added, vec![panel]);

        watch.observe(board, ObserveOptions::SUBTREE);
        assert_eq!(watch.collect(&records).len(), 2);
    }

    #[test]
    fn test_ancestry_is_captured_at_mutation_time() {
        let mut tree = Tree::new("loc/x/y");
        let doc = tree.document();
        let panel = tree.create_element("div", &[]);
        let list = tree.create_element("div", &[]);
        tree.append_child(doc, panel).unwrap();
        tree.append_child(panel, list).unwrap();
        tree.take_records();

        let item = tree.create_element("a", &[]);
        tree.append_child(list, item).unwrap();
        // Moving the list away afterwards does not change who saw the insert.
        tree.remove_child(panel, list).unwrap();
        let records = tree.take_records();

        let mut watch = Watch::new();
        watch.observe(panel, ObserveOptions::SUBTREE);
        assert_eq!(watch.collect(&records).len(), 2);
    }

    #[test]
    fn test_unobserve_and_disconnect() {
        let mut watch = Watch::new();
        let node = NodeId(3);
        watch.observe(node, ObserveOptions::SUBTREE);
        assert!(watch.is_observing(node));
        watch.unobserve(node);
        assert!(!watch.is_observing(node));
        watch.observe(node, ObserveOptions::SUBTREE);
        watch.disconnect();
        assert!(watch.is_empty());
        assert!(!watch.matches(&MutationRecord::new(node, vec![], vec![])));
    }
}
