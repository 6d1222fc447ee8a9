//! Expansion state machine.
//!
//! A node is either collapsed (the initial state) or expanded. Only nodes
//! with children can be expanded, and an expanded node always has expanded
//! ancestors, so the visible frontier is reachable from the root.

use indextree::NodeId;
use tracing::trace;

use crate::tree::TmTree;

impl TmTree {
    /// Expand `id` and every ancestor up to the root. A leaf is forced back
    /// to collapsed instead.
    pub fn expand(&mut self, id: NodeId) {
        if !self.contains(id) {
            return;
        }
        if self.is_leaf(id) {
            if let Some(node) = self.node_mut(id) {
                node.expanded = false;
            }
            return;
        }

        let mut current = Some(id);
        while let Some(node_id) = current {
            if let Some(node) = self.node_mut(node_id) {
                node.expanded = true;
            }
            current = self.parent(node_id);
        }
    }

    /// Expand `id` and all of its descendants; leaves stay collapsed.
    pub fn expand_all(&mut self, id: NodeId) {
        self.expand(id);
        for child in self.children(id) {
            self.expand_all(child);
        }
    }

    /// Collapse the whole subtree of the parent of `id`. Does nothing at the
    /// root.
    pub fn collapse(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id) {
            trace!(?parent, "collapsing parent subtree");
            self.collapse_subtree(parent);
        }
    }

    /// Collapse every node of the tree `id` belongs to.
    pub fn collapse_all(&mut self, id: NodeId) {
        if !self.contains(id) {
            return;
        }
        let mut top = id;
        while let Some(parent) = self.parent(top) {
            top = parent;
        }
        self.collapse_subtree(top);
    }

    fn collapse_subtree(&mut self, id: NodeId) {
        if !self.contains(id) {
            return;
        }
        let subtree: Vec<NodeId> = id.descendants(&self.arena).collect();
        for node_id in subtree {
            if let Some(node) = self.node_mut(node_id) {
                node.expanded = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::memory_source::MemorySource;
    use crate::tree::tests::{child_named, three_level, tree_from};

    #[test]
    fn test_expand_collapse() {
        let mut tree = three_level();
        let root = tree.root();
        let a = child_named(&tree, root, "a");

        assert!(!tree.is_expanded(root));
        tree.expand(a);
        assert!(tree.is_expanded(a));
        assert!(tree.is_expanded(root));

        let a1 = child_named(&tree, a, "a1");
        tree.collapse(a1);
        assert!(!tree.is_expanded(a));
        assert!(tree.is_expanded(root));
    }

    #[test]
    fn test_expand_leaf_stays_collapsed() {
        let mut tree = three_level();
        let root = tree.root();
        let a = child_named(&tree, root, "a");
        let a1 = child_named(&tree, a, "a1");

        tree.node_mut(a1).unwrap().expanded = true;
        tree.expand(a1);
        assert!(!tree.is_expanded(a1));
        assert!(!tree.is_expanded(a));
    }

    #[test]
    fn test_expand_deep_node_expands_chain() {
        let mut tree = tree_from(
            MemorySource::builder("/")
                .leaf("r/x/y/z/leaf", 5)
                .leaf("r/other", 5)
                .build(),
            "r",
        );
        let root = tree.root();
        let x = child_named(&tree, root, "x");
        let y = child_named(&tree, x, "y");
        let z = child_named(&tree, y, "z");

        tree.expand(z);
        for id in [z, y, x, root] {
            assert!(tree.is_expanded(id));
        }
        let other = child_named(&tree, root, "other");
        assert!(!tree.is_expanded(other));
    }

    #[test]
    fn test_expand_all() {
        let mut tree = three_level();
        let root = tree.root();
        tree.expand_all(root);

        let a = child_named(&tree, root, "a");
        let b = child_named(&tree, root, "b");
        assert!(tree.is_expanded(root));
        assert!(tree.is_expanded(a));
        assert!(tree.is_expanded(b));
        for leaf in tree.children(a).into_iter().chain(tree.children(b)) {
            assert!(!tree.is_expanded(leaf));
        }
        assert_eq!(tree.visible_nodes(root).len(), 4);
    }

    #[test]
    fn test_collapse_at_root_is_noop() {
        let mut tree = three_level();
        let root = tree.root();
        tree.expand_all(root);
        tree.collapse(root);
        assert!(tree.is_expanded(root));
    }

    #[test]
    fn test_collapse_all_from_leaf() {
        let mut tree = three_level();
        let root = tree.root();
        tree.expand_all(root);
        let b = child_named(&tree, root, "b");
        let b2 = child_named(&tree, b, "b2");

        tree.collapse_all(b2);
        for id in root.descendants(&tree.arena) {
            assert!(!tree.is_expanded(id));
        }
        assert_eq!(tree.visible_nodes(root), vec![root]);
    }
}
