use indextree::NodeId;
use thiserror::Error;

use crate::treemap::SliceLayout;
use crate::tree::TmTree;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("{node:?}: weight {actual} but children sum to {expected}")]
    SizeMismatch {
        node: NodeId,
        expected: u64,
        actual: u64,
    },

    #[error("{node:?}: leaf is marked expanded")]
    ExpandedLeaf { node: NodeId },

    #[error("{node:?}: expanded under collapsed parent {parent:?}")]
    ExpandedUnderCollapsed { node: NodeId, parent: NodeId },

    #[error("{node:?}: attached node still records a former parent")]
    StaleFormerParent { node: NodeId },

    #[error("{node:?}: empty tree must be a single node of weight 0")]
    MalformedEmptyTree { node: NodeId },

    #[error("{node:?}: child rectangles do not tile the parent rectangle")]
    BadTiling { node: NodeId },
}

impl TmTree {
    /// Check the structural invariants of every node attached to the root.
    ///
    /// Rectangles are only checked when `with_layout` is set, since they are
    /// stale until the next `update_rectangles`.
    pub fn check_invariants(&self, with_layout: bool) -> Result<(), InvariantViolation> {
        let root = self.root();
        if self.name(root).is_none()
            && (!self.is_leaf(root) || self.data_size(root) != 0)
        {
            return Err(InvariantViolation::MalformedEmptyTree { node: root });
        }

        for id in root.descendants(&self.arena) {
            let Some(node) = self.node(id) else {
                continue;
            };
            let children = self.children(id);

            if !children.is_empty() {
                let expected: u64 = children.iter().map(|&c| self.data_size(c)).sum();
                if node.data_size != expected {
                    return Err(InvariantViolation::SizeMismatch {
                        node: id,
                        expected,
                        actual: node.data_size,
                    });
                }
            } else if node.expanded {
                return Err(InvariantViolation::ExpandedLeaf { node: id });
            }

            if node.former_parent.is_some() {
                return Err(InvariantViolation::StaleFormerParent { node: id });
            }

            if let Some(parent) = self.structural_parent(id) {
                if node.expanded && !self.is_expanded(parent) {
                    return Err(InvariantViolation::ExpandedUnderCollapsed { node: id, parent });
                }
            }

            if with_layout && node.data_size > 0 && !children.is_empty() {
                let weights: Vec<u64> = children.iter().map(|&c| self.data_size(c)).collect();
                let expected = SliceLayout::layout(&weights, node.rect);
                let laid_out = children
                    .iter()
                    .zip(&expected)
                    .all(|(&c, want)| self.data_size(c) == 0 || self.rect(c) == *want);
                if !laid_out {
                    return Err(InvariantViolation::BadTiling { node: id });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colour::ColourGenerator;
    use crate::tree::tests::{child_named, three_level};
    use crate::treemap::Rect;

    #[test]
    fn test_fresh_tree_is_consistent() {
        let mut tree = three_level();
        assert_eq!(tree.check_invariants(false), Ok(()));
        let root = tree.root();
        tree.update_rectangles(root, Rect::new(0, 0, 97, 31));
        assert_eq!(tree.check_invariants(true), Ok(()));
        assert_eq!(TmTree::empty(ColourGenerator::seeded(3)).check_invariants(true), Ok(()));
    }

    #[test]
    fn test_detects_size_mismatch() {
        let mut tree = three_level();
        let root = tree.root();
        let a = child_named(&tree, root, "a");
        tree.node_mut(a).unwrap().data_size = 31;
        assert!(matches!(
            tree.check_invariants(false),
            Err(InvariantViolation::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_detects_expanded_under_collapsed() {
        let mut tree = three_level();
        let root = tree.root();
        let a = child_named(&tree, root, "a");
        tree.node_mut(a).unwrap().expanded = true;
        assert_eq!(
            tree.check_invariants(false),
            Err(InvariantViolation::ExpandedUnderCollapsed { node: a, parent: root })
        );
    }

    #[test]
    fn test_detects_stale_layout() {
        let mut tree = three_level();
        let root = tree.root();
        tree.update_rectangles(root, Rect::new(0, 0, 100, 100));
        let a = child_named(&tree, root, "a");
        let a1 = child_named(&tree, a, "a1");
        tree.change_size(a1, 3.0);
        assert_eq!(tree.check_invariants(false), Ok(()));
        assert!(matches!(
            tree.check_invariants(true),
            Err(InvariantViolation::BadTiling { .. })
        ));
    }
}
