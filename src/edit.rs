//! In-place edits: resize, delete, move, duplicate and copy-paste.
//!
//! Every edit leaves each internal node's weight equal to the sum of its
//! children's. Calls whose shape precondition does not hold (a leaf-only
//! edit on a folder, a non-folder destination) are ignored.

use indextree::NodeId;
use tracing::{debug, instrument, warn};

use crate::tree::TmTree;

impl TmTree {
    /// Grow or shrink a leaf by `factor` of its weight.
    ///
    /// The change is rounded away from zero and the result never drops
    /// below 1, so a resized leaf stays visible. Folders are left alone.
    pub fn change_size(&mut self, id: NodeId, factor: f64) {
        if !self.contains(id) {
            return;
        }
        if self.is_leaf(id) {
            let old = self.data_size(id);
            let new_size = resized(old, factor);
            if let Some(node) = self.node_mut(id) {
                node.data_size = new_size;
            }
            debug!(?id, old, new_size, factor, "resized leaf");
        }
        self.refresh_upwards(id);
    }

    /// Remove `id` from its parent. A parent left without children is
    /// removed as well, up the chain.
    ///
    /// Returns false for the root. The removed node remembers its former
    /// parent (see `TmTree::parent`) until it is discarded.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_self(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.structural_parent(id) else {
            return false;
        };

        id.detach(&mut self.arena);
        if let Some(node) = self.node_mut(id) {
            node.former_parent = Some(parent);
        }

        if self.is_leaf(parent) {
            if !self.delete_self(parent) {
                self.mark_emptied(parent);
            }
        } else {
            self.refresh_upwards(parent);
        }
        true
    }

    /// Move leaf `id` to be the last child of folder `destination`.
    pub fn move_to(&mut self, id: NodeId, destination: NodeId) {
        if !self.is_leaf(id) || !self.contains(destination) || self.is_leaf(destination) {
            return;
        }

        if let Some(old_parent) = self.structural_parent(id) {
            id.detach(&mut self.arena);
            if old_parent != destination && self.is_leaf(old_parent) {
                self.mark_emptied(old_parent);
            }
            self.refresh_upwards(old_parent);
        }

        destination.append(id, &mut self.arena);
        let depth = self.depth(destination) + 1;
        if let Some(node) = self.node_mut(id) {
            node.former_parent = None;
            node.depth = depth;
        }
        self.refresh_upwards(destination);
        debug!(?id, ?destination, "moved leaf");
    }

    /// Rebuild leaf `id` from its source and append the copy to the same
    /// parent. Returns the new node.
    pub fn duplicate(&mut self, id: NodeId) -> Option<NodeId> {
        if !self.is_leaf(id) {
            return None;
        }
        let parent = self.structural_parent(id)?;
        let twin = self.rebuild(id)?;

        parent.append(twin, &mut self.arena);
        self.assign_depth(twin, self.depth(parent) + 1);
        self.refresh_upwards(parent);
        Some(twin)
    }

    /// Rebuild leaf `id` from its source and append the copy to folder
    /// `destination`.
    ///
    /// `destination` is re-summed even when the shapes do not allow a copy.
    pub fn copy_paste(&mut self, id: NodeId, destination: NodeId) {
        if self.is_leaf(id) && self.contains(destination) && !self.is_leaf(destination) {
            if let Some(twin) = self.rebuild(id) {
                destination.append(twin, &mut self.arena);
                self.assign_depth(twin, self.depth(destination) + 1);
            }
        }
        self.update_data_sizes(destination);
        self.refresh_upwards(destination);
    }

    /// Free a subtree that is no longer attached to the root.
    ///
    /// Returns false (and keeps the node) while it is still attached.
    pub fn discard(&mut self, id: NodeId) -> bool {
        if !self.contains(id) || self.is_attached(id) {
            return false;
        }
        id.remove_subtree(&mut self.arena);
        true
    }

    /// Follow parent links from `id` until a node attached to the root is
    /// found.
    pub fn nearest_attached(&self, id: NodeId) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if self.is_attached(node_id) {
                return Some(node_id);
            }
            current = self.parent(node_id);
        }
        None
    }

    fn rebuild(&mut self, id: NodeId) -> Option<NodeId> {
        let identity = self.identity(id)?.to_string();
        match self.build_detached(&identity) {
            Ok(twin) => Some(twin),
            Err(e) => {
                warn!(identity = %identity, error = %e, "could not rebuild node from source");
                None
            }
        }
    }

    /// A node that lost its last child becomes an empty node of weight 0.
    fn mark_emptied(&mut self, id: NodeId) {
        if let Some(node) = self.node_mut(id) {
            node.data_size = 0;
            node.expanded = false;
        }
    }
}

fn resized(old: u64, factor: f64) -> u64 {
    let scaled = old as f64 * factor;
    let change = if factor > 0.0 {
        scaled.ceil()
    } else if factor < 0.0 {
        scaled.floor()
    } else {
        0.0
    };
    let new_size = old as i128 + change as i128;
    new_size.clamp(1, u64::MAX as i128) as u64
}
