use indextree::{Arena, NodeId};
use std::sync::Arc;
use tracing::{debug, instrument, trace};

use crate::colour::{grey_for_depth, grey_step, Colour, ColourGenerator};
use crate::error::{TreeError, TreeResult};
use crate::source::{describe, NodeShape, NodeSource, SourceEntry};
use crate::treemap::{Rect, SliceLayout};

/// Payload of one node in the treemap hierarchy.
#[derive(Debug, Clone)]
pub struct TmNode {
    /// `None` only for the empty-tree sentinel.
    pub(crate) name: Option<String>,
    /// Key that lets the source rebuild an equivalent node.
    pub(crate) identity: String,
    pub(crate) data_size: u64,
    pub(crate) rect: Rect,
    pub(crate) colour: Colour,
    pub(crate) expanded: bool,
    pub(crate) depth: usize,
    /// Parent at the time this node was deleted; kept for navigation.
    pub(crate) former_parent: Option<NodeId>,
}

impl TmNode {
    fn new(name: Option<String>, identity: String, data_size: u64, colour: Colour) -> Self {
        Self {
            name,
            identity,
            data_size,
            rect: Rect::ZERO,
            colour,
            expanded: false,
            depth: 0,
            former_parent: None,
        }
    }
}

/// Treemap tree stored in an arena.
///
/// Children are owned through the arena's child links; the parent link is
/// non-owning. Every operation takes a `NodeId` and quietly does nothing for
/// ids that have been discarded.
pub struct TmTree {
    pub(crate) arena: Arena<TmNode>,
    pub(crate) root: NodeId,
    pub(crate) source: Option<Arc<dyn NodeSource>>,
    pub(crate) colours: ColourGenerator,
}

impl std::fmt::Debug for TmTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TmTree")
            .field("root", &self.root)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl TmTree {
    /// The empty tree: a single nameless node of weight 0.
    pub fn empty(mut colours: ColourGenerator) -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(TmNode::new(None, String::new(), 0, colours.next_colour()));
        Self {
            arena,
            root,
            source: None,
            colours,
        }
    }

    /// Build the hierarchy rooted at `identity` by asking `source` for
    /// every entry.
    #[instrument(level = "debug", skip(source, colours))]
    pub fn from_source(
        source: Arc<dyn NodeSource>,
        identity: &str,
        mut colours: ColourGenerator,
    ) -> TreeResult<Self> {
        let mut arena = Arena::new();
        let root = Self::build_node(&mut arena, &mut colours, source.as_ref(), identity)?;
        let tree = Self {
            arena,
            root,
            source: Some(source),
            colours,
        };
        debug!(
            nodes = tree.len(),
            size = tree.data_size(root),
            "built tree"
        );
        Ok(tree)
    }

    fn build_node(
        arena: &mut Arena<TmNode>,
        colours: &mut ColourGenerator,
        source: &dyn NodeSource,
        identity: &str,
    ) -> TreeResult<NodeId> {
        match source.load(identity)? {
            SourceEntry::Leaf { name, size } => Ok(arena.new_node(TmNode::new(
                Some(name),
                identity.to_string(),
                size,
                colours.next_colour(),
            ))),
            SourceEntry::Internal { name, children } => {
                let mut child_ids = Vec::with_capacity(children.len());
                for child in &children {
                    match Self::build_node(arena, colours, source, child) {
                        Ok(id) => child_ids.push(id),
                        Err(e) => {
                            for built in child_ids {
                                built.remove_subtree(arena);
                            }
                            return Err(e);
                        }
                    }
                }

                let total = child_ids.iter().map(|&c| arena[c].get().data_size).sum();
                let id = arena.new_node(TmNode::new(
                    Some(name),
                    identity.to_string(),
                    total,
                    colours.next_colour(),
                ));
                for child in child_ids {
                    id.append(child, arena);
                }
                Ok(id)
            }
        }
    }

    /// Build a fresh detached subtree for `identity` from this tree's source.
    pub(crate) fn build_detached(&mut self, identity: &str) -> TreeResult<NodeId> {
        let source = self
            .source
            .clone()
            .ok_or_else(|| TreeError::MissingEntry(identity.to_string()))?;
        Self::build_node(&mut self.arena, &mut self.colours, source.as_ref(), identity)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes reachable from the root.
    pub fn len(&self) -> usize {
        self.root.descendants(&self.arena).count()
    }

    /// True for the empty-tree sentinel.
    pub fn is_empty(&self) -> bool {
        self.node(self.root).map_or(true, |n| n.name.is_none())
    }

    pub(crate) fn node(&self, id: NodeId) -> Option<&TmNode> {
        if id.is_removed(&self.arena) {
            return None;
        }
        self.arena.get(id).map(|n| n.get())
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut TmNode> {
        if id.is_removed(&self.arena) {
            return None;
        }
        self.arena.get_mut(id).map(|n| n.get_mut())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.node(id).and_then(|n| n.name.as_deref())
    }

    pub fn identity(&self, id: NodeId) -> Option<&str> {
        self.node(id).map(|n| n.identity.as_str())
    }

    pub fn data_size(&self, id: NodeId) -> u64 {
        self.node(id).map_or(0, |n| n.data_size)
    }

    pub fn rect(&self, id: NodeId) -> Rect {
        self.node(id).map_or(Rect::ZERO, |n| n.rect)
    }

    pub fn colour(&self, id: NodeId) -> Colour {
        self.node(id).map_or(Colour::BLACK, |n| n.colour)
    }

    pub fn depth(&self, id: NodeId) -> usize {
        self.node(id).map_or(0, |n| n.depth)
    }

    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|n| n.expanded)
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.contains(id) && self.arena[id].first_child().is_none()
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        if !self.contains(id) {
            return Vec::new();
        }
        id.children(&self.arena).collect()
    }

    /// Structural parent, or for a deleted node the parent it was removed
    /// from.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        let node = self.node(id)?;
        self.arena[id]
            .parent()
            .or(node.former_parent)
            .filter(|&p| self.contains(p))
    }

    pub(crate) fn structural_parent(&self, id: NodeId) -> Option<NodeId> {
        if !self.contains(id) {
            return None;
        }
        self.arena[id].parent()
    }

    /// Whether `id` is still reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.contains(id) && id.ancestors(&self.arena).last() == Some(self.root)
    }

    // ---- weights ----

    /// Recompute weights bottom-up below `id` and return the weight of `id`.
    ///
    /// Leaves keep their weight; internal nodes take the sum of their
    /// children.
    pub fn update_data_sizes(&mut self, id: NodeId) -> u64 {
        if !self.contains(id) {
            return 0;
        }

        let children: Vec<NodeId> = id.children(&self.arena).collect();
        if children.is_empty() {
            return self.data_size(id);
        }

        let mut total = 0u64;
        for child in children {
            total += self.update_data_sizes(child);
        }
        if let Some(node) = self.node_mut(id) {
            node.data_size = total;
        }
        total
    }

    /// Re-derive weights from `id` up to the root, nearest first. Nodes with
    /// children take the sum of their children; a childless `id` keeps its
    /// own weight.
    pub(crate) fn refresh_upwards(&mut self, id: NodeId) {
        if !self.contains(id) {
            return;
        }
        let chain: Vec<NodeId> = id.ancestors(&self.arena).collect();
        for node_id in chain {
            if self.is_leaf(node_id) {
                continue;
            }
            let total: u64 = node_id
                .children(&self.arena)
                .map(|c| self.arena[c].get().data_size)
                .sum();
            if let Some(node) = self.node_mut(node_id) {
                node.data_size = total;
            }
        }
    }

    // ---- layout ----

    /// Fill `rect` with the subtree at `id`, splitting along the longer side
    /// at every level.
    pub fn update_rectangles(&mut self, id: NodeId, rect: Rect) {
        if !self.contains(id) {
            return;
        }
        if self.data_size(id) == 0 {
            self.clear_rectangles(id);
            return;
        }
        if let Some(node) = self.node_mut(id) {
            node.rect = rect;
        }

        let children: Vec<NodeId> = id.children(&self.arena).collect();
        if children.is_empty() {
            return;
        }
        let weights: Vec<u64> = children.iter().map(|&c| self.data_size(c)).collect();
        let rects = SliceLayout::layout(&weights, rect);
        for (child, child_rect) in children.into_iter().zip(rects) {
            self.update_rectangles(child, child_rect);
        }
    }

    fn clear_rectangles(&mut self, id: NodeId) {
        let subtree: Vec<NodeId> = id.descendants(&self.arena).collect();
        for node_id in subtree {
            if let Some(node) = self.node_mut(node_id) {
                node.rect = Rect::ZERO;
            }
        }
    }

    /// Nodes on the visible frontier below `id`, in layout order.
    pub fn visible_nodes(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_visible(id, &mut out);
        out
    }

    fn collect_visible(&self, id: NodeId, out: &mut Vec<NodeId>) {
        let Some(node) = self.node(id) else {
            return;
        };
        if node.data_size == 0 || node.name.is_none() {
            return;
        }
        if !node.expanded || self.is_leaf(id) {
            out.push(id);
            return;
        }
        for child in id.children(&self.arena) {
            self.collect_visible(child, out);
        }
    }

    /// `(rect, colour)` for every node on the visible frontier.
    pub fn get_rectangles(&self, id: NodeId) -> Vec<(Rect, Colour)> {
        self.visible_nodes(id)
            .into_iter()
            .filter_map(|v| self.node(v).map(|n| (n.rect, n.colour)))
            .collect()
    }

    /// The frontier node whose rectangle contains `pos`, or `None` when
    /// `pos` lies outside the rectangle of `id`.
    pub fn get_tree_at_position(&self, id: NodeId, pos: (u32, u32)) -> Option<NodeId> {
        let node = self.node(id)?;
        if !node.rect.contains(pos.0, pos.1) {
            return None;
        }
        if !node.expanded || self.is_leaf(id) {
            return Some(id);
        }
        id.children(&self.arena)
            .find_map(|child| self.get_tree_at_position(child, pos))
    }

    // ---- depths and colours ----

    /// Set depth 0 at `id` and parent depth + 1 below it.
    pub fn update_depths(&mut self, id: NodeId) {
        self.assign_depth(id, 0);
    }

    pub(crate) fn assign_depth(&mut self, id: NodeId, depth: usize) {
        let Some(node) = self.node_mut(id) else {
            return;
        };
        node.depth = depth;
        let children: Vec<NodeId> = id.children(&self.arena).collect();
        for child in children {
            self.assign_depth(child, depth + 1);
        }
    }

    /// Longest edge count from `id` down to a leaf.
    pub fn max_depth(&self, id: NodeId) -> usize {
        if !self.contains(id) {
            return 0;
        }
        id.children(&self.arena)
            .map(|child| 1 + self.max_depth(child))
            .max()
            .unwrap_or(0)
    }

    /// Shade internal nodes grey by depth; leaves keep their colour.
    pub fn update_colours(&mut self, id: NodeId, step: u32) {
        if !self.contains(id) || self.is_leaf(id) {
            return;
        }
        let depth = self.depth(id);
        if let Some(node) = self.node_mut(id) {
            node.colour = grey_for_depth(depth, step);
        }
        let children: Vec<NodeId> = id.children(&self.arena).collect();
        for child in children {
            self.update_colours(child, step);
        }
    }

    /// Recompute depths below `id`, then recolour internal nodes.
    pub fn update_colours_and_depths(&mut self, id: NodeId) {
        if !self.contains(id) {
            return;
        }
        self.update_depths(id);
        let max_depth = self.max_depth(id);
        let step = grey_step(max_depth);
        trace!(max_depth, step, "recolouring internal nodes");
        self.update_colours(id, step);
    }

    /// `(name, depth, colour)` of every internal node below `id`, pre-order.
    pub fn internal_summary(&self, id: NodeId) -> Vec<(String, usize, Colour)> {
        if !self.contains(id) {
            return Vec::new();
        }
        id.descendants(&self.arena)
            .filter(|&d| !self.is_leaf(d))
            .filter_map(|d| self.node(d))
            .map(|n| (n.name.clone().unwrap_or_default(), n.depth, n.colour))
            .collect()
    }

    // ---- text ----

    /// Names from the root down to `id`, joined with the source separator.
    pub fn get_path_string(&self, id: NodeId) -> String {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            if let Some(name) = self.name(node_id) {
                names.push(name);
            }
            current = self.parent(node_id);
        }
        names.reverse();
        let separator = self
            .source
            .as_ref()
            .map_or(std::path::MAIN_SEPARATOR_STR, |s| s.separator());
        names.join(separator)
    }

    pub fn get_suffix(&self, id: NodeId) -> String {
        let shape = NodeShape {
            child_count: self.children(id).len(),
            data_size: self.data_size(id),
        };
        match &self.source {
            Some(source) => source.suffix(shape),
            None => describe(shape),
        }
    }
}
