//! Property-based tests for the treemap engine.
//!
//! 1. Slice shares always fill the extent exactly.
//! 2. Child rectangles tile the container with no gaps or overlap.
//! 3. Every visible tile is found again by hit-testing its corner cell.
//! 4. Random edit sequences keep weights, expansion and layout consistent.

use indextree::NodeId;
use proptest::prelude::*;
use spacemap::memory_source::MemorySource;
use spacemap::render_tree::visible_tiles;
use spacemap::treemap::SliceLayout;
use spacemap::{ColourGenerator, Rect, TmTree};
use std::sync::Arc;

// ── Helpers ─────────────────────────────────────────────────────────────

fn weights_strategy() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(prop_oneof![Just(0u64), 1u64..1_000], 1..12)
}

fn container_strategy() -> impl Strategy<Value = Rect> {
    (0u32..50, 0u32..50, 0u32..300, 0u32..300).prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
}

/// Leaves either sit directly under `r` or in one of three folders.
fn tree_strategy() -> impl Strategy<Value = TmTree> {
    prop::collection::vec((prop::option::of(0u8..3), 0u64..500), 1..15).prop_map(|leaves| {
        let mut builder = MemorySource::builder("/");
        for (i, (folder, size)) in leaves.into_iter().enumerate() {
            let identity = match folder {
                Some(f) => format!("r/d{f}/f{i}"),
                None => format!("r/top{i}"),
            };
            builder = builder.leaf(&identity, size);
        }
        TmTree::from_source(Arc::new(builder.build()), "r", ColourGenerator::seeded(9)).unwrap()
    })
}

fn attached_nodes(tree: &TmTree) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![tree.root()];
    while let Some(id) = stack.pop() {
        out.push(id);
        stack.extend(tree.children(id));
    }
    out
}

#[derive(Debug, Clone)]
enum Edit {
    Resize(usize, f64),
    Delete(usize),
    Move(usize, usize),
    Duplicate(usize),
    Paste(usize, usize),
    Expand(usize),
    ExpandAll(usize),
    Collapse(usize),
    CollapseAll(usize),
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    let idx = any::<usize>();
    prop_oneof![
        (idx.clone(), -1.5f64..1.5).prop_map(|(i, f)| Edit::Resize(i, f)),
        idx.clone().prop_map(Edit::Delete),
        (idx.clone(), idx.clone()).prop_map(|(a, b)| Edit::Move(a, b)),
        idx.clone().prop_map(Edit::Duplicate),
        (idx.clone(), idx.clone()).prop_map(|(a, b)| Edit::Paste(a, b)),
        idx.clone().prop_map(Edit::Expand),
        idx.clone().prop_map(Edit::ExpandAll),
        idx.clone().prop_map(Edit::Collapse),
        idx.prop_map(Edit::CollapseAll),
    ]
}

fn apply(tree: &mut TmTree, edit: &Edit) {
    let nodes = attached_nodes(tree);
    let pick = |i: usize| nodes[i % nodes.len()];
    match *edit {
        Edit::Resize(i, f) => tree.change_size(pick(i), f),
        Edit::Delete(i) => {
            tree.delete_self(pick(i));
        }
        Edit::Move(a, b) => tree.move_to(pick(a), pick(b)),
        Edit::Duplicate(i) => {
            tree.duplicate(pick(i));
        }
        Edit::Paste(a, b) => tree.copy_paste(pick(a), pick(b)),
        Edit::Expand(i) => tree.expand(pick(i)),
        Edit::ExpandAll(i) => tree.expand_all(pick(i)),
        Edit::Collapse(i) => tree.collapse(pick(i)),
        Edit::CollapseAll(i) => tree.collapse_all(pick(i)),
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Shares fill the extent
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn shares_fill_extent(weights in weights_strategy(), extent in 0u32..10_000) {
        let shares = SliceLayout::shares(&weights, extent);
        prop_assert_eq!(shares.len(), weights.len());
        let total: u64 = weights.iter().sum();
        let filled: u64 = shares.iter().map(|&s| s as u64).sum();
        if total == 0 {
            prop_assert_eq!(filled, 0);
        } else {
            prop_assert_eq!(filled, extent as u64);
        }
        for (w, s) in weights.iter().zip(&shares) {
            if *w == 0 {
                prop_assert_eq!(*s, 0, "zero weight got a share: {:?}", weights);
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Layout tiles the container
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn layout_tiles_container(weights in weights_strategy(), container in container_strategy()) {
        let rects = SliceLayout::layout(&weights, container);
        prop_assert_eq!(rects.len(), weights.len());
        if weights.iter().all(|&w| w == 0) {
            return Ok(());
        }

        let covered: u64 = rects.iter().map(Rect::area).sum();
        prop_assert_eq!(covered, container.area());
        for r in &rects {
            if r.is_empty() {
                continue;
            }
            prop_assert!(r.x >= container.x && r.y >= container.y);
            prop_assert!(r.right() <= container.right() && r.bottom() <= container.bottom());
        }
        for (i, a) in rects.iter().enumerate() {
            for b in &rects[i + 1..] {
                let overlap_x = (a.x.max(b.x) as u64) < a.right().min(b.right());
                let overlap_y = (a.y.max(b.y) as u64) < a.bottom().min(b.bottom());
                prop_assert!(!(overlap_x && overlap_y), "{:?} overlaps {:?}", a, b);
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Hit-testing finds every visible tile
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn hit_test_finds_tiles(
        mut tree in tree_strategy(),
        expand in any::<bool>(),
        w in 1u32..200,
        h in 1u32..200,
    ) {
        let root = tree.root();
        if expand {
            tree.expand_all(root);
        }
        tree.update_rectangles(root, Rect::new(0, 0, w, h));

        let tiles = visible_tiles(&tree, root);
        let covered: u64 = tiles.iter().map(|t| t.rect.area()).sum();
        if tree.data_size(root) > 0 {
            prop_assert_eq!(covered, (w * h) as u64);
        }
        for tile in tiles {
            let corner = (tile.rect.x + 1, tile.rect.y + 1);
            prop_assert_eq!(tree.get_tree_at_position(root, corner), Some(tile.id));
        }
        prop_assert_eq!(tree.get_tree_at_position(root, (0, 0)), None);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Edit sequences preserve the tree invariants
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn edits_preserve_invariants(
        mut tree in tree_strategy(),
        edits in prop::collection::vec(edit_strategy(), 1..25),
    ) {
        for edit in &edits {
            apply(&mut tree, edit);
            prop_assert_eq!(tree.check_invariants(false), Ok(()), "after {:?}", edit);
        }

        let root = tree.root();
        tree.update_rectangles(root, Rect::new(0, 0, 120, 40));
        prop_assert_eq!(tree.check_invariants(true), Ok(()));

        let leaf_total: u64 = attached_nodes(&tree)
            .into_iter()
            .filter(|&id| tree.is_leaf(id))
            .map(|id| tree.data_size(id))
            .sum();
        if !tree.is_leaf(root) {
            prop_assert_eq!(tree.data_size(root), leaf_total);
        }
    }
}
