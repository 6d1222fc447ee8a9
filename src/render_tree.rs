use indextree::NodeId;

use crate::colour::Colour;
use crate::source::format_size;
use crate::tree::TmTree;
use crate::treemap::Rect;

/// Tiles narrower or shorter than this get no label.
pub const MIN_LABEL_WIDTH: u32 = 4;
pub const MIN_LABEL_HEIGHT: u32 = 1;

/// One drawable rectangle of the visible frontier, produced by
/// `visible_tiles`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub id: NodeId,
    pub name: String,
    pub size: u64,
    pub rect: Rect,
    pub colour: Colour,
    pub is_leaf: bool,
}

impl Tile {
    /// Text drawn inside the tile, cut to fit its width. `None` when the
    /// tile is too small to carry any text.
    pub fn label(&self) -> Option<String> {
        if self.rect.width < MIN_LABEL_WIDTH || self.rect.height < MIN_LABEL_HEIGHT {
            return None;
        }
        let full = format!("{} {}", self.name, format_size(self.size));
        Some(truncate(&full, self.rect.width as usize))
    }
}

/// Snapshot the visible frontier below `root` with its current layout.
pub fn visible_tiles(tree: &TmTree, root: NodeId) -> Vec<Tile> {
    tree.visible_nodes(root)
        .into_iter()
        .filter(|&id| !tree.rect(id).is_empty())
        .map(|id| Tile {
            id,
            name: tree.name(id).unwrap_or_default().to_string(),
            size: tree.data_size(id),
            rect: tree.rect(id),
            colour: tree.colour(id),
            is_leaf: tree.is_leaf(id),
        })
        .collect()
}

/// Status-bar text for `id`: full path plus the source's suffix.
pub fn describe_node(tree: &TmTree, id: NodeId) -> String {
    format!("{}{}", tree.get_path_string(id), tree.get_suffix(id))
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width <= 1 {
        return text.chars().take(width).collect();
    }
    let mut out: String = text.chars().take(width - 1).collect();
    out.push('~');
    out
}
