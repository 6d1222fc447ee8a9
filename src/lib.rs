//! Interactive treemap engine.
//!
//! A [`tree::TmTree`] holds a weighted hierarchy built from a
//! [`source::NodeSource`], lays it out with slice-and-dice rectangles, and
//! supports expanding, resizing and rearranging nodes while keeping every
//! internal weight equal to the sum of its children.

pub mod colour;
pub mod config;
pub mod crawler;
pub mod edit;
pub mod error;
pub mod expand_state;
pub mod fs_source;
pub mod invariants;
pub mod memory_source;
pub mod render_tree;
pub mod source;
pub mod tree;
pub mod treemap;

pub use colour::{Colour, ColourGenerator};
pub use error::{TreeError, TreeResult};
pub use tree::TmTree;
pub use treemap::Rect;
