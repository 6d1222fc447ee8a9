use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Channel spread under which a random colour counts as grey.
const GREY_TOLERANCE: i32 = 20;

/// Shift applied to the blue channel of a rejected (too grey) colour.
const BLUE_SHIFT: u16 = 150;

/// Brightest shade an internal node may get.
pub const MAX_GREY: u32 = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Colour {
    pub const BLACK: Colour = Colour { r: 0, g: 0, b: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn grey(value: u8) -> Self {
        Self::new(value, value, value)
    }

    /// True when every channel is within the grey tolerance of the mean.
    pub fn is_near_grey(&self) -> bool {
        let channels = [self.r as i32, self.g as i32, self.b as i32];
        let avg = channels.iter().sum::<i32>() / 3;
        channels
            .iter()
            .all(|&c| (c - avg).abs() < GREY_TOLERANCE)
    }
}

/// Seedable source of leaf colours.
///
/// Colours that land near the grey scale get their blue channel shifted so
/// leaves never look like the grey internal nodes.
pub struct ColourGenerator {
    rng: SmallRng,
}

impl ColourGenerator {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: SmallRng::from_os_rng(),
        }
    }

    pub fn next_colour(&mut self) -> Colour {
        let raw = Colour::new(
            self.rng.random_range(0..=255),
            self.rng.random_range(0..=255),
            self.rng.random_range(0..=255),
        );
        adjust_grey(raw)
    }
}

impl std::fmt::Debug for ColourGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColourGenerator").finish_non_exhaustive()
    }
}

fn adjust_grey(colour: Colour) -> Colour {
    if colour.is_near_grey() {
        let b = ((colour.b as u16 + BLUE_SHIFT) % 255) as u8;
        Colour::new(colour.r, colour.g, b)
    } else {
        colour
    }
}

/// Grey increment per depth level for a tree whose longest root-to-leaf path
/// has `max_depth` edges.
///
/// This is the smallest step whose product with `max_depth - 1` reaches
/// `MAX_GREY`, minus one when the product overshoots, i.e. the integer
/// quotient. Trees with at most one level below the root get 0.
pub fn grey_step(max_depth: usize) -> u32 {
    if max_depth <= 1 {
        return 0;
    }
    let levels = (max_depth - 1) as u32;
    MAX_GREY / levels
}

/// Shade for an internal node at `depth`.
pub fn grey_for_depth(depth: usize, step: u32) -> Colour {
    let value = (depth as u64 * step as u64).min(u8::MAX as u64) as u8;
    Colour::grey(value)
}
