use serde::{Deserialize, Serialize};

/// Rectangle structure for treemap layout, in whole units of the display
/// coordinate space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const ZERO: Rect = Rect {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
    };

    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }

    /// Edge rule for hit-testing: a point on the left or top edge belongs to
    /// the neighbour on that side, a point on the right or bottom edge
    /// belongs to this rectangle.
    pub fn contains(&self, px: u32, py: u32) -> bool {
        let (px, py) = (px as u64, py as u64);
        (self.x as u64) < px && px <= self.right() && (self.y as u64) < py && py <= self.bottom()
    }

    /// Axis along which this rectangle gets subdivided.
    pub fn split_axis(&self) -> Axis {
        if self.width > self.height {
            Axis::Vertical
        } else {
            Axis::Horizontal
        }
    }
}

/// Direction of the cut lines when a rectangle is subdivided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Side-by-side columns (width is divided).
    Vertical,
    /// Stacked rows (height is divided).
    Horizontal,
}

/// Slice-and-dice subdivision of a container along its longer side.
pub struct SliceLayout;

impl SliceLayout {
    /// Split `extent` among `weights`.
    ///
    /// Every share except the last non-zero one is
    /// `floor(weight / total * extent)`; the last non-zero weight takes
    /// whatever is left so the shares always sum to `extent`. Zero weights
    /// get a zero share. Returns all zeros when `total` is zero.
    pub fn shares(weights: &[u64], extent: u32) -> Vec<u32> {
        let total: u128 = weights.iter().map(|&w| w as u128).sum();
        let mut result = vec![0u32; weights.len()];
        if total == 0 {
            return result;
        }

        let Some(last) = weights.iter().rposition(|&w| w > 0) else {
            return result;
        };

        let mut allocated = 0u32;
        for (i, &weight) in weights.iter().enumerate() {
            if i == last {
                result[i] = extent - allocated;
                break;
            }
            let share = (weight as u128 * extent as u128 / total) as u32;
            result[i] = share;
            allocated += share;
        }
        result
    }

    /// Lay `weights` out inside `container`, one rectangle per weight.
    /// Positions past `u32::MAX` are clamped to it.
    pub fn layout(weights: &[u64], container: Rect) -> Vec<Rect> {
        let axis = container.split_axis();
        let extent = match axis {
            Axis::Vertical => container.width,
            Axis::Horizontal => container.height,
        };

        let mut offset = 0u32;
        Self::shares(weights, extent)
            .into_iter()
            .map(|share| {
                let rect = match axis {
                    Axis::Vertical => Rect::new(
                        container.x.saturating_add(offset),
                        container.y,
                        share,
                        container.height,
                    ),
                    Axis::Horizontal => Rect::new(
                        container.x,
                        container.y.saturating_add(offset),
                        container.width,
                        share,
                    ),
                };
                offset += share;
                rect
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_wide_container_splits_columns() {
        let rects = SliceLayout::layout(&[30, 70], Rect::new(0, 0, 100, 50));
        assert_eq!(rects, vec![Rect::new(0, 0, 30, 50), Rect::new(30, 0, 70, 50)]);
    }

    #[test]
    fn test_layout_square_container_splits_rows() {
        let rects = SliceLayout::layout(&[1, 1], Rect::new(5, 5, 10, 10));
        assert_eq!(rects, vec![Rect::new(5, 5, 10, 5), Rect::new(5, 10, 10, 5)]);
    }

    #[test]
    fn test_last_share_absorbs_rounding() {
        let shares = SliceLayout::shares(&[1, 1, 1], 100);
        assert_eq!(shares, vec![33, 33, 34]);
        assert_eq!(shares.iter().sum::<u32>(), 100);
    }

    #[test]
    fn test_trailing_zero_weight_gets_nothing() {
        let shares = SliceLayout::shares(&[1, 1, 0], 101);
        assert_eq!(shares, vec![50, 51, 0]);
    }

    #[test]
    fn test_all_zero_weights() {
        assert_eq!(SliceLayout::shares(&[0, 0], 40), vec![0, 0]);
        assert!(SliceLayout::shares(&[], 40).is_empty());
    }

    #[test]
    fn test_layout_near_coordinate_limit() {
        let container = Rect::new(u32::MAX - 2, 0, 10, 4);
        let rects = SliceLayout::layout(&[1, 1], container);
        assert_eq!(rects[0], Rect::new(u32::MAX - 2, 0, 5, 4));
        assert_eq!(rects[1], Rect::new(u32::MAX, 0, 5, 4));
    }

    #[test]
    fn test_contains_edge_rule() {
        let left = Rect::new(0, 0, 10, 10);
        let right = Rect::new(10, 0, 10, 10);
        assert!(left.contains(10, 5));
        assert!(!right.contains(10, 5));
        assert!(right.contains(11, 5));
        assert!(!left.contains(0, 5));
        assert!(!Rect::ZERO.contains(0, 0));
    }
}
