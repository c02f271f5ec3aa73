//! Anchor placement

use crate::config::layout::{ANCHOR_SIDE_ANCHORS, TAG_ANCHORS};
use crate::protocol::AnchorId;
use crate::solver::trilateration::{Anchor, Point};

/// Positions of the three anchors, indexed by [`AnchorId::index`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorLayout {
    positions: [Point; 3],
}

impl AnchorLayout {
    pub const fn new(positions: [Point; 3]) -> Self {
        Self { positions }
    }

    pub const fn from_table(table: [(f64, f64); 3]) -> Self {
        Self::new([
            Point::new(table[0].0, table[0].1),
            Point::new(table[1].0, table[1].1),
            Point::new(table[2].0, table[2].1),
        ])
    }

    /// Layout surveyed for the tag
    pub const fn tag() -> Self {
        Self::from_table(TAG_ANCHORS)
    }

    /// Layout used by the anchor-side solver
    pub const fn anchor_side() -> Self {
        Self::from_table(ANCHOR_SIDE_ANCHORS)
    }

    pub fn position(&self, anchor: AnchorId) -> Point {
        self.positions[anchor.index()]
    }

    /// True if every coordinate is a finite number
    pub fn is_finite(&self) -> bool {
        self.positions.iter().all(|p| p.x.is_finite() && p.y.is_finite())
    }

    /// Pair each anchor position with its measured range
    pub fn with_distances(&self, distances: &[f64; 3]) -> [Anchor; 3] {
        core::array::from_fn(|i| Anchor::new(self.positions[i].x, self.positions[i].y, distances[i]))
    }
}

impl Default for AnchorLayout {
    fn default() -> Self {
        Self::tag()
    }
}
