// THEORY:
// A `Region` is the accumulated result of a flood fill: every pixel the fill
// claimed plus the bounding box around them. It is built up incrementally while
// the fill runs, consumed once by the anchor resolver, then thrown away.
//
// Like the other containers in `core_modules`, it holds data and knows how to
// summarise itself, but it does not know how it was discovered.

use crate::core_modules::geometry::{BoundingBox, Point};

/// Pixels lying exactly on each edge of a region's bounding box.
///
/// `top` and `bottom` hold x coordinates, `left` and `right` hold y coordinates,
/// so each list describes the span that region occupies along that edge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BorderPixels {
    pub top: Vec<i64>,
    pub right: Vec<i64>,
    pub bottom: Vec<i64>,
    pub left: Vec<i64>,
}

/// A visually uniform, 4-connected set of pixels.
#[derive(Debug, Clone)]
pub struct Region {
    /// Smallest box enclosing every pixel in the region.
    pub bounds: BoundingBox,
    /// Every pixel claimed by the fill, in visiting order.
    pub pixels: Vec<Point>,
}

impl Region {
    /// An empty region whose box starts collapsed on the seed point.
    pub fn seeded_at(seed: Point) -> Self {
        Self {
            bounds: BoundingBox::around(seed),
            pixels: Vec::new(),
        }
    }

    pub fn add(&mut self, point: Point) {
        self.bounds.include(point);
        self.pixels.push(point);
    }

    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    /// Classifies every pixel on a bounding edge into the matching border list.
    /// A corner pixel lands in both of its edges.
    pub fn border_pixels(&self) -> BorderPixels {
        let mut borders = BorderPixels::default();
        for point in &self.pixels {
            if point.x == self.bounds.left {
                borders.left.push(point.y);
            }
            if point.x == self.bounds.right {
                borders.right.push(point.y);
            }
            if point.y == self.bounds.top {
                borders.top.push(point.x);
            }
            if point.y == self.bounds.bottom {
                borders.bottom.push(point.x);
            }
        }
        borders
    }
}
