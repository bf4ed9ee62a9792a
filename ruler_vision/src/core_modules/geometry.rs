// THEORY:
// Small value types shared by every scanner. Coordinates are signed because scans
// routinely step one pixel past the image edge before the bounds check rejects
// the probe.

/// An integer pixel coordinate. May lie outside the screenshot while scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    pub fn step(&self, direction: Direction) -> Point {
        let (dx, dy) = direction.vector();
        Point::new(self.x + dx, self.y + dy)
    }
}

/// One of the four cardinal directions a ruler measures along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Top,
    Right,
    Bottom,
    Left,
}

impl Direction {
    /// Stable iteration order. Results are always reported in this order.
    pub const ALL: [Direction; 4] = [
        Direction::Top,
        Direction::Right,
        Direction::Bottom,
        Direction::Left,
    ];

    /// Unit step in screen coordinates (y grows downwards).
    pub fn vector(self) -> (i64, i64) {
        match self {
            Direction::Top => (0, -1),
            Direction::Right => (1, 0),
            Direction::Bottom => (0, 1),
            Direction::Left => (-1, 0),
        }
    }
}

/// Non-negative pixel distances from an anchor to the boundary in each direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Extents {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl Extents {
    pub fn set(&mut self, direction: Direction, distance: u32) {
        match direction {
            Direction::Top => self.top = distance,
            Direction::Right => self.right = distance,
            Direction::Bottom => self.bottom = distance,
            Direction::Left => self.left = distance,
        }
    }

    /// Sum of all four distances. The ray scanner uses it to spot degenerate results.
    pub fn total(&self) -> u32 {
        self.top + self.right + self.bottom + self.left
    }
}

/// Axis-aligned box in absolute pixel coordinates, edges inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
    pub left: i64,
}

impl BoundingBox {
    /// A zero-sized box around a single point.
    pub fn around(point: Point) -> Self {
        Self {
            top: point.y,
            right: point.x,
            bottom: point.y,
            left: point.x,
        }
    }

    pub fn include(&mut self, point: Point) {
        self.left = self.left.min(point.x);
        self.right = self.right.max(point.x);
        self.top = self.top.min(point.y);
        self.bottom = self.bottom.max(point.y);
    }

    pub fn width(&self) -> i64 {
        self.right - self.left + 1
    }

    pub fn height(&self) -> i64 {
        self.bottom - self.top + 1
    }

    /// Distances from `anchor` to each edge. Edges on the wrong side of the anchor
    /// count as zero.
    pub fn extents_from(&self, anchor: Point) -> Extents {
        let distance = |d: i64| d.max(0) as u32;
        Extents {
            top: distance(anchor.y - self.top),
            right: distance(self.right - anchor.x),
            bottom: distance(self.bottom - anchor.y),
            left: distance(anchor.x - self.left),
        }
    }
}
