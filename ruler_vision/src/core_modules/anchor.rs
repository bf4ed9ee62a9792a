// THEORY:
// The anchor resolver picks the point an area measurement is reported from. The
// pointer that started the flood fill can sit anywhere inside the region, so it is
// a poor reference; the anchor approximates the region's visual centre instead.
//
// For each axis the resolver looks at the two opposing border lists (top/bottom
// for x, left/right for y) and takes the midpoint of whichever list spans fewer
// pixels. The narrower edge is less likely to be stretched by an irregular shape,
// so its midpoint tracks the true centre more closely. On a tie the first list
// wins.

use crate::core_modules::geometry::Point;
use crate::core_modules::region::BorderPixels;

/// Extent of one border list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub min: i64,
    pub max: i64,
    pub center: i64,
    pub length: i64,
}

impl Span {
    /// `None` for an empty list.
    pub fn of(values: &[i64]) -> Option<Span> {
        let min = *values.iter().min()?;
        let max = *values.iter().max()?;
        Some(Span {
            min,
            max,
            center: min + (max - min) / 2,
            length: max - min,
        })
    }
}

/// Centre of the shorter of two opposing border lists.
pub fn resolve_axis(first: &[i64], second: &[i64]) -> Option<i64> {
    match (Span::of(first), Span::of(second)) {
        (Some(a), Some(b)) if a.length <= b.length => Some(a.center),
        (Some(_), Some(b)) => Some(b.center),
        (Some(a), None) => Some(a.center),
        (None, Some(b)) => Some(b.center),
        (None, None) => None,
    }
}

/// Resolves the anchor of a region from its border pixels.
pub fn resolve_anchor(borders: &BorderPixels) -> Option<Point> {
    let x = resolve_axis(&borders.top, &borders.bottom)?;
    let y = resolve_axis(&borders.left, &borders.right)?;
    Some(Point::new(x, y))
}
