//! Axis-aligned rectangle math.
//!
//! All predicates are exact: no epsilon is applied anywhere, so collision
//! results are reproducible bit-for-bit across runs.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Horizontal extent.
    pub width: f64,
    /// Vertical extent.
    pub height: f64,
}

impl Rect {
    /// Construct a rectangle from its origin and extent.
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A zero-sized rectangle at `(x, y)`, used for point-in-rect tests.
    pub const fn point(x: f64, y: f64) -> Self {
        Self::new(x, y, 0.0, 0.0)
    }

    /// Right edge (`x + width`).
    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge (`y + height`).
    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Euclidean distance between the origins of `a` and `b`.
///
/// Uses the raw `x`/`y` of each rectangle, not their centers.
pub fn distance(a: &Rect, b: &Rect) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

/// Whether `a` and `b` share exactly the same origin.
#[allow(clippy::float_cmp)]
pub fn positions_match(a: &Rect, b: &Rect) -> bool {
    a.x == b.x && a.y == b.y
}

/// Whether `inner` lies entirely within `outer`.
///
/// The far edges are inclusive, so every rectangle is inside itself.
pub fn is_inside(inner: &Rect, outer: &Rect) -> bool {
    inner.x >= outer.x
        && inner.y >= outer.y
        && inner.right() <= outer.right()
        && inner.bottom() <= outer.bottom()
}

/// Whether the open interiors of `a` and `b` overlap on both axes.
///
/// Rectangles that only share an edge do not collide.
pub fn is_colliding(a: &Rect, b: &Rect) -> bool {
    a.right() > b.x && a.x < b.right() && a.bottom() > b.y && a.y < b.bottom()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
