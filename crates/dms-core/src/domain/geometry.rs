//! Integer rectangles, points and window size limits.
//!
//! All coordinates are physical pixels in display space unless stated
//! otherwise.  Widths and heights are `i32` (not `u32`) because the drag
//! solver works with signed deltas and intermediate results may briefly be
//! negative before they are clamped.

use serde::{Deserialize, Serialize};

/// Float comparisons in the solver treat anything closer than this as equal.
pub const FLOAT_EPSILON: f32 = 0.00001;

/// Returns `true` when `value` is indistinguishable from zero.
pub fn near_zero(value: f32) -> bool {
    value.abs() < FLOAT_EPSILON
}

/// A point in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// X coordinate of the top-left corner (may be negative).
    pub pos_x: i32,
    /// Y coordinate of the top-left corner (may be negative).
    pub pos_y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(pos_x: i32, pos_y: i32, width: i32, height: i32) -> Self {
        Self {
            pos_x,
            pos_y,
            width,
            height,
        }
    }

    /// Returns the rightmost X coordinate (exclusive).
    pub fn right(&self) -> i32 {
        self.pos_x + self.width
    }

    /// Returns the bottommost Y coordinate (exclusive).
    pub fn bottom(&self) -> i32 {
        self.pos_y + self.height
    }

    /// Returns `true` when the rectangle has no area.
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Returns `true` when `point` lies inside the rectangle (edges inclusive
    /// on the top/left, exclusive on the bottom/right).
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.pos_x
            && point.x < self.right()
            && point.y >= self.pos_y
            && point.y < self.bottom()
    }

    /// Returns `true` if this rectangle overlaps with `other`.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.pos_x < other.right()
            && self.right() > other.pos_x
            && self.pos_y < other.bottom()
            && self.bottom() > other.pos_y
    }

    /// Returns the same size placed at `(pos_x, pos_y)`.
    pub fn moved_to(&self, pos_x: i32, pos_y: i32) -> Rect {
        Rect {
            pos_x,
            pos_y,
            ..*self
        }
    }

    /// Returns the width/height swapped, used when a screen is rotated by
    /// 90 or 270 degrees.
    pub fn transposed(&self) -> Rect {
        Rect {
            width: self.height,
            height: self.width,
            ..*self
        }
    }
}

/// Window decoration thickness, in vp, on each side of the content area.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Decoration {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Decoration {
    /// Total horizontal decoration converted to pixels.
    pub fn horizontal_px(&self, vpr: f32) -> i32 {
        ((self.left + self.right) * vpr) as i32
    }

    /// Total vertical decoration converted to pixels.
    pub fn vertical_px(&self, vpr: f32) -> i32 {
        ((self.top + self.bottom) * vpr) as i32
    }
}

/// Size limits a window declares for itself.
///
/// `min_ratio`/`max_ratio` bound `width / height` during free-form resizing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowLimits {
    pub min_width: i32,
    pub min_height: i32,
    pub max_width: i32,
    pub max_height: i32,
    pub min_ratio: f32,
    pub max_ratio: f32,
}

impl Default for WindowLimits {
    fn default() -> Self {
        Self {
            min_width: 1,
            min_height: 1,
            max_width: i32::MAX,
            max_height: i32::MAX,
            min_ratio: 0.0,
            max_ratio: f32::MAX,
        }
    }
}

impl WindowLimits {
    /// Creates limits with the given size bounds and an unconstrained ratio.
    pub fn with_size(min_width: i32, min_height: i32, max_width: i32, max_height: i32) -> Self {
        Self {
            min_width,
            min_height,
            max_width,
            max_height,
            ..Self::default()
        }
    }
}
