//! Hot-zone classification: which edge or corner of a window a pointer is on.
//!
//! # Hot zones (for beginners)
//!
//! A floating window can be resized by grabbing a thin band along its border.
//! That band extends a little *outside* the window (so you don't have to hit
//! the exact edge pixel) and a little *inside* it.  Corners get a wider inner
//! band than edges so diagonal resizing is easy to start:
//!
//! ```text
//!  outside ─┐
//!           ▼
//!      ┌────┬──────────────────┬────┐
//!      │ LT │       TOP        │ RT │  ◄─ corner band (corner width)
//!      ├────┼──────────────────┼────┤
//!      │ L  │                  │  R │  ◄─ edge band (frame width)
//!      │    │     content      │    │
//!      ├────┼──────────────────┼────┤
//!      │ LB │      BOTTOM      │ RB │
//!      └────┴──────────────────┴────┘
//! ```
//!
//! All widths are configured in vp and scaled by the virtual pixel ratio.
//! Corner ranges are tested before edge ranges, so a point inside both a
//! corner band and an edge band is a corner.

use serde::{Deserialize, Serialize};

use crate::domain::geometry::Point;
use crate::domain::pointer::SourceType;

/// Edge/corner of a window, as a bitmask of the four sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AreaType {
    Undefined,
    Left,
    Top,
    Right,
    Bottom,
    LeftTop,
    RightTop,
    RightBottom,
    LeftBottom,
}

pub const AREA_LEFT: u32 = 1 << 0;
pub const AREA_TOP: u32 = 1 << 1;
pub const AREA_RIGHT: u32 = 1 << 2;
pub const AREA_BOTTOM: u32 = 1 << 3;

impl AreaType {
    /// The side bits this area touches.
    pub fn bits(self) -> u32 {
        match self {
            AreaType::Undefined => 0,
            AreaType::Left => AREA_LEFT,
            AreaType::Top => AREA_TOP,
            AreaType::Right => AREA_RIGHT,
            AreaType::Bottom => AREA_BOTTOM,
            AreaType::LeftTop => AREA_LEFT | AREA_TOP,
            AreaType::RightTop => AREA_RIGHT | AREA_TOP,
            AreaType::RightBottom => AREA_RIGHT | AREA_BOTTOM,
            AreaType::LeftBottom => AREA_LEFT | AREA_BOTTOM,
        }
    }

    pub fn touches(self, side: u32) -> bool {
        self.bits() & side != 0
    }

    /// The cursor family for this area.
    pub fn drag_type(self) -> DragType {
        match self {
            AreaType::Undefined => DragType::Undefined,
            AreaType::Left | AreaType::Right => DragType::LeftOrRight,
            AreaType::Top | AreaType::Bottom => DragType::BottomOrTop,
            AreaType::LeftTop | AreaType::RightBottom => DragType::LeftTopCorner,
            AreaType::RightTop | AreaType::LeftBottom => DragType::RightTopCorner,
        }
    }
}

/// Resize direction family used to pick a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DragType {
    Undefined,
    BottomOrTop,
    LeftOrRight,
    LeftTopCorner,
    RightTopCorner,
}

impl DragType {
    pub fn cursor_style(self) -> CursorStyle {
        match self {
            DragType::Undefined => CursorStyle::Default,
            DragType::BottomOrTop => CursorStyle::NorthSouth,
            DragType::LeftOrRight => CursorStyle::WestEast,
            DragType::LeftTopCorner => CursorStyle::NorthWestSouthEast,
            DragType::RightTopCorner => CursorStyle::NorthEastSouthWest,
        }
    }
}

/// The five cursor shapes a window border can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CursorStyle {
    #[default]
    Default,
    NorthSouth,
    WestEast,
    NorthWestSouthEast,
    NorthEastSouthWest,
}

impl CursorStyle {
    /// Icon id understood by the platform pointer service.
    pub fn platform_id(self) -> u32 {
        match self {
            CursorStyle::Default => 0,
            CursorStyle::WestEast => 5,
            CursorStyle::NorthSouth => 6,
            CursorStyle::NorthEastSouthWest => 11,
            CursorStyle::NorthWestSouthEast => 12,
        }
    }
}

/// Hot-zone widths in vp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HotZoneConfig {
    /// Inner band along an edge.
    pub window_frame_width: f32,
    /// Inner band at a corner.
    pub window_frame_corner_width: f32,
    /// Outer band for mouse pointers.
    pub hotzone_pointer: f32,
    /// Outer band for touch.
    pub hotzone_touch: f32,
}

impl Default for HotZoneConfig {
    fn default() -> Self {
        Self {
            window_frame_width: 5.0,
            window_frame_corner_width: 16.0,
            hotzone_pointer: 4.0,
            hotzone_touch: 24.0,
        }
    }
}

impl HotZoneConfig {
    /// Outer band in pixels for the given device class.
    pub fn outside_px(&self, source: SourceType, vpr: f32) -> i32 {
        let vp = match source {
            SourceType::Mouse => self.hotzone_pointer,
            SourceType::TouchScreen | SourceType::TouchPad => self.hotzone_touch,
        };
        (vp * vpr) as i32
    }

    /// Classifies a window-relative point against a window of `width × height`.
    pub fn classify(
        &self,
        window_pos: Point,
        width: i32,
        height: i32,
        source: SourceType,
        vpr: f32,
    ) -> AreaType {
        let outside = self.outside_px(source, vpr);
        let inside_corner = (self.window_frame_corner_width * vpr) as i32;
        let inside_edge = (self.window_frame_width * vpr) as i32;

        let left_out = -outside;
        let left_in = inside_edge;
        let left_corner = inside_corner;
        let right_corner = width - inside_corner;
        let right_in = width - inside_edge;
        let right_out = width + outside;
        let top_out = -outside;
        let top_in = inside_edge;
        let top_corner = inside_corner;
        let bottom_corner = height - inside_corner;
        let bottom_in = height - inside_edge;
        let bottom_out = height + outside;

        let in_range = |min: i32, max: i32, value: i32| min <= value && value <= max;
        let (x, y) = (window_pos.x, window_pos.y);

        // Outside the outer band on either axis is never a hot zone.
        if !in_range(left_out, right_out, x) || !in_range(top_out, bottom_out, y) {
            return AreaType::Undefined;
        }

        if in_range(left_out, left_corner, x) && in_range(top_out, top_corner, y) {
            AreaType::LeftTop
        } else if in_range(right_corner, right_out, x) && in_range(top_out, top_corner, y) {
            AreaType::RightTop
        } else if in_range(right_corner, right_out, x) && in_range(bottom_corner, bottom_out, y) {
            AreaType::RightBottom
        } else if in_range(left_out, left_corner, x) && in_range(bottom_corner, bottom_out, y) {
            AreaType::LeftBottom
        } else if in_range(left_out, left_in, x) {
            AreaType::Left
        } else if in_range(top_out, top_in, y) {
            AreaType::Top
        } else if in_range(right_in, right_out, x) {
            AreaType::Right
        } else if in_range(bottom_in, bottom_out, y) {
            AreaType::Bottom
        } else {
            AreaType::Undefined
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: i32 = 1000;
    const H: i32 = 800;

    fn classify_touch(x: i32, y: i32) -> AreaType {
        HotZoneConfig::default().classify(Point::new(x, y), W, H, SourceType::TouchScreen, 1.0)
    }

    fn classify_mouse(x: i32, y: i32) -> AreaType {
        HotZoneConfig::default().classify(Point::new(x, y), W, H, SourceType::Mouse, 1.0)
    }

    // ── Classification ────────────────────────────────────────────────────────

    #[test]
    fn test_classify_center_is_undefined() {
        assert_eq!(classify_touch(500, 400), AreaType::Undefined);
    }

    #[test]
    fn test_classify_each_edge() {
        assert_eq!(classify_touch(2, 400), AreaType::Left);
        assert_eq!(classify_touch(500, 2), AreaType::Top);
        assert_eq!(classify_touch(W - 2, 400), AreaType::Right);
        assert_eq!(classify_touch(500, H - 2), AreaType::Bottom);
    }

    #[test]
    fn test_classify_each_corner() {
        assert_eq!(classify_touch(0, 0), AreaType::LeftTop);
        assert_eq!(classify_touch(W, 0), AreaType::RightTop);
        assert_eq!(classify_touch(W, H), AreaType::RightBottom);
        assert_eq!(classify_touch(0, H), AreaType::LeftBottom);
    }

    #[test]
    fn test_corner_band_takes_priority_over_edge_band() {
        // x=3 is inside the left edge band, y=10 inside the corner band only.
        assert_eq!(classify_touch(3, 10), AreaType::LeftTop);
    }

    #[test]
    fn test_corner_band_is_wider_than_edge_band() {
        // x=10 is past the 5px edge band but inside the 16px corner band.
        assert_eq!(classify_touch(10, 400), AreaType::Undefined);
        assert_eq!(classify_touch(10, 10), AreaType::LeftTop);
    }

    #[test]
    fn test_touch_outer_band_is_wider_than_mouse() {
        // 10px outside the left edge: within touch (24) but not mouse (4).
        assert_eq!(classify_touch(-10, 400), AreaType::Left);
        assert_eq!(classify_mouse(-10, 400), AreaType::Undefined);
    }

    #[test]
    fn test_far_outside_point_is_undefined() {
        assert_eq!(classify_touch(-100, 400), AreaType::Undefined);
        assert_eq!(classify_touch(500, H + 100), AreaType::Undefined);
    }

    #[test]
    fn test_bands_scale_with_vpr() {
        let cfg = HotZoneConfig::default();
        // 8px inside is outside the edge band at vpr 1 but inside at vpr 2.
        assert_eq!(
            cfg.classify(Point::new(8, 400), W, H, SourceType::Mouse, 1.0),
            AreaType::Undefined
        );
        assert_eq!(
            cfg.classify(Point::new(8, 400), W, H, SourceType::Mouse, 2.0),
            AreaType::Left
        );
    }

    // ── Derived properties ────────────────────────────────────────────────────

    #[test]
    fn test_bits_of_corners_combine_sides() {
        assert_eq!(AreaType::LeftTop.bits(), AREA_LEFT | AREA_TOP);
        assert!(AreaType::RightBottom.touches(AREA_RIGHT));
        assert!(!AreaType::RightBottom.touches(AREA_LEFT));
    }

    #[test]
    fn test_cursor_style_per_drag_type() {
        assert_eq!(AreaType::Left.drag_type().cursor_style(), CursorStyle::WestEast);
        assert_eq!(AreaType::Bottom.drag_type().cursor_style(), CursorStyle::NorthSouth);
        assert_eq!(
            AreaType::RightBottom.drag_type().cursor_style(),
            CursorStyle::NorthWestSouthEast
        );
        assert_eq!(
            AreaType::LeftBottom.drag_type().cursor_style(),
            CursorStyle::NorthEastSouthWest
        );
        assert_eq!(AreaType::Undefined.drag_type().cursor_style(), CursorStyle::Default);
    }

    #[test]
    fn test_cursor_platform_ids_are_distinct() {
        let ids = [
            CursorStyle::Default,
            CursorStyle::NorthSouth,
            CursorStyle::WestEast,
            CursorStyle::NorthWestSouthEast,
            CursorStyle::NorthEastSouthWest,
        ]
        .map(CursorStyle::platform_id);
        let mut sorted = ids.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 5);
    }
}
