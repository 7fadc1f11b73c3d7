//! Incremental move/drag geometry.
//!
//! Every function here is pure: it takes the gesture's starting state and the
//! current pointer delta and returns the rectangle the window should occupy.
//! [`GestureSession`] bundles the per-gesture values (original rect, hot-zone
//! area, dominant axis, translate limits) so the controller in `dms-server`
//! can thread one value through the computation instead of mutating a dozen
//! loose fields.
//!
//! # Two resize modes
//!
//! - **Free-form**: the pointer delta is clamped per axis to the window's
//!   min/max size, applied to whichever sides the area touches, and the
//!   result is snapped back inside `[min_ratio, max_ratio]` if needed.
//! - **Fixed aspect ratio**: the first non-zero delta picks a dominant axis
//!   (edges force their natural axis). From then on the other axis is derived
//!   from the dominant one through the ratio, with a per-area sign.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::area::{AreaType, AREA_BOTTOM, AREA_LEFT, AREA_RIGHT, AREA_TOP};
use crate::domain::geometry::{near_zero, Decoration, Point, Rect, WindowLimits, FLOAT_EPSILON};
use crate::domain::pointer::SourceType;

/// Pointer id stored while no pointer is latched; matches any pointer.
pub const UNLATCHED_POINTER_ID: i32 = -1;

const POSITIVE_CORRELATION: i32 = 1;
const NEGATIVE_CORRELATION: i32 = -1;

/// The axis whose delta drives a fixed-ratio resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AxisType {
    #[default]
    Undefined,
    X,
    Y,
}

/// Inclusive bounds on the pointer delta along each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslateLimits {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
}

impl Default for TranslateLimits {
    fn default() -> Self {
        Self {
            min_x: i32::MIN,
            max_x: i32::MAX,
            min_y: i32::MIN,
            max_y: i32::MAX,
        }
    }
}

impl TranslateLimits {
    /// Clamps a delta into the limits.
    ///
    /// When a limit pair is inverted (min above max, which happens when the
    /// window already violates its own limits) the max wins, matching a
    /// "clamp low, then clamp high" reading.
    pub fn clamp(&self, tx: i32, ty: i32) -> (i32, i32) {
        (
            tx.max(self.min_x).min(self.max_x),
            ty.max(self.min_y).min(self.max_y),
        )
    }
}

/// State captured when a gesture starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveDragProperty {
    /// Latched pointer; [`UNLATCHED_POINTER_ID`] while empty.
    pub pointer_id: i32,
    pub pointer_source: Option<SourceType>,
    /// Pointer position in display space at gesture start.
    pub origin_pointer: Point,
    /// Pointer position in window space at gesture start.
    pub origin_pointer_window: Point,
    pub original_rect: Rect,
    pub target_rect: Rect,
}

impl Default for MoveDragProperty {
    fn default() -> Self {
        Self {
            pointer_id: UNLATCHED_POINTER_ID,
            pointer_source: None,
            origin_pointer: Point::default(),
            origin_pointer_window: Point::default(),
            original_rect: Rect::default(),
            target_rect: Rect::default(),
        }
    }
}

impl MoveDragProperty {
    /// Captures a gesture start.
    pub fn latch(
        pointer_id: i32,
        source: SourceType,
        origin_pointer: Point,
        origin_pointer_window: Point,
        original_rect: Rect,
    ) -> Self {
        Self {
            pointer_id,
            pointer_source: Some(source),
            origin_pointer,
            origin_pointer_window,
            original_rect,
            target_rect: original_rect,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pointer_id == UNLATCHED_POINTER_ID && self.pointer_source.is_none()
    }

    /// `true` when the event's pointer may drive this gesture.
    pub fn accepts(&self, pointer_id: i32, source: SourceType) -> bool {
        if self.pointer_id == UNLATCHED_POINTER_ID {
            return true;
        }
        self.pointer_id == pointer_id && self.pointer_source.map_or(true, |s| s == source)
    }

    /// Delta of `pointer` from the gesture origin.
    pub fn translation(&self, pointer: Point) -> (i32, i32) {
        (
            pointer.x - self.origin_pointer.x,
            pointer.y - self.origin_pointer.y,
        )
    }
}

fn great_not_equal(a: f32, b: f32) -> bool {
    a - b > FLOAT_EPSILON
}

fn less_not_equal(a: f32, b: f32) -> bool {
    b - a > FLOAT_EPSILON
}

// ── Translate limits ──────────────────────────────────────────────────────────

/// Delta bounds for a free-form resize of `original` from `area`.
///
/// LEFT/RIGHT bound X independently of TOP/BOTTOM bounding Y. Axes the area
/// does not touch stay unbounded.
pub fn freeform_translate_limits(area: AreaType, original: Rect, limits: &WindowLimits) -> TranslateLimits {
    let mut out = TranslateLimits::default();
    let (orig_w, orig_h) = (original.width, original.height);
    if area.touches(AREA_LEFT) {
        out.min_x = orig_w.saturating_sub(limits.max_width);
        out.max_x = orig_w.saturating_sub(limits.min_width);
    } else if area.touches(AREA_RIGHT) {
        out.min_x = limits.min_width.saturating_sub(orig_w);
        out.max_x = limits.max_width.saturating_sub(orig_w);
    }
    if area.touches(AREA_TOP) {
        out.min_y = orig_h.saturating_sub(limits.max_height);
        out.max_y = orig_h.saturating_sub(limits.min_height);
    } else if area.touches(AREA_BOTTOM) {
        out.min_y = limits.min_height.saturating_sub(orig_h);
        out.max_y = limits.max_height.saturating_sub(orig_h);
    }
    out
}

/// Tightens `limits` so every size inside them can hold `aspect_ratio`.
///
/// With decoration the ratio applies to the content area, so the limits are
/// first moved into content space (decoration subtracted), tightened, then
/// moved back.  `decoration_px` is `(horizontal, vertical)` in pixels.
pub fn adjust_limits_by_aspect_ratio(
    limits: &WindowLimits,
    decoration_px: Option<(i32, i32)>,
    aspect_ratio: f32,
) -> WindowLimits {
    if near_zero(aspect_ratio) {
        return *limits;
    }
    let (deco_w, deco_h) = decoration_px.unwrap_or((0, 0));

    let min_w = limits.min_width.saturating_sub(deco_w).max(1);
    let max_w = limits.max_width.saturating_sub(deco_w).max(min_w);
    let min_h = limits.min_height.saturating_sub(deco_h).max(1);
    let max_h = limits.max_height.saturating_sub(deco_h).max(min_h);

    let ratio_min_w = min_w.max((min_h as f32 * aspect_ratio) as i32);
    let ratio_max_w = max_w.min((max_h as f32 * aspect_ratio) as i32);
    let ratio_min_h = min_h.max((min_w as f32 / aspect_ratio) as i32);
    let ratio_max_h = max_h.min((max_w as f32 / aspect_ratio) as i32);

    WindowLimits {
        min_width: ratio_min_w.saturating_add(deco_w),
        max_width: ratio_max_w.saturating_add(deco_w),
        min_height: ratio_min_h.saturating_add(deco_h),
        max_height: ratio_max_h.saturating_add(deco_h),
        ..*limits
    }
}

/// Resizes `rect` in place (top-left fixed) so its content area holds
/// `aspect_ratio`.
///
/// The width is kept where the ratio-adjusted limits allow it and the height
/// follows; when that height falls outside the limits the height is clamped
/// and the width follows instead.  A zero ratio or an empty content area
/// returns `rect` unchanged.
pub fn adjust_rect_by_aspect_ratio(
    rect: Rect,
    limits: &WindowLimits,
    decoration_px: Option<(i32, i32)>,
    aspect_ratio: f32,
) -> Rect {
    if near_zero(aspect_ratio) {
        return rect;
    }
    let (deco_w, deco_h) = decoration_px.unwrap_or((0, 0));
    if rect.width <= deco_w || rect.height <= deco_h {
        return rect;
    }
    let adjusted = adjust_limits_by_aspect_ratio(limits, decoration_px, aspect_ratio);

    let width = rect.width.clamp(adjusted.min_width, adjusted.max_width.max(adjusted.min_width));
    let height = ((width - deco_w) as f32 / aspect_ratio) as i32 + deco_h;
    let (width, height) = if height < adjusted.min_height || height > adjusted.max_height {
        let height = height.clamp(adjusted.min_height, adjusted.max_height.max(adjusted.min_height));
        (((height - deco_h) as f32 * aspect_ratio) as i32 + deco_w, height)
    } else {
        (width, height)
    };
    Rect { width, height, ..rect }
}

/// Delta bounds for a fixed-ratio resize, computed from already-adjusted
/// limits (see [`adjust_limits_by_aspect_ratio`]).
pub fn fixed_ratio_translate_limits(area: AreaType, original: Rect, adjusted: &WindowLimits) -> TranslateLimits {
    let (orig_w, orig_h) = (original.width, original.height);
    let (min_w, max_w) = (adjusted.min_width, adjusted.max_width);
    let (min_h, max_h) = (adjusted.min_height, adjusted.max_height);

    let shrink_x = (orig_w.saturating_sub(max_w), orig_w.saturating_sub(min_w));
    let grow_x = (min_w.saturating_sub(orig_w), max_w.saturating_sub(orig_w));
    let shrink_y = (orig_h.saturating_sub(max_h), orig_h.saturating_sub(min_h));
    let grow_y = (min_h.saturating_sub(orig_h), max_h.saturating_sub(orig_h));

    let (x, y) = match area {
        AreaType::Left | AreaType::LeftBottom => (shrink_x, grow_y),
        AreaType::LeftTop => (shrink_x, shrink_y),
        AreaType::Right | AreaType::RightBottom | AreaType::Bottom => (grow_x, grow_y),
        AreaType::RightTop | AreaType::Top => (grow_x, shrink_y),
        AreaType::Undefined => {
            debug!("fixed-ratio limits requested for undefined area");
            return TranslateLimits::default();
        }
    };
    TranslateLimits {
        min_x: x.0,
        max_x: x.1,
        min_y: y.0,
        max_y: y.1,
    }
}

// ── Target rectangles ─────────────────────────────────────────────────────────

/// Free-form resize of `original` by `(tx, ty)` from `area`.
pub fn freeform_target_rect(
    area: AreaType,
    tx: i32,
    ty: i32,
    original: Rect,
    translate: &TranslateLimits,
    limits: &WindowLimits,
) -> Rect {
    let (tx, ty) = translate.clamp(tx, ty);
    let mut target = original;
    if area.touches(AREA_LEFT) {
        target.pos_x += tx;
        target.width -= tx;
    } else if area.touches(AREA_RIGHT) {
        target.width += tx;
    }
    if area.touches(AREA_TOP) {
        target.pos_y += ty;
        target.height -= ty;
    } else if area.touches(AREA_BOTTOM) {
        target.height += ty;
    }

    if target.height == 0 {
        return target;
    }
    let cur_ratio = target.width as f32 / target.height as f32;
    if !great_not_equal(limits.min_ratio, cur_ratio) && !great_not_equal(cur_ratio, limits.max_ratio) {
        return target;
    }
    let new_ratio = if less_not_equal(cur_ratio, limits.min_ratio) {
        limits.min_ratio
    } else {
        limits.max_ratio
    };
    if near_zero(new_ratio) {
        return target;
    }
    if area.touches(AREA_LEFT) || area.touches(AREA_RIGHT) {
        target.height = (target.width as f32 / new_ratio) as i32;
    } else {
        target.width = (target.height as f32 * new_ratio) as i32;
    }
    target
}

/// Picks the dominant axis for a fixed-ratio resize.
///
/// Pure edges force their natural axis. Corners pick the axis with the larger
/// absolute delta; a zero delta leaves the axis undecided (`None`).
pub fn init_main_axis(area: AreaType, tx: i32, ty: i32) -> Option<AxisType> {
    match area {
        AreaType::Left | AreaType::Right => Some(AxisType::X),
        AreaType::Top | AreaType::Bottom => Some(AxisType::Y),
        _ if tx == 0 && ty == 0 => None,
        _ if tx.abs() > ty.abs() => Some(AxisType::X),
        _ => Some(AxisType::Y),
    }
}

/// Sign applied to the derived delta for each area.
pub fn area_correlation(area: AreaType) -> i32 {
    match area {
        AreaType::Left => NEGATIVE_CORRELATION,
        AreaType::Right => POSITIVE_CORRELATION,
        AreaType::Top => NEGATIVE_CORRELATION,
        AreaType::Bottom => POSITIVE_CORRELATION,
        AreaType::LeftTop => POSITIVE_CORRELATION,
        AreaType::RightTop => NEGATIVE_CORRELATION,
        AreaType::LeftBottom => NEGATIVE_CORRELATION,
        AreaType::RightBottom => POSITIVE_CORRELATION,
        AreaType::Undefined => POSITIVE_CORRELATION,
    }
}

/// Replaces the non-dominant delta with one derived through the ratio.
pub fn convert_by_aspect_ratio(axis: AxisType, area: AreaType, tx: i32, ty: i32, aspect_ratio: f32) -> (i32, i32) {
    match axis {
        AxisType::X => {
            let derived = (tx as f32 / aspect_ratio) as i32;
            (tx, derived * area_correlation(area))
        }
        AxisType::Y => {
            let derived = (ty as f32 * aspect_ratio) as i32;
            (derived * area_correlation(area), ty)
        }
        AxisType::Undefined => (tx, ty),
    }
}

/// Fixed-ratio resize once the dominant axis is known.
pub fn fixed_ratio_target_rect(
    area: AreaType,
    axis: AxisType,
    tx: i32,
    ty: i32,
    aspect_ratio: f32,
    original: Rect,
    translate: &TranslateLimits,
) -> Rect {
    let (tx, ty) = convert_by_aspect_ratio(axis, area, tx, ty, aspect_ratio);
    let (tx, ty) = translate.clamp(tx, ty);
    let Rect {
        pos_x: x,
        pos_y: y,
        width: w,
        height: h,
    } = original;
    match area {
        AreaType::LeftTop => Rect::new(x + tx, y + ty, w - tx, h - ty),
        AreaType::RightTop => Rect::new(x, y + ty, w + tx, h - ty),
        AreaType::RightBottom => Rect::new(x, y, w + tx, h + ty),
        AreaType::LeftBottom => Rect::new(x + tx, y, w - tx, h + ty),
        AreaType::Left => Rect::new(x + tx, y, w - tx, h + ty),
        AreaType::Top => Rect::new(x, y + ty, w + tx, h - ty),
        AreaType::Right | AreaType::Bottom => Rect::new(x, y, w + tx, h + ty),
        AreaType::Undefined => original,
    }
}

/// Window position for a move: the original rect translated by the pointer
/// delta, keeping its size.
pub fn move_target_rect(property: &MoveDragProperty, pointer: Point) -> Rect {
    let (tx, ty) = property.translation(pointer);
    let original = property.original_rect;
    original.moved_to(original.pos_x + tx, original.pos_y + ty)
}

// ── Gesture session ───────────────────────────────────────────────────────────

/// Everything one move or drag gesture needs, as a single value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureSession {
    pub property: MoveDragProperty,
    pub area: AreaType,
    pub axis: AxisType,
    pub aspect_ratio: f32,
    pub limits: WindowLimits,
    /// Decoration in pixels `(horizontal, vertical)` when decoration is on.
    pub decoration_px: Option<(i32, i32)>,
    pub translate: TranslateLimits,
}

impl GestureSession {
    /// Starts a move gesture.
    pub fn for_move(property: MoveDragProperty) -> Self {
        Self {
            property,
            area: AreaType::Undefined,
            axis: AxisType::Undefined,
            aspect_ratio: 0.0,
            limits: WindowLimits::default(),
            decoration_px: None,
            translate: TranslateLimits::default(),
        }
    }

    /// Starts a resize gesture from `area`.
    ///
    /// Free-form limits are known immediately. Fixed-ratio limits wait until
    /// the dominant axis is chosen on the first non-zero delta.
    pub fn for_drag(
        property: MoveDragProperty,
        area: AreaType,
        aspect_ratio: f32,
        limits: WindowLimits,
        decoration: Option<Decoration>,
        vpr: f32,
    ) -> Self {
        let mut property = property;
        let decoration_px = decoration.map(|d| (d.horizontal_px(vpr), d.vertical_px(vpr)));
        let translate = if near_zero(aspect_ratio) {
            freeform_translate_limits(area, property.original_rect, &limits)
        } else {
            // Fixed-ratio deltas are only ratio-preserving from an on-ratio start.
            property.original_rect =
                adjust_rect_by_aspect_ratio(property.original_rect, &limits, decoration_px, aspect_ratio);
            TranslateLimits::default()
        };
        Self {
            property,
            area,
            axis: AxisType::Undefined,
            aspect_ratio,
            limits,
            decoration_px,
            translate,
        }
    }

    pub fn is_fixed_ratio(&self) -> bool {
        !near_zero(self.aspect_ratio)
    }

    /// Computes and records the move target for the current pointer.
    pub fn move_target(&mut self, pointer: Point) -> Rect {
        let target = move_target_rect(&self.property, pointer);
        self.property.target_rect = target;
        target
    }

    /// Computes and records the resize target for the current pointer.
    pub fn drag_target(&mut self, pointer: Point) -> Rect {
        let (tx, ty) = self.property.translation(pointer);
        let original = self.property.original_rect;
        let target = if self.is_fixed_ratio() {
            if self.axis == AxisType::Undefined {
                match init_main_axis(self.area, tx, ty) {
                    Some(axis) => {
                        self.axis = axis;
                        let adjusted =
                            adjust_limits_by_aspect_ratio(&self.limits, self.decoration_px, self.aspect_ratio);
                        self.translate = fixed_ratio_translate_limits(self.area, original, &adjusted);
                        debug!(?axis, area = ?self.area, "fixed-ratio drag axis chosen");
                    }
                    None => {
                        self.property.target_rect = original;
                        return original;
                    }
                }
            }
            fixed_ratio_target_rect(self.area, self.axis, tx, ty, self.aspect_ratio, original, &self.translate)
        } else {
            freeform_target_rect(self.area, tx, ty, original, &self.translate, &self.limits)
        };
        self.property.target_rect = target;
        target
    }
}
