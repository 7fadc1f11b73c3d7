//! Move/drag controller: turns a window's pointer stream into target rects.
//!
//! # State machine (for beginners)
//!
//! ```text
//!          MOVE while start-move flag set
//!   IDLE ─────────────────────────────────► MOVING
//!    │ ▲                                      │
//!    │ └──────── UP / BUTTON_UP / CANCEL ─────┘
//!    │ ▲
//!    │ └──────── UP / BUTTON_UP / CANCEL ─────┐
//!    │  DOWN in a border hot zone             │
//!    └─────────────────────────────────► DRAGGING
//! ```
//!
//! The first pointer that starts a gesture is latched.  Events from any other
//! pointer id (or device class) are ignored until the gesture ends, so a
//! second finger cannot disturb a running move.  Mouse events only count
//! when they come from the left button.
//!
//! The geometry itself lives in [`dms_core::gesture::solver`]; this module
//! owns the event handling and the frame pacing.
//!
//! # Frame pacing
//!
//! Intermediate rects (`DragStart`, `Drag`, `DragMove`) are not delivered
//! straight away.  The controller keeps only the most recent one and asks the
//! [`VsyncStation`] for a single callback; when the frame fires, the listener
//! receives whatever rect is newest.  The final `DragEnd` rect is delivered
//! immediately and discards anything still pending.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use dms_core::{
    AreaType, CursorStyle, Decoration, DmError, GestureSession, HotZoneConfig, MoveDragProperty,
    PersistentId, Point, PointerAction, PointerEvent, Rect, SourceType, WindowLimits,
};
use tracing::{debug, info, trace, warn};

use super::session_lifecycle::SizeChangeReason;
use crate::infrastructure::vsync::VsyncStation;

/// Virtual pixel ratio assumed when the window's display is unknown.
pub const DEFAULT_FALLBACK_VPR: f32 = 1.5;

// ── Collaborators ─────────────────────────────────────────────────────────────

/// Receives the rects produced by a gesture.
#[cfg_attr(test, mockall::automock)]
pub trait MoveDragListener: Send + Sync {
    fn on_rect_change(&self, persistent_id: PersistentId, rect: Rect, reason: SizeChangeReason);
}

/// Applies a cursor shape to the pointer hovering a window.
#[cfg_attr(test, mockall::automock)]
pub trait PointerStyleSink: Send + Sync {
    /// # Errors
    ///
    /// [`DmError::IpcFailed`] when the pointer service rejects the request.
    fn set_pointer_style(&self, persistent_id: PersistentId, style: CursorStyle) -> Result<(), DmError>;
}

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Moving,
    Dragging,
}

/// What the controller needs to know about the window when a resize starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowContext {
    pub rect: Rect,
    /// `None` when the window is not on any display yet.
    pub vpr: Option<f32>,
    /// `width / height` to preserve, or `0.0` for free-form resizing.
    pub aspect_ratio: f32,
    pub limits: WindowLimits,
    pub decoration: Option<Decoration>,
}

impl WindowContext {
    pub fn free_form(rect: Rect, limits: WindowLimits) -> Self {
        Self {
            rect,
            vpr: Some(1.0),
            aspect_ratio: 0.0,
            limits,
            decoration: None,
        }
    }
}

/// Pointer positions remembered between events, independent of any gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveTempProperty {
    pub last_down: Option<Point>,
    pub last_move: Option<Point>,
}

impl MoveTempProperty {
    pub fn is_empty(&self) -> bool {
        self.last_down.is_none() && self.last_move.is_none()
    }

    fn update(&mut self, event: &PointerEvent) {
        match event.action {
            action if action.is_down() => {
                self.last_down = Some(event.display_pos);
                self.last_move = Some(event.display_pos);
            }
            PointerAction::Move => self.last_move = Some(event.display_pos),
            action if action.is_release() => *self = Self::default(),
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingUpdate {
    rect: Rect,
    reason: SizeChangeReason,
}

// ── Controller ────────────────────────────────────────────────────────────────

/// Per-window gesture controller.  One instance belongs to one window session.
pub struct MoveDragController {
    persistent_id: PersistentId,
    hot_zone: HotZoneConfig,
    fallback_vpr: f32,
    state: GestureState,
    start_move: bool,
    has_point_down: bool,
    gesture: Option<GestureSession>,
    move_temp: MoveTempProperty,
    mouse_style: CursorStyle,
    pending: Arc<Mutex<Option<PendingUpdate>>>,
    frame_requested: Arc<AtomicBool>,
    vsync: Arc<dyn VsyncStation>,
    listener: Arc<dyn MoveDragListener>,
    style_sink: Option<Arc<dyn PointerStyleSink>>,
}

impl MoveDragController {
    pub fn new(
        persistent_id: PersistentId,
        vsync: Arc<dyn VsyncStation>,
        listener: Arc<dyn MoveDragListener>,
    ) -> Self {
        Self {
            persistent_id,
            hot_zone: HotZoneConfig::default(),
            fallback_vpr: DEFAULT_FALLBACK_VPR,
            state: GestureState::Idle,
            start_move: false,
            has_point_down: false,
            gesture: None,
            move_temp: MoveTempProperty::default(),
            mouse_style: CursorStyle::Default,
            pending: Arc::new(Mutex::new(None)),
            frame_requested: Arc::new(AtomicBool::new(false)),
            vsync,
            listener,
            style_sink: None,
        }
    }

    pub fn with_hot_zone(mut self, hot_zone: HotZoneConfig, fallback_vpr: f32) -> Self {
        self.hot_zone = hot_zone;
        self.fallback_vpr = fallback_vpr;
        self
    }

    pub fn with_style_sink(mut self, sink: Arc<dyn PointerStyleSink>) -> Self {
        self.style_sink = Some(sink);
        self
    }

    pub fn persistent_id(&self) -> PersistentId {
        self.persistent_id
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    /// Set by the session's gesture policy (for example a title-bar press).
    ///
    /// Starting a move needs a recorded pointer-down and no running resize;
    /// otherwise the request is ignored.  Clearing is always accepted.
    pub fn set_start_move(&mut self, start: bool) {
        if start && (!self.has_point_down || self.state == GestureState::Dragging) {
            debug!(
                window = self.persistent_id,
                has_point_down = self.has_point_down,
                state = ?self.state,
                "start-move ignored"
            );
            return;
        }
        debug!(window = self.persistent_id, start, "start-move flag");
        self.start_move = start;
    }

    pub fn is_start_move(&self) -> bool {
        self.start_move
    }

    pub fn has_point_down(&self) -> bool {
        self.has_point_down
    }

    /// The latched gesture data, `None` while idle.
    pub fn property(&self) -> Option<&MoveDragProperty> {
        self.gesture.as_ref().map(|g| &g.property)
    }

    pub fn target_rect(&self) -> Option<Rect> {
        self.property().map(|p| p.target_rect)
    }

    pub fn move_temp(&self) -> MoveTempProperty {
        self.move_temp
    }

    fn accepts(&self, event: &PointerEvent) -> bool {
        self.gesture
            .as_ref()
            .map_or(true, |g| g.property.accepts(event.pointer_id, event.source))
    }

    // ── Move ──────────────────────────────────────────────────────────────────

    /// Feeds one pointer event to the move gesture.
    ///
    /// Returns `true` when the event was consumed by a running move and must
    /// not reach the window content.
    pub fn consume_move_event(&mut self, event: &PointerEvent, original_rect: Rect) -> bool {
        if self.state == GestureState::Dragging {
            debug!(window = self.persistent_id, "move event ignored while resizing");
            return false;
        }
        if !self.accepts(event) {
            debug!(
                window = self.persistent_id,
                pointer = event.pointer_id,
                "move event from a different pointer ignored"
            );
            return false;
        }
        if !self.start_move && event.is_invalid_mouse_event() {
            return false;
        }

        self.move_temp.update(event);

        if !self.start_move {
            if event.action.is_down() {
                self.has_point_down = true;
            } else if event.action.is_release() {
                self.has_point_down = false;
            }
            return false;
        }

        match event.action {
            PointerAction::Move => self.handle_moving(event, original_rect),
            action if action.is_down() || action.is_release() => self.handle_move_end(event),
            _ => false,
        }
    }

    fn handle_moving(&mut self, event: &PointerEvent, original_rect: Rect) -> bool {
        match self.gesture.as_mut() {
            None => {
                // The window may have moved since `original_rect` was taken,
                // so its position is recovered from the pointer itself.
                let origin = Rect::new(
                    event.display_pos.x - event.window_pos.x,
                    event.display_pos.y - event.window_pos.y,
                    original_rect.width,
                    original_rect.height,
                );
                let property = MoveDragProperty::latch(
                    event.pointer_id,
                    event.source,
                    event.display_pos,
                    event.window_pos,
                    origin,
                );
                self.gesture = Some(GestureSession::for_move(property));
                self.state = GestureState::Moving;
                info!(window = self.persistent_id, pointer = event.pointer_id, ?origin, "move started");
            }
            Some(gesture) => {
                let rect = gesture.move_target(event.display_pos);
                self.schedule(rect, SizeChangeReason::DragMove);
            }
        }
        true
    }

    fn handle_move_end(&mut self, event: &PointerEvent) -> bool {
        if !self.has_point_down {
            return true;
        }
        self.start_move = false;
        self.has_point_down = false;
        if let Some(mut gesture) = self.gesture.take() {
            let rect = gesture.move_target(event.display_pos);
            info!(window = self.persistent_id, ?rect, "move ended");
            self.deliver_now(rect, SizeChangeReason::DragEnd);
        }
        self.state = GestureState::Idle;
        // The release still goes to the window content.
        false
    }

    // ── Drag (resize) ─────────────────────────────────────────────────────────

    /// Feeds one pointer event to the resize gesture.
    ///
    /// Returns `true` when the event started or belongs to a resize.
    pub fn consume_drag_event(&mut self, event: &PointerEvent, window: &WindowContext) -> bool {
        if self.start_move || self.state == GestureState::Moving {
            debug!(window = self.persistent_id, "drag event ignored while moving");
            return false;
        }
        if event.is_invalid_mouse_event() {
            return false;
        }
        if !self.accepts(event) {
            debug!(
                window = self.persistent_id,
                pointer = event.pointer_id,
                "drag event from a different pointer ignored"
            );
            return false;
        }

        match event.action {
            action if action.is_down() => self.handle_drag_start(event, window),
            PointerAction::Move if self.state == GestureState::Dragging => {
                if let Some(gesture) = self.gesture.as_mut() {
                    let rect = gesture.drag_target(event.display_pos);
                    self.schedule(rect, SizeChangeReason::Drag);
                }
                true
            }
            action if action.is_release() && self.state == GestureState::Dragging => {
                self.handle_drag_end(event)
            }
            _ => false,
        }
    }

    fn handle_drag_start(&mut self, event: &PointerEvent, window: &WindowContext) -> bool {
        if self.state == GestureState::Dragging {
            return true;
        }
        let vpr = window.vpr.unwrap_or(self.fallback_vpr);
        let area = self.hot_zone.classify(
            event.window_pos,
            window.rect.width,
            window.rect.height,
            event.source,
            vpr,
        );
        if area == AreaType::Undefined {
            return false;
        }

        let property = MoveDragProperty::latch(
            event.pointer_id,
            event.source,
            event.display_pos,
            event.window_pos,
            window.rect,
        );
        let mut gesture = GestureSession::for_drag(
            property,
            area,
            window.aspect_ratio,
            window.limits,
            window.decoration,
            vpr,
        );
        let rect = gesture.drag_target(event.display_pos);
        self.gesture = Some(gesture);
        self.state = GestureState::Dragging;
        self.has_point_down = true;
        self.move_temp.update(event);
        info!(window = self.persistent_id, ?area, pointer = event.pointer_id, "drag started");
        self.schedule(rect, SizeChangeReason::DragStart);
        true
    }

    fn handle_drag_end(&mut self, event: &PointerEvent) -> bool {
        self.has_point_down = false;
        self.move_temp.update(event);
        if let Some(mut gesture) = self.gesture.take() {
            let rect = gesture.drag_target(event.display_pos);
            info!(window = self.persistent_id, ?rect, "drag ended");
            self.deliver_now(rect, SizeChangeReason::DragEnd);
        }
        self.state = GestureState::Idle;
        true
    }

    /// Ends a running gesture without waiting for the pointer, for example
    /// when the display under the window goes away.
    ///
    /// With `reset_position` the window returns to where the gesture began.
    /// Returns `false` when no gesture was running.
    pub fn interrupt(&mut self, reset_position: bool) -> bool {
        if self.state == GestureState::Idle {
            return false;
        }
        warn!(window = self.persistent_id, state = ?self.state, "move/drag interrupted");
        self.start_move = false;
        self.has_point_down = false;
        self.state = GestureState::Idle;
        if let Some(gesture) = self.gesture.take() {
            let property = gesture.property;
            let rect = if reset_position {
                property.original_rect
            } else {
                property.target_rect
            };
            self.deliver_now(rect, SizeChangeReason::DragEnd);
        }
        true
    }

    // ── Cursor ────────────────────────────────────────────────────────────────

    /// Updates the cursor shape for a mouse hovering `window_rect`.
    ///
    /// Returns `true` when a new style was applied.
    pub fn handle_mouse_style(&mut self, event: &PointerEvent, window_rect: Rect, vpr: Option<f32>) -> bool {
        if event.source != SourceType::Mouse {
            return false;
        }
        if !matches!(
            event.action,
            PointerAction::Move | PointerAction::ButtonDown | PointerAction::ButtonUp
        ) {
            return false;
        }
        // The resize cursor stays put for the whole drag.
        if self.state == GestureState::Dragging {
            return false;
        }
        let Some(sink) = self.style_sink.as_ref() else {
            return false;
        };

        let vpr = vpr.unwrap_or(self.fallback_vpr);
        let style = self
            .hot_zone
            .classify(event.window_pos, window_rect.width, window_rect.height, SourceType::Mouse, vpr)
            .drag_type()
            .cursor_style();
        if style == self.mouse_style {
            return false;
        }
        match sink.set_pointer_style(self.persistent_id, style) {
            Ok(()) => {
                debug!(window = self.persistent_id, ?style, id = style.platform_id(), "cursor style changed");
                self.mouse_style = style;
                true
            }
            Err(e) => {
                warn!(window = self.persistent_id, error = %e, "failed to set cursor style");
                false
            }
        }
    }

    pub fn mouse_style(&self) -> CursorStyle {
        self.mouse_style
    }

    // ── Full screen → floating ────────────────────────────────────────────────

    /// Where a full-screen window of `original` should float as `window`
    /// sized, keeping the last pointer-down at the same relative x.
    pub fn full_screen_to_floating_rect(&self, original: Rect, window: Rect) -> Rect {
        let Some(down) = self.move_temp.last_down else {
            debug!(window = self.persistent_id, "no pointer-down recorded");
            return original;
        };
        if original.width == 0 {
            return window;
        }
        let offset = window.width as f32 / original.width as f32 * (down.x - original.pos_x) as f32;
        Rect::new(down.x - offset as i32, original.pos_y, window.width, window.height)
    }

    // ── Frame pacing ──────────────────────────────────────────────────────────

    fn schedule(&self, rect: Rect, reason: SizeChangeReason) {
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(PendingUpdate { rect, reason });
        if self.frame_requested.swap(true, Ordering::AcqRel) {
            trace!(window = self.persistent_id, "rect coalesced into pending frame");
            return;
        }

        let pending = Arc::clone(&self.pending);
        let requested = Arc::clone(&self.frame_requested);
        let listener = Arc::clone(&self.listener);
        let id = self.persistent_id;
        self.vsync.request_next_vsync(Box::new(move |timestamp| {
            requested.store(false, Ordering::Release);
            let update = pending.lock().unwrap_or_else(PoisonError::into_inner).take();
            if let Some(update) = update {
                trace!(window = id, timestamp, rect = ?update.rect, "frame rect delivered");
                listener.on_rect_change(id, update.rect, update.reason);
            }
        }));
    }

    fn deliver_now(&self, rect: Rect, reason: SizeChangeReason) {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).take();
        self.listener.on_rect_change(self.persistent_id, rect, reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::vsync::mock::ManualVsyncStation;
    use dms_core::MouseButton;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(PersistentId, Rect, SizeChangeReason)>>,
    }

    impl Recorder {
        fn calls(&self) -> Vec<(PersistentId, Rect, SizeChangeReason)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl MoveDragListener for Recorder {
        fn on_rect_change(&self, persistent_id: PersistentId, rect: Rect, reason: SizeChangeReason) {
            self.calls.lock().unwrap().push((persistent_id, rect, reason));
        }
    }

    fn setup() -> (MoveDragController, Arc<ManualVsyncStation>, Arc<Recorder>) {
        let vsync = Arc::new(ManualVsyncStation::new());
        let recorder = Arc::new(Recorder::default());
        let controller = MoveDragController::new(3, vsync.clone(), recorder.clone());
        (controller, vsync, recorder)
    }

    fn touch(id: i32, action: PointerAction, x: i32, y: i32, rect: Rect) -> PointerEvent {
        PointerEvent::touch(
            id,
            action,
            Point::new(x, y),
            Point::new(x - rect.pos_x, y - rect.pos_y),
        )
    }

    const WINDOW: Rect = Rect {
        pos_x: 100,
        pos_y: 100,
        width: 1000,
        height: 1000,
    };

    fn start_move(controller: &mut MoveDragController) {
        controller.consume_move_event(&touch(0, PointerAction::Down, 500, 120, WINDOW), WINDOW);
        controller.set_start_move(true);
    }

    // ── Move ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_consume_move_event_without_start_flag_only_tracks_point_down() {
        // Arrange
        let (mut controller, vsync, _) = setup();

        // Act
        let consumed = controller.consume_move_event(&touch(0, PointerAction::Down, 500, 120, WINDOW), WINDOW);

        // Assert
        assert!(!consumed);
        assert!(controller.has_point_down());
        assert_eq!(controller.state(), GestureState::Idle);
        assert_eq!(vsync.request_count(), 0);
    }

    #[test]
    fn test_first_move_latches_gesture_from_pointer_position() {
        let (mut controller, vsync, _) = setup();
        start_move(&mut controller);

        let consumed = controller.consume_move_event(&touch(0, PointerAction::Move, 500, 120, WINDOW), Rect::new(0, 0, 1000, 1000));

        assert!(consumed);
        assert_eq!(controller.state(), GestureState::Moving);
        // Position recovered from display - window coordinates, not the stale rect.
        assert_eq!(controller.property().unwrap().original_rect, WINDOW);
        assert_eq!(vsync.request_count(), 0);
    }

    #[test]
    fn test_moves_within_one_frame_coalesce_to_last_rect() {
        // Arrange
        let (mut controller, vsync, recorder) = setup();
        start_move(&mut controller);
        controller.consume_move_event(&touch(0, PointerAction::Move, 500, 120, WINDOW), WINDOW);

        // Act
        controller.consume_move_event(&touch(0, PointerAction::Move, 510, 130, WINDOW), WINDOW);
        controller.consume_move_event(&touch(0, PointerAction::Move, 530, 100, WINDOW), WINDOW);
        let fired = vsync.fire(16);

        // Assert
        assert_eq!(fired, 1);
        assert_eq!(vsync.request_count(), 1);
        assert_eq!(
            recorder.calls(),
            vec![(3, Rect::new(130, 80, 1000, 1000), SizeChangeReason::DragMove)]
        );
    }

    #[test]
    fn test_move_release_delivers_drag_end_immediately_and_drops_pending() {
        let (mut controller, vsync, recorder) = setup();
        start_move(&mut controller);
        controller.consume_move_event(&touch(0, PointerAction::Move, 500, 120, WINDOW), WINDOW);
        controller.consume_move_event(&touch(0, PointerAction::Move, 520, 120, WINDOW), WINDOW);

        let consumed = controller.consume_move_event(&touch(0, PointerAction::Up, 540, 140, WINDOW), WINDOW);

        assert!(!consumed);
        assert_eq!(
            recorder.calls(),
            vec![(3, Rect::new(140, 120, 1000, 1000), SizeChangeReason::DragEnd)]
        );
        assert_eq!(controller.state(), GestureState::Idle);
        assert!(!controller.is_start_move());
        assert!(controller.property().is_none());
        // The frame still fires but has nothing left to deliver.
        vsync.fire(32);
        assert_eq!(recorder.calls().len(), 1);
    }

    #[test]
    fn test_move_ignores_second_pointer_while_active() {
        // Arrange
        let (mut controller, vsync, recorder) = setup();
        start_move(&mut controller);
        controller.consume_move_event(&touch(0, PointerAction::Move, 500, 120, WINDOW), WINDOW);
        let before = *controller.property().unwrap();

        // Act
        let consumed = controller.consume_move_event(&touch(1, PointerAction::Move, 900, 900, WINDOW), WINDOW);
        let released = controller.consume_move_event(&touch(1, PointerAction::Up, 900, 900, WINDOW), WINDOW);

        // Assert
        assert!(!consumed);
        assert!(!released);
        assert_eq!(*controller.property().unwrap(), before);
        assert_eq!(controller.state(), GestureState::Moving);
        assert_eq!(vsync.pending_count(), 0);
        assert!(recorder.calls().is_empty());
    }

    #[test]
    fn test_move_rejects_right_button_before_start() {
        let (mut controller, _, _) = setup();
        let event = PointerEvent::mouse(
            PointerAction::ButtonDown,
            MouseButton::Right,
            Point::new(500, 120),
            Point::new(400, 20),
        );

        assert!(!controller.consume_move_event(&event, WINDOW));
        assert!(!controller.has_point_down());
    }

    #[test]
    fn test_set_start_move_without_point_down_is_ignored() {
        // Arrange
        let (mut controller, _, recorder) = setup();

        // Act
        controller.set_start_move(true);
        let moved = controller.consume_move_event(&touch(0, PointerAction::Move, 500, 120, WINDOW), WINDOW);
        controller.consume_move_event(&touch(0, PointerAction::Move, 520, 140, WINDOW), WINDOW);
        controller.consume_move_event(&touch(0, PointerAction::Up, 520, 140, WINDOW), WINDOW);

        // Assert
        assert!(!controller.is_start_move());
        assert!(!moved);
        assert_eq!(controller.state(), GestureState::Idle);
        assert!(recorder.calls().is_empty());
    }

    #[test]
    fn test_set_start_move_during_drag_is_ignored_and_release_ends_drag() {
        // Arrange
        let (mut controller, _, recorder) = setup();
        let ctx = WindowContext::free_form(WINDOW, WindowLimits::default());
        controller.consume_drag_event(&touch(0, PointerAction::Down, 1100, 1100, WINDOW), &ctx);

        // Act
        controller.set_start_move(true);
        let released = controller.consume_drag_event(&touch(0, PointerAction::Up, 1120, 1120, WINDOW), &ctx);

        // Assert
        assert!(!controller.is_start_move());
        assert!(released);
        assert_eq!(controller.state(), GestureState::Idle);
        let (_, rect, reason) = *recorder.calls().last().unwrap();
        assert_eq!((rect, reason), (Rect::new(100, 100, 1020, 1020), SizeChangeReason::DragEnd));
    }

    #[test]
    fn test_clearing_start_move_is_always_accepted() {
        let (mut controller, _, _) = setup();
        start_move(&mut controller);
        assert!(controller.is_start_move());

        controller.set_start_move(false);

        assert!(!controller.is_start_move());
    }

    // ── Drag ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_drag_down_outside_hot_zone_is_not_consumed() {
        let (mut controller, _, _) = setup();
        let ctx = WindowContext::free_form(WINDOW, WindowLimits::default());

        let consumed = controller.consume_drag_event(&touch(0, PointerAction::Down, 600, 600, WINDOW), &ctx);

        assert!(!consumed);
        assert_eq!(controller.state(), GestureState::Idle);
    }

    #[test]
    fn test_drag_start_schedules_original_rect() {
        let (mut controller, vsync, recorder) = setup();
        let ctx = WindowContext::free_form(WINDOW, WindowLimits::default());

        let consumed = controller.consume_drag_event(&touch(0, PointerAction::Down, 1100, 1100, WINDOW), &ctx);
        vsync.fire(16);

        assert!(consumed);
        assert_eq!(controller.state(), GestureState::Dragging);
        assert_eq!(recorder.calls(), vec![(3, WINDOW, SizeChangeReason::DragStart)]);
    }

    #[test]
    fn test_free_form_left_drag_clamps_to_min_width() {
        // Arrange
        let (mut controller, vsync, recorder) = setup();
        let ctx = WindowContext::free_form(WINDOW, WindowLimits::with_size(500, 1, 2000, 2000));
        controller.consume_drag_event(&touch(0, PointerAction::Down, 100, 600, WINDOW), &ctx);

        // Act: 700px to the right would leave 300px of width.
        controller.consume_drag_event(&touch(0, PointerAction::Move, 800, 600, WINDOW), &ctx);
        vsync.fire(16);

        // Assert
        let (_, rect, reason) = *recorder.calls().last().unwrap();
        assert_eq!(reason, SizeChangeReason::Drag);
        assert_eq!(rect, Rect::new(600, 100, 500, 1000));
    }

    #[test]
    fn test_fixed_ratio_right_bottom_drag_derives_height_from_width() {
        // Arrange
        let (mut controller, vsync, recorder) = setup();
        let ctx = WindowContext {
            aspect_ratio: 1.0,
            ..WindowContext::free_form(WINDOW, WindowLimits::default())
        };
        controller.consume_drag_event(&touch(0, PointerAction::Down, 1100, 1100, WINDOW), &ctx);
        controller.consume_drag_event(&touch(0, PointerAction::Move, 1110, 1105, WINDOW), &ctx);

        // Act
        controller.consume_drag_event(&touch(0, PointerAction::Move, 1150, 1180, WINDOW), &ctx);
        vsync.fire(16);

        // Assert
        let (_, rect, _) = *recorder.calls().last().unwrap();
        assert_eq!(rect, Rect::new(100, 100, 1050, 1050));
    }

    #[test]
    fn test_fixed_ratio_drag_start_snaps_off_ratio_window() {
        // Arrange: a 1000x800 window that must stay square.
        let (mut controller, vsync, recorder) = setup();
        let window = Rect::new(100, 100, 1000, 800);
        let ctx = WindowContext {
            aspect_ratio: 1.0,
            ..WindowContext::free_form(window, WindowLimits::default())
        };

        // Act
        controller.consume_drag_event(&touch(0, PointerAction::Down, 1100, 900, window), &ctx);
        vsync.fire(16);

        // Assert
        assert_eq!(
            recorder.calls(),
            vec![(3, Rect::new(100, 100, 1000, 1000), SizeChangeReason::DragStart)]
        );
    }

    #[test]
    fn test_drag_ignores_other_pointer_until_release() {
        let (mut controller, vsync, recorder) = setup();
        let ctx = WindowContext::free_form(WINDOW, WindowLimits::default());
        controller.consume_drag_event(&touch(0, PointerAction::Down, 1100, 1100, WINDOW), &ctx);
        vsync.fire(16);

        assert!(!controller.consume_drag_event(&touch(4, PointerAction::Move, 1300, 1300, WINDOW), &ctx));
        assert!(!controller.consume_drag_event(&touch(4, PointerAction::Up, 1300, 1300, WINDOW), &ctx));

        assert_eq!(vsync.pending_count(), 0);
        assert_eq!(recorder.calls().len(), 1);
        assert_eq!(controller.state(), GestureState::Dragging);
    }

    #[test]
    fn test_drag_release_returns_to_idle_with_drag_end() {
        let (mut controller, _, recorder) = setup();
        let ctx = WindowContext::free_form(WINDOW, WindowLimits::default());
        controller.consume_drag_event(&touch(0, PointerAction::Down, 1100, 1100, WINDOW), &ctx);

        let consumed = controller.consume_drag_event(&touch(0, PointerAction::Cancel, 1120, 1130, WINDOW), &ctx);

        assert!(consumed);
        assert_eq!(controller.state(), GestureState::Idle);
        assert_eq!(
            recorder.calls(),
            vec![(3, Rect::new(100, 100, 1020, 1030), SizeChangeReason::DragEnd)]
        );
    }

    #[test]
    fn test_drag_event_ignored_while_moving() {
        let (mut controller, _, _) = setup();
        start_move(&mut controller);
        let ctx = WindowContext::free_form(WINDOW, WindowLimits::default());

        assert!(!controller.consume_drag_event(&touch(0, PointerAction::Down, 1100, 1100, WINDOW), &ctx));
    }

    #[test]
    fn test_drag_uses_fallback_vpr_without_display() {
        let (mut controller, _, _) = setup();
        let ctx = WindowContext {
            vpr: None,
            ..WindowContext::free_form(WINDOW, WindowLimits::default())
        };

        // 7px inside the left edge: inside the 5vp band only at vpr 1.5.
        let consumed = controller.consume_drag_event(&touch(0, PointerAction::Down, 107, 600, WINDOW), &ctx);

        assert!(consumed);
    }

    // ── Interrupt ─────────────────────────────────────────────────────────────

    #[test]
    fn test_interrupt_idle_returns_false() {
        let (mut controller, _, recorder) = setup();
        assert!(!controller.interrupt(true));
        assert!(recorder.calls().is_empty());
    }

    #[test]
    fn test_interrupt_with_reset_restores_original_rect() {
        let (mut controller, vsync, recorder) = setup();
        let ctx = WindowContext::free_form(WINDOW, WindowLimits::default());
        controller.consume_drag_event(&touch(0, PointerAction::Down, 1100, 1100, WINDOW), &ctx);
        controller.consume_drag_event(&touch(0, PointerAction::Move, 1200, 1200, WINDOW), &ctx);

        assert!(controller.interrupt(true));
        vsync.fire(16);

        assert_eq!(recorder.calls(), vec![(3, WINDOW, SizeChangeReason::DragEnd)]);
        assert_eq!(controller.state(), GestureState::Idle);
    }

    // ── Cursor ────────────────────────────────────────────────────────────────

    #[test]
    fn test_handle_mouse_style_only_calls_sink_on_change() {
        // Arrange
        let mut sink = MockPointerStyleSink::new();
        sink.expect_set_pointer_style()
            .withf(|id, style| *id == 3 && *style == CursorStyle::WestEast)
            .times(1)
            .returning(|_, _| Ok(()));
        let (controller, _, _) = setup();
        let mut controller = controller.with_style_sink(Arc::new(sink));
        let hover = PointerEvent::mouse(PointerAction::Move, MouseButton::None, Point::new(102, 600), Point::new(2, 500));

        // Act
        let first = controller.handle_mouse_style(&hover, WINDOW, Some(1.0));
        let second = controller.handle_mouse_style(&hover, WINDOW, Some(1.0));

        // Assert
        assert!(first);
        assert!(!second);
        assert_eq!(controller.mouse_style(), CursorStyle::WestEast);
    }

    #[test]
    fn test_handle_mouse_style_keeps_previous_style_on_sink_error() {
        let mut sink = MockPointerStyleSink::new();
        sink.expect_set_pointer_style()
            .returning(|_, _| Err(DmError::IpcFailed("pointer service down".to_string())));
        let (controller, _, _) = setup();
        let mut controller = controller.with_style_sink(Arc::new(sink));
        let corner = PointerEvent::mouse(PointerAction::Move, MouseButton::None, Point::new(100, 100), Point::new(0, 0));

        assert!(!controller.handle_mouse_style(&corner, WINDOW, Some(1.0)));
        assert_eq!(controller.mouse_style(), CursorStyle::Default);
    }

    #[test]
    fn test_handle_mouse_style_ignores_touch() {
        let mut sink = MockPointerStyleSink::new();
        sink.expect_set_pointer_style().never();
        let (controller, _, _) = setup();
        let mut controller = controller.with_style_sink(Arc::new(sink));

        assert!(!controller.handle_mouse_style(&touch(0, PointerAction::Move, 100, 100, WINDOW), WINDOW, Some(1.0)));
    }

    // ── Listener mock ─────────────────────────────────────────────────────────

    #[test]
    fn test_drag_end_reaches_listener_exactly_once() {
        let mut listener = MockMoveDragListener::new();
        listener
            .expect_on_rect_change()
            .withf(|id, _, reason| *id == 9 && *reason == SizeChangeReason::DragEnd)
            .times(1)
            .return_const(());
        let vsync = Arc::new(ManualVsyncStation::new());
        let mut controller = MoveDragController::new(9, vsync, Arc::new(listener));
        let ctx = WindowContext::free_form(WINDOW, WindowLimits::default());

        controller.consume_drag_event(&touch(0, PointerAction::Down, 1100, 1100, WINDOW), &ctx);
        controller.consume_drag_event(&touch(0, PointerAction::Up, 1100, 1100, WINDOW), &ctx);
    }

    // ── Full screen → floating ────────────────────────────────────────────────

    #[test]
    fn test_full_screen_to_floating_keeps_pointer_ratio() {
        let (mut controller, _, _) = setup();
        let screen = Rect::new(0, 0, 2000, 1200);
        controller.consume_move_event(&touch(0, PointerAction::Down, 1000, 40, screen), screen);

        let rect = controller.full_screen_to_floating_rect(screen, Rect::new(0, 0, 800, 600));

        assert_eq!(rect, Rect::new(600, 0, 800, 600));
    }

    #[test]
    fn test_full_screen_to_floating_without_down_returns_original() {
        let (controller, _, _) = setup();
        let screen = Rect::new(0, 0, 2000, 1200);
        assert_eq!(
            controller.full_screen_to_floating_rect(screen, Rect::new(0, 0, 800, 600)),
            screen
        );
    }

    #[test]
    fn test_move_temp_resets_on_release() {
        let (mut controller, _, _) = setup();
        controller.consume_move_event(&touch(0, PointerAction::Down, 500, 120, WINDOW), WINDOW);
        assert!(!controller.move_temp().is_empty());

        controller.consume_move_event(&touch(0, PointerAction::Up, 500, 120, WINDOW), WINDOW);

        assert!(controller.move_temp().is_empty());
    }
}
