//! Integration tests for the window move/resize pipeline.
//!
//! # Purpose
//!
//! These tests wire the real pieces together the way a window session does:
//!
//! ```text
//! PointerEvent ──► MoveDragController ──► ManualVsyncStation (frame)
//!                                              │
//!                                              ▼
//!                 Session ◄── SessionRegistry ◄── SessionRectUpdater
//!                 (stage + surface see the rect)
//! ```
//!
//! They verify:
//!
//! - Rects reach the session's client stage and render surface only when a
//!   frame fires, and only the newest rect per frame.
//! - A second pointer cannot disturb a running gesture.
//! - Fixed-ratio and free-form resizes produce the exact target rects.
//! - The final rect of a gesture arrives without waiting for a frame.

use std::sync::{Arc, Mutex};

use dms_core::{DmError, PersistentId, Point, PointerAction, PointerEvent, Rect, WindowLimits};
use dms_server::application::move_drag::{GestureState, MoveDragController, WindowContext};
use dms_server::application::session_lifecycle::{
    SessionRectUpdater, SessionRegistry, SessionStage, SizeChangeReason, SurfaceNode, WindowType,
};
use dms_server::infrastructure::vsync::mock::ManualVsyncStation;

// ── Fakes ─────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeStage {
    rects: Mutex<Vec<(Rect, SizeChangeReason)>>,
}

impl FakeStage {
    fn rects(&self) -> Vec<(Rect, SizeChangeReason)> {
        self.rects.lock().unwrap().clone()
    }
}

impl SessionStage for FakeStage {
    fn update_rect(&self, rect: Rect, reason: SizeChangeReason) -> Result<(), DmError> {
        self.rects.lock().unwrap().push((rect, reason));
        Ok(())
    }

    fn set_active(&self, _active: bool) -> Result<(), DmError> {
        Ok(())
    }
}

#[derive(Default)]
struct FakeSurface {
    bounds: Mutex<Option<Rect>>,
}

impl SurfaceNode for FakeSurface {
    fn id(&self) -> u64 {
        42
    }

    fn set_bounds(&self, rect: Rect) {
        *self.bounds.lock().unwrap() = Some(rect);
    }
}

// ── Fixture ───────────────────────────────────────────────────────────────────

const WINDOW: Rect = Rect {
    pos_x: 100,
    pos_y: 100,
    width: 1000,
    height: 1000,
};

struct Pipeline {
    id: PersistentId,
    registry: Arc<Mutex<SessionRegistry>>,
    stage: Arc<FakeStage>,
    surface: Arc<FakeSurface>,
    vsync: Arc<ManualVsyncStation>,
    controller: MoveDragController,
}

impl Pipeline {
    fn new() -> Self {
        let registry = Arc::new(Mutex::new(SessionRegistry::new()));
        let stage = Arc::new(FakeStage::default());
        let surface = Arc::new(FakeSurface::default());
        let id = {
            let mut reg = registry.lock().unwrap();
            let id = reg.create_session("editor", WindowType::AppMainWindow, None).unwrap();
            let session = reg.get_mut(id).unwrap();
            let stage_dyn: Arc<dyn SessionStage> = stage.clone();
            let surface_dyn: Arc<dyn SurfaceNode> = surface.clone();
            session.connect(Some(stage_dyn), Some(surface_dyn)).unwrap();
            session.foreground().unwrap();
            id
        };
        let vsync = Arc::new(ManualVsyncStation::new());
        let updater = Arc::new(SessionRectUpdater::new(Arc::clone(&registry)));
        let controller = MoveDragController::new(id, vsync.clone(), updater);
        Self {
            id,
            registry,
            stage,
            surface,
            vsync,
            controller,
        }
    }

    fn session_rect(&self) -> (Rect, SizeChangeReason, bool) {
        let reg = self.registry.lock().unwrap();
        let session = reg.get(self.id).unwrap();
        (session.rect(), session.size_change_reason(), session.is_rect_provisional())
    }
}

fn touch(pointer: i32, action: PointerAction, x: i32, y: i32) -> PointerEvent {
    PointerEvent::touch(
        pointer,
        action,
        Point::new(x, y),
        Point::new(x - WINDOW.pos_x, y - WINDOW.pos_y),
    )
}

// ── Move ──────────────────────────────────────────────────────────────────────

/// A title-bar move: rects reach the session once per frame and the release
/// lands immediately as the final, non-provisional rect.
#[test]
fn test_move_gesture_updates_session_per_frame() {
    // Arrange
    let mut p = Pipeline::new();
    p.controller.consume_move_event(&touch(0, PointerAction::Down, 600, 120), WINDOW);
    p.controller.set_start_move(true);
    assert!(p.controller.consume_move_event(&touch(0, PointerAction::Move, 600, 120), WINDOW));

    // Act: two samples in one frame
    p.controller.consume_move_event(&touch(0, PointerAction::Move, 650, 150), WINDOW);
    p.controller.consume_move_event(&touch(0, PointerAction::Move, 700, 170), WINDOW);
    assert!(p.stage.rects().is_empty());
    p.vsync.fire(16_000_000);

    // Assert
    let moved = Rect::new(200, 150, 1000, 1000);
    assert_eq!(p.stage.rects(), vec![(moved, SizeChangeReason::DragMove)]);
    assert_eq!(p.session_rect(), (moved, SizeChangeReason::DragMove, true));
    assert_eq!(*p.surface.bounds.lock().unwrap(), Some(moved));

    // Act: release
    p.controller.consume_move_event(&touch(0, PointerAction::Up, 710, 180), WINDOW);

    // Assert
    let last = Rect::new(210, 160, 1000, 1000);
    assert_eq!(p.session_rect(), (last, SizeChangeReason::DragEnd, false));
    assert_eq!(p.controller.state(), GestureState::Idle);
}

// ── Pointer isolation ─────────────────────────────────────────────────────────

/// Pointer B's events during pointer A's resize neither change the latched
/// gesture nor produce a rect.
#[test]
fn test_interleaved_pointer_streams_only_follow_first_pointer() {
    // Arrange
    let mut p = Pipeline::new();
    let ctx = WindowContext::free_form(WINDOW, WindowLimits::default());
    assert!(p.controller.consume_drag_event(&touch(0, PointerAction::Down, 1100, 1100), &ctx));
    p.vsync.fire(1);
    let latched = *p.controller.property().unwrap();
    let delivered = p.stage.rects().len();

    // Act: interleave A and B
    assert!(!p.controller.consume_drag_event(&touch(1, PointerAction::Down, 100, 100), &ctx));
    assert!(p.controller.consume_drag_event(&touch(0, PointerAction::Move, 1120, 1110), &ctx));
    assert!(!p.controller.consume_drag_event(&touch(1, PointerAction::Move, 50, 50), &ctx));
    assert!(!p.controller.consume_drag_event(&touch(1, PointerAction::Up, 50, 50), &ctx));
    p.vsync.fire(2);

    // Assert: only A's move produced a rect
    let property = p.controller.property().unwrap();
    assert_eq!(property.pointer_id, latched.pointer_id);
    assert_eq!(property.original_rect, latched.original_rect);
    assert_eq!(property.origin_pointer, latched.origin_pointer);
    let rects = p.stage.rects();
    assert_eq!(rects.len(), delivered + 1);
    assert_eq!(rects.last().unwrap().0, Rect::new(100, 100, 1020, 1010));
    assert_eq!(p.controller.state(), GestureState::Dragging);
}

// ── Resize geometry ───────────────────────────────────────────────────────────

/// Aspect ratio 1.0, bottom-right corner, raw delta (50, 80): the height
/// follows the width instead of the pointer.
#[test]
fn test_fixed_ratio_corner_drag_produces_square_target() {
    // Arrange
    let mut p = Pipeline::new();
    let ctx = WindowContext {
        aspect_ratio: 1.0,
        ..WindowContext::free_form(WINDOW, WindowLimits::default())
    };
    p.controller.consume_drag_event(&touch(0, PointerAction::Down, 1100, 1100), &ctx);
    // A first small step establishes the horizontal axis.
    p.controller.consume_drag_event(&touch(0, PointerAction::Move, 1110, 1105), &ctx);

    // Act
    p.controller.consume_drag_event(&touch(0, PointerAction::Move, 1150, 1180), &ctx);
    p.vsync.fire(16);

    // Assert
    let (rect, reason, provisional) = p.session_rect();
    assert_eq!(rect, Rect::new(100, 100, 1050, 1050));
    assert_eq!(reason, SizeChangeReason::Drag);
    assert!(provisional);
}

/// Free-form left-edge drag that would shrink below the minimum width stops
/// at exactly the minimum.
#[test]
fn test_free_form_left_drag_stops_at_min_width() {
    // Arrange
    let mut p = Pipeline::new();
    let ctx = WindowContext::free_form(WINDOW, WindowLimits::with_size(500, 200, 3000, 3000));
    p.controller.consume_drag_event(&touch(0, PointerAction::Down, 100, 600), &ctx);

    // Act
    p.controller.consume_drag_event(&touch(0, PointerAction::Up, 900, 600), &ctx);

    // Assert: delivered immediately, no frame needed
    let (rect, reason, provisional) = p.session_rect();
    assert_eq!(rect.width, 500);
    assert_eq!(rect, Rect::new(600, 100, 500, 1000));
    assert_eq!(reason, SizeChangeReason::DragEnd);
    assert!(!provisional);
}

// ── Session gone ──────────────────────────────────────────────────────────────

/// Rects for a session that went to the background are dropped, not applied.
#[test]
fn test_rect_for_background_session_is_dropped() {
    let mut p = Pipeline::new();
    let ctx = WindowContext::free_form(WINDOW, WindowLimits::default());
    p.controller.consume_drag_event(&touch(0, PointerAction::Down, 1100, 1100), &ctx);
    p.registry.lock().unwrap().get_mut(p.id).unwrap().background().unwrap();

    p.vsync.fire(16);

    assert!(p.stage.rects().is_empty());
}
