//! Pointer events as delivered by the input service.
//!
//! Every event carries both the display-space and the window-space position
//! of the pointer, so consumers can reason about either without a round trip
//! to the window tree.

use serde::{Deserialize, Serialize};

use super::geometry::Point;

/// What the pointer did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerAction {
    /// A finger touched down.
    Down,
    /// A finger lifted.
    Up,
    /// The pointer moved (touch drag or mouse move).
    Move,
    /// A mouse button was pressed.
    ButtonDown,
    /// A mouse button was released.
    ButtonUp,
    /// The input service withdrew the gesture.
    Cancel,
    /// Mouse wheel or touchpad axis.
    AxisUpdate,
}

impl PointerAction {
    /// `Down` or `ButtonDown`.
    pub fn is_down(self) -> bool {
        matches!(self, PointerAction::Down | PointerAction::ButtonDown)
    }

    /// `Up`, `ButtonUp` or `Cancel`: the gesture is over.
    pub fn is_release(self) -> bool {
        matches!(
            self,
            PointerAction::Up | PointerAction::ButtonUp | PointerAction::Cancel
        )
    }
}

/// Device class that produced the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceType {
    Mouse,
    TouchScreen,
    TouchPad,
}

/// Mouse button associated with the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MouseButton {
    /// No button (touch events, hover moves).
    None,
    Left,
    Right,
    Middle,
}

/// A single pointer sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub pointer_id: i32,
    pub source: SourceType,
    pub action: PointerAction,
    pub button: MouseButton,
    /// Position in display coordinates.
    pub display_pos: Point,
    /// Position relative to the window's top-left corner.
    pub window_pos: Point,
}

impl PointerEvent {
    /// Builds a touch-screen event.
    pub fn touch(pointer_id: i32, action: PointerAction, display_pos: Point, window_pos: Point) -> Self {
        Self {
            pointer_id,
            source: SourceType::TouchScreen,
            action,
            button: MouseButton::None,
            display_pos,
            window_pos,
        }
    }

    /// Builds a mouse event with the given button.
    pub fn mouse(
        action: PointerAction,
        button: MouseButton,
        display_pos: Point,
        window_pos: Point,
    ) -> Self {
        Self {
            pointer_id: 0,
            source: SourceType::Mouse,
            action,
            button,
            display_pos,
            window_pos,
        }
    }

    pub fn is_mouse(&self) -> bool {
        self.source == SourceType::Mouse
    }

    /// Mouse events only drive gestures with the left button.
    pub fn is_invalid_mouse_event(&self) -> bool {
        self.is_mouse() && self.button != MouseButton::Left
    }
}
