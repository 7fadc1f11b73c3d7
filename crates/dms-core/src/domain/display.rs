//! Logical displays and the device-wide power/fold vocabulary.
//!
//! A display is the compositor-facing unit bound to exactly one screen at a
//! time.  [`DisplayInfo`] values are snapshots: the registry owns the cached
//! record and hands out clones.

use serde::{Deserialize, Serialize};

use super::geometry::Rect;
use super::ids::{DisplayId, ScreenId};
use super::screen::{Orientation, Rotation, ScreenInfo};

/// Default DPI at a virtual pixel ratio of 1.0.
pub const BASELINE_DENSITY_DPI: f32 = 160.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DisplayState {
    #[default]
    Unknown,
    Off,
    On,
    Doze,
    DozeSuspend,
    OnSuspend,
    Vr,
}

/// Snapshot of a logical display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayInfo {
    pub id: DisplayId,
    pub screen_id: ScreenId,
    pub name: String,
    /// Logical (post-rotation) size.
    pub width: u32,
    pub height: u32,
    /// Panel size before rotation.
    pub physical_width: u32,
    pub physical_height: u32,
    pub refresh_rate: u32,
    pub virtual_pixel_ratio: f32,
    pub dpi: f32,
    pub rotation: Rotation,
    pub orientation: Orientation,
    pub state: DisplayState,
    pub alive: bool,
    pub available_area: Rect,
}

impl DisplayInfo {
    /// Derives a fresh display record from the backing screen.
    pub fn from_screen(id: DisplayId, screen: &ScreenInfo) -> Self {
        let (physical_width, physical_height) = if screen.rotation.is_portrait_swap() {
            (screen.height, screen.width)
        } else {
            (screen.width, screen.height)
        };
        Self {
            id,
            screen_id: screen.id,
            name: format!("display-{}", id.0),
            width: screen.width,
            height: screen.height,
            physical_width,
            physical_height,
            refresh_rate: screen.refresh_rate,
            virtual_pixel_ratio: screen.virtual_pixel_ratio,
            dpi: screen.virtual_pixel_ratio * BASELINE_DENSITY_DPI,
            rotation: screen.rotation,
            orientation: screen.orientation,
            state: DisplayState::Unknown,
            alive: true,
            available_area: Rect::new(0, 0, screen.width as i32, screen.height as i32),
        }
    }

    /// Re-reads the geometry fields from the backing screen, keeping the
    /// display's own state and id.
    ///
    /// Returns `true` when anything observable changed.
    pub fn refresh_from_screen(&mut self, screen: &ScreenInfo) -> bool {
        let refreshed = DisplayInfo {
            id: self.id,
            name: self.name.clone(),
            state: self.state,
            alive: self.alive,
            available_area: if screen.width == self.width && screen.height == self.height {
                self.available_area
            } else {
                Rect::new(0, 0, screen.width as i32, screen.height as i32)
            },
            ..DisplayInfo::from_screen(self.id, screen)
        };
        let changed = refreshed != *self;
        *self = refreshed;
        changed
    }
}

/// Posture of a foldable device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FoldStatus {
    #[default]
    Unknown,
    Expand,
    Folded,
    HalfFold,
}

/// Which panel(s) of a foldable device are showing content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FoldDisplayMode {
    #[default]
    Unknown,
    Full,
    Main,
    Sub,
    Coordination,
}

impl FoldDisplayMode {
    /// The posture a forced display mode implies.
    pub fn implied_status(self) -> Option<FoldStatus> {
        match self {
            FoldDisplayMode::Main | FoldDisplayMode::Sub => Some(FoldStatus::Folded),
            FoldDisplayMode::Full | FoldDisplayMode::Coordination => Some(FoldStatus::Expand),
            FoldDisplayMode::Unknown => None,
        }
    }
}

/// Region of the panel covered by the hinge.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FoldCreaseRegion {
    pub display_id: Option<DisplayId>,
    pub rects: Vec<Rect>,
}

/// Power transitions broadcast to power listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayPowerEvent {
    WakeUp,
    Sleep,
    DisplayOn,
    DisplayOff,
    DesktopReady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    Begin,
    End,
}

/// Why a power transition was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PowerStateChangeReason {
    #[default]
    Application,
    PowerButton,
    Timeout,
    Collaboration,
}
