//! # dms-core
//!
//! Shared library for the display manager service containing the screen and
//! display domain model, the error taxonomy, and the window gesture geometry.
//!
//! It has zero dependencies on locks, async runtimes, or OS APIs.
//!
//! # Architecture overview (for beginners)
//!
//! The display manager decides which screens exist, how they are combined
//! (mirrored, extended, or standalone), which logical displays the rest of the
//! system sees, and where floating windows land while the user drags them.
//!
//! This crate (`dms-core`) is the pure foundation.  It defines:
//!
//! - **`domain`** – Screens, screen groups, displays, pointer events,
//!   rectangles, ids and the [`DmError`] taxonomy.
//!
//! - **`gesture`** – Hot-zone classification of a pointer against a window
//!   border and the incremental move/resize solver.
//!
//! The service crate (`dms-server`) owns the mutable state, the locks and the
//! notification fan-out, and builds on the types here.

pub mod domain;
pub mod gesture;

// Re-export the most-used types at the crate root so callers can write
// `dms_core::ScreenId` instead of `dms_core::domain::ids::ScreenId`.
pub use domain::display::{
    DisplayInfo, DisplayPowerEvent, DisplayState, EventStatus, FoldCreaseRegion, FoldDisplayMode,
    FoldStatus, PowerStateChangeReason,
};
pub use domain::error::{result_code, DmError, DM_OK};
pub use domain::geometry::{Decoration, Point, Rect, WindowLimits};
pub use domain::ids::{DisplayId, IdAllocator, PersistentId, ScreenId};
pub use domain::pointer::{MouseButton, PointerAction, PointerEvent, SourceType};
pub use domain::screen::{
    ColorGamut, CombinationMode, Orientation, PhysicalScreenOptions, Rotation, ScreenGroupInfo,
    ScreenInfo, ScreenKind, ScreenMode, ScreenPowerState, SurfaceHandle, VirtualScreenOption,
};
pub use gesture::area::{AreaType, CursorStyle, HotZoneConfig};
pub use gesture::solver::{GestureSession, MoveDragProperty};
