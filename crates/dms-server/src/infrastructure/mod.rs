//! Infrastructure layer for the display manager service.
//!
//! Contains the adapters around the application core: the frame clock that
//! paces move/drag updates, configuration persistence, and the concrete
//! listener agents.

pub mod agents;
pub mod storage;
pub mod vsync;
