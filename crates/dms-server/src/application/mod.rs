//! Application layer of the display manager service.
//!
//! # What lives here? (for beginners)
//!
//! Everything that owns mutable service state and decides what happens next:
//! the screen topology, the logical displays derived from it, window
//! sessions, and the per-window move/drag gesture.  Collaborators outside the
//! process (listener clients, the client-side window stage, the render
//! surface, the frame clock) are reached only through traits, so tests inject
//! mocks and the binary injects the real thing.
//!
//! # Sub-modules
//!
//! - **`agent_hub`** – listener registration and event fan-out.
//! - **`screen_topology`** – physical/virtual screens and their
//!   mirror/expand/unique groups.
//! - **`display_registry`** – logical displays bound to screens, display
//!   state, and the fold state machine.
//! - **`display_manager`** – the facade the IPC layer calls: queries,
//!   composition, power and rotation.
//! - **`session_lifecycle`** – per-window session state and dialog rules.
//! - **`move_drag`** – pointer stream → target rect, paced by frames.

pub mod agent_hub;
pub mod display_manager;
pub mod display_registry;
pub mod move_drag;
pub mod screen_topology;
pub mod session_lifecycle;
