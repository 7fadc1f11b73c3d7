//! Pure geometry behind window move and resize gestures.
//!
//! - **`area`** – which border band of a window a pointer is on, and the
//!   cursor shape that goes with it.
//! - **`solver`** – the rectangle a window should occupy for a given pointer
//!   delta, in free-form or fixed-aspect-ratio mode.
//!
//! Neither module knows about events, frames or sessions; the move/drag
//! controller in `dms-server` owns that state machine and calls in here.

pub mod area;
pub mod solver;
