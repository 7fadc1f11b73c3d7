//! Frame synchronisation: "call me back on the next frame".
//!
//! The move/drag controller never pushes a window rect the instant a pointer
//! sample arrives.  It asks a [`VsyncStation`] for the next frame and pushes
//! whatever the latest rect is when that frame fires.  Many pointer samples
//! within one frame therefore collapse into a single update.
//!
//! # Implementations
//!
//! - [`TokioVsyncStation`] emulates a display refresh with a tokio timer: the
//!   first request in a frame arms a `sleep(period)`, and every callback queued
//!   before it expires fires together with the same timestamp.
//! - [`mock::ManualVsyncStation`] fires only when a test tells it to.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{debug, trace};

pub mod mock;

/// Invoked once with the frame timestamp in nanoseconds.
pub type FrameCallback = Box<dyn FnOnce(i64) + Send>;

/// A process-wide source of frame callbacks.  Implementations must be safe
/// to call from any thread.
pub trait VsyncStation: Send + Sync {
    /// Queues `callback` for the next frame.  Each call fires at most once.
    fn request_next_vsync(&self, callback: FrameCallback);
}

#[derive(Debug, Error)]
pub enum VsyncError {
    #[error("the vsync station must be created inside a tokio runtime")]
    NoRuntime(#[source] tokio::runtime::TryCurrentError),
}

#[derive(Default)]
struct StationState {
    callbacks: Vec<FrameCallback>,
    frame_armed: bool,
    destroyed: bool,
}

/// Timer-driven [`VsyncStation`] running on the tokio runtime it was created in.
pub struct TokioVsyncStation {
    handle: Handle,
    period: Duration,
    origin: Instant,
    state: Arc<Mutex<StationState>>,
}

impl TokioVsyncStation {
    /// # Errors
    ///
    /// [`VsyncError::NoRuntime`] when called outside a tokio runtime.
    pub fn new(period: Duration) -> Result<Self, VsyncError> {
        let handle = Handle::try_current().map_err(VsyncError::NoRuntime)?;
        Ok(Self {
            handle,
            period,
            origin: Instant::now(),
            state: Arc::new(Mutex::new(StationState::default())),
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Drops every queued callback and ignores later requests.
    pub fn destroy(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.destroyed = true;
        let dropped = state.callbacks.len();
        state.callbacks.clear();
        debug!(dropped, "vsync station destroyed");
    }

    fn arm_frame(&self) {
        let state = Arc::clone(&self.state);
        let period = self.period;
        let origin = self.origin;
        self.handle.spawn(async move {
            tokio::time::sleep(period).await;
            let callbacks = {
                let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
                state.frame_armed = false;
                std::mem::take(&mut state.callbacks)
            };
            let timestamp = i64::try_from(origin.elapsed().as_nanos()).unwrap_or(i64::MAX);
            trace!(count = callbacks.len(), timestamp, "vsync frame");
            for callback in callbacks {
                callback(timestamp);
            }
        });
    }
}

impl VsyncStation for TokioVsyncStation {
    fn request_next_vsync(&self, callback: FrameCallback) {
        let arm = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.destroyed {
                debug!("vsync requested after destroy, ignoring");
                return;
            }
            state.callbacks.push(callback);
            !std::mem::replace(&mut state.frame_armed, true)
        };
        if arm {
            self.arm_frame();
        }
    }
}
