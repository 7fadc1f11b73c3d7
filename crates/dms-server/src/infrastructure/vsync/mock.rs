//! Hand-driven vsync station for tests.
//!
//! Callbacks queue up until the test calls [`ManualVsyncStation::fire`], which
//! makes frame boundaries fully deterministic.

use std::sync::{Mutex, PoisonError};

use super::{FrameCallback, VsyncStation};

#[derive(Default)]
pub struct ManualVsyncStation {
    pending: Mutex<Vec<FrameCallback>>,
    requests: Mutex<usize>,
}

impl ManualVsyncStation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires every queued callback with `timestamp`; returns how many ran.
    ///
    /// Callbacks requested while firing wait for the next call.
    pub fn fire(&self, timestamp: i64) -> usize {
        let callbacks = std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner));
        let count = callbacks.len();
        for callback in callbacks {
            callback(timestamp);
        }
        count
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Total number of requests ever made.
    pub fn request_count(&self) -> usize {
        *self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl VsyncStation for ManualVsyncStation {
    fn request_next_vsync(&self, callback: FrameCallback) {
        *self.requests.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(callback);
    }
}
