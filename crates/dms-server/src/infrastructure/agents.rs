//! Concrete [`DisplayManagerAgent`] implementations.
//!
//! - [`LoggingAgent`] writes every event to the tracing log.  `main.rs`
//!   registers it for every listener type so the service is observable from
//!   its log output alone.
//! - [`RecordingAgent`] stores every event in memory.  Unit and integration
//!   tests register it to assert on what clients would have received.

use std::sync::{Mutex, PoisonError};

use dms_core::DmError;
use tracing::info;

use crate::application::agent_hub::{AgentEvent, DisplayManagerAgent};

/// Logs every received event at `INFO`.
#[derive(Debug, Default)]
pub struct LoggingAgent;

impl DisplayManagerAgent for LoggingAgent {
    fn on_event(&self, event: &AgentEvent) -> Result<(), DmError> {
        info!(agent_type = ?event.agent_type(), ?event, "agent event");
        Ok(())
    }
}

/// Keeps a copy of every received event, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingAgent {
    events: Mutex<Vec<AgentEvent>>,
}

impl RecordingAgent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything received so far.
    pub fn events(&self) -> Vec<AgentEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl DisplayManagerAgent for RecordingAgent {
    fn on_event(&self, event: &AgentEvent) -> Result<(), DmError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}
