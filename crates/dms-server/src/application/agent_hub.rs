//! AgentNotificationHub: fan-out of service events to registered listeners.
//!
//! Clients register a [`DisplayManagerAgent`] for one [`AgentType`] at a time.
//! Every component of the service reports its changes as an [`AgentEvent`];
//! the hub looks up the listeners registered for the event's type and calls
//! them in registration order.
//!
//! # Why a trait? (for beginners)
//!
//! The topology controller and the display registry only ever see
//! `Arc<dyn AgentNotificationHub>`.  Production code injects the in-process
//! [`AgentRegistry`]; tests can inject the same registry with recording
//! agents, or any other implementation, without touching the callers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use dms_core::{
    DisplayId, DisplayInfo, DisplayPowerEvent, DisplayState, DmError, EventStatus, FoldDisplayMode,
    FoldStatus, PowerStateChangeReason, Rect, ScreenId, ScreenInfo,
};
use tracing::{debug, warn};

/// Listener categories a client can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentType {
    DisplayPowerEventListener,
    DisplayStateListener,
    ScreenEventListener,
    DisplayEventListener,
    FoldStatusChangedListener,
    FoldDisplayModeListener,
    AvailableAreaChangedListener,
}

impl AgentType {
    pub const ALL: [AgentType; 7] = [
        AgentType::DisplayPowerEventListener,
        AgentType::DisplayStateListener,
        AgentType::ScreenEventListener,
        AgentType::DisplayEventListener,
        AgentType::FoldStatusChangedListener,
        AgentType::FoldDisplayModeListener,
        AgentType::AvailableAreaChangedListener,
    ];
}

/// What changed on a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenChangeEvent {
    UpdateRotation,
    ChangeMode,
}

/// What changed in a screen group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenGroupChangeEvent {
    AddToGroup,
    RemoveFromGroup,
    GroupDissolved,
}

/// What changed on a display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayChangeEvent {
    UpdateRotation,
    DisplaySizeChanged,
}

/// A notification payload.  Each variant belongs to exactly one [`AgentType`].
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    DisplayPower {
        event: DisplayPowerEvent,
        status: EventStatus,
        reason: PowerStateChangeReason,
    },
    DisplayStateChanged {
        state: DisplayState,
        display_ids: Vec<DisplayId>,
    },
    ScreenConnect(ScreenInfo),
    ScreenDisconnect(ScreenId),
    ScreenChange {
        info: ScreenInfo,
        event: ScreenChangeEvent,
    },
    ScreenGroupChange {
        group_id: ScreenId,
        screens: Vec<ScreenInfo>,
        event: ScreenGroupChangeEvent,
    },
    DisplayCreate(DisplayInfo),
    DisplayDestroy(DisplayId),
    DisplayChange {
        info: DisplayInfo,
        event: DisplayChangeEvent,
    },
    FoldStatusChanged(FoldStatus),
    FoldDisplayModeChanged(FoldDisplayMode),
    AvailableAreaChanged {
        display_id: DisplayId,
        area: Rect,
    },
}

impl AgentEvent {
    /// The listener category this event is delivered to.
    pub fn agent_type(&self) -> AgentType {
        match self {
            AgentEvent::DisplayPower { .. } => AgentType::DisplayPowerEventListener,
            AgentEvent::DisplayStateChanged { .. } => AgentType::DisplayStateListener,
            AgentEvent::ScreenConnect(_)
            | AgentEvent::ScreenDisconnect(_)
            | AgentEvent::ScreenChange { .. }
            | AgentEvent::ScreenGroupChange { .. } => AgentType::ScreenEventListener,
            AgentEvent::DisplayCreate(_)
            | AgentEvent::DisplayDestroy(_)
            | AgentEvent::DisplayChange { .. } => AgentType::DisplayEventListener,
            AgentEvent::FoldStatusChanged(_) => AgentType::FoldStatusChangedListener,
            AgentEvent::FoldDisplayModeChanged(_) => AgentType::FoldDisplayModeListener,
            AgentEvent::AvailableAreaChanged { .. } => AgentType::AvailableAreaChangedListener,
        }
    }
}

/// A client-side listener.
///
/// An error return means the client could not be reached; the hub logs it and
/// keeps delivering to the remaining listeners.
#[cfg_attr(test, mockall::automock)]
pub trait DisplayManagerAgent: Send + Sync {
    fn on_event(&self, event: &AgentEvent) -> Result<(), DmError>;
}

/// Registration and delivery contract used by the rest of the service.
pub trait AgentNotificationHub: Send + Sync {
    /// Registers `agent` for `agent_type`.  Registering the same agent twice
    /// for the same type has no additional effect.
    ///
    /// # Errors
    ///
    /// Implementations backed by a remote registry may return
    /// [`DmError::IpcFailed`].
    fn register_agent(&self, agent: Arc<dyn DisplayManagerAgent>, agent_type: AgentType) -> Result<(), DmError>;

    /// Removes `agent` from `agent_type`.  Unknown agents are a no-op.
    ///
    /// # Errors
    ///
    /// Same as [`register_agent`](Self::register_agent).
    fn unregister_agent(&self, agent: &Arc<dyn DisplayManagerAgent>, agent_type: AgentType) -> Result<(), DmError>;

    /// Delivers `event`; returns `true` if any listener was registered for it.
    fn notify(&self, event: &AgentEvent) -> bool;
}

/// Identity of an agent: the address of the shared allocation.
fn same_agent(a: &Arc<dyn DisplayManagerAgent>, b: &Arc<dyn DisplayManagerAgent>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// In-process [`AgentNotificationHub`].
#[derive(Default)]
pub struct AgentRegistry {
    agents: Mutex<HashMap<AgentType, Vec<Arc<dyn DisplayManagerAgent>>>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of listeners currently registered for `agent_type`.
    pub fn agent_count(&self, agent_type: AgentType) -> usize {
        self.agents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&agent_type)
            .map_or(0, Vec::len)
    }
}

impl AgentNotificationHub for AgentRegistry {
    fn register_agent(&self, agent: Arc<dyn DisplayManagerAgent>, agent_type: AgentType) -> Result<(), DmError> {
        let mut agents = self.agents.lock().unwrap_or_else(PoisonError::into_inner);
        let list = agents.entry(agent_type).or_default();
        if list.iter().any(|a| same_agent(a, &agent)) {
            debug!(?agent_type, "agent already registered");
            return Ok(());
        }
        list.push(agent);
        debug!(?agent_type, count = list.len(), "agent registered");
        Ok(())
    }

    fn unregister_agent(&self, agent: &Arc<dyn DisplayManagerAgent>, agent_type: AgentType) -> Result<(), DmError> {
        let mut agents = self.agents.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(list) = agents.get_mut(&agent_type) {
            list.retain(|a| !same_agent(a, agent));
            if list.is_empty() {
                agents.remove(&agent_type);
            }
        }
        Ok(())
    }

    fn notify(&self, event: &AgentEvent) -> bool {
        let agent_type = event.agent_type();
        // Snapshot the listeners so an agent may (un)register from its callback.
        let listeners: Vec<Arc<dyn DisplayManagerAgent>> = {
            let agents = self.agents.lock().unwrap_or_else(PoisonError::into_inner);
            match agents.get(&agent_type) {
                Some(list) if !list.is_empty() => list.clone(),
                _ => return false,
            }
        };
        for agent in &listeners {
            if let Err(e) = agent.on_event(event) {
                warn!(?agent_type, error = %e, "agent failed to receive event");
            }
        }
        true
    }
}
