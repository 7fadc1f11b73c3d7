//! DisplayRegistry: the logical displays derived from the screen topology.
//!
//! A display is what the rest of the system renders to.  Each one is bound
//! to exactly one screen, and the registry keeps a cached [`DisplayInfo`] per
//! display so that queries never have to consult the topology.
//!
//! # How displays follow screens (for beginners)
//!
//! The registry implements [`ScreenLifecycleObserver`] and reacts to every
//! [`TopologyEvent`]:
//!
//! | Topology event                          | Effect on displays                     |
//! |-----------------------------------------|----------------------------------------|
//! | screen joins an ALONE or EXPAND group   | create its display if it has none      |
//! | screen joins a MIRROR group             | destroy its display (it shows the main)|
//! | screen detached from a MIRROR group     | give it a display again                |
//! | screen made unique                      | rebind it to the freshly allocated id  |
//! | screen disconnected                     | destroy its display                    |
//! | screen rotated / mode changed           | refresh the cached dimensions          |
//!
//! Fold state (status, display mode, crease region) is process-global: one
//! foldable device per service.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dms_core::{
    CombinationMode, DisplayId, DisplayInfo, DisplayState, DmError, FoldCreaseRegion, FoldDisplayMode,
    FoldStatus, IdAllocator, Rect, Rotation, ScreenId, ScreenInfo,
};
use tracing::{debug, info};

use super::agent_hub::{AgentEvent, AgentNotificationHub, DisplayChangeEvent, ScreenChangeEvent};
use super::screen_topology::{LeaveReason, ScreenLifecycleObserver, TopologyEvent};

/// What the hardware says about folding.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FoldCapability {
    pub foldable: bool,
    /// Crease rectangles in default-display coordinates.
    pub crease_rects: Vec<Rect>,
}

#[derive(Debug, Default)]
struct FoldState {
    /// Status reported to readers.
    status: FoldStatus,
    /// Last status reported by the sensor, applied or not.
    physical_status: FoldStatus,
    mode: FoldDisplayMode,
    locked: bool,
}

#[derive(Default)]
struct RegistryState {
    displays: BTreeMap<DisplayId, DisplayInfo>,
    screen_to_display: HashMap<ScreenId, DisplayId>,
    default_display: Option<DisplayId>,
    display_state: DisplayState,
    fold: FoldState,
}

impl RegistryState {
    fn create_display(&mut self, id: DisplayId, screen: &ScreenInfo, events: &mut Vec<AgentEvent>) {
        let mut created = DisplayInfo::from_screen(id, screen);
        created.state = self.display_state;
        self.screen_to_display.insert(screen.id, id);
        if self.default_display.is_none() {
            self.default_display = Some(id);
        }
        info!(display = %id, screen = %screen.id, width = created.width, height = created.height, "display created");
        events.push(AgentEvent::DisplayCreate(created.clone()));
        self.displays.insert(id, created);
    }

    fn destroy_display_of(&mut self, screen_id: ScreenId, events: &mut Vec<AgentEvent>) {
        let Some(id) = self.screen_to_display.remove(&screen_id) else {
            return;
        };
        self.displays.remove(&id);
        if self.default_display == Some(id) {
            self.default_display = self.displays.keys().next().copied();
        }
        info!(display = %id, screen = %screen_id, "display destroyed");
        events.push(AgentEvent::DisplayDestroy(id));
    }

    fn display_of_mut(&mut self, screen_id: ScreenId) -> Option<&mut DisplayInfo> {
        let id = self.screen_to_display.get(&screen_id)?;
        self.displays.get_mut(id)
    }
}

/// Cache of every live display plus the process-global fold state.
pub struct DisplayRegistry {
    state: Mutex<RegistryState>,
    display_ids: Arc<IdAllocator>,
    fold_capability: FoldCapability,
    hub: Arc<dyn AgentNotificationHub>,
}

impl DisplayRegistry {
    /// `display_ids` must be the allocator shared with the topology controller
    /// so that ids handed out by `make_unique_screen` never collide.
    pub fn new(
        display_ids: Arc<IdAllocator>,
        fold_capability: FoldCapability,
        hub: Arc<dyn AgentNotificationHub>,
    ) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            display_ids,
            fold_capability,
            hub,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, events: Vec<AgentEvent>) {
        for event in &events {
            self.hub.notify(event);
        }
    }

    fn ensure_display(&self, state: &mut RegistryState, screen: &ScreenInfo, events: &mut Vec<AgentEvent>) {
        if state.screen_to_display.contains_key(&screen.id) {
            return;
        }
        let id = self.display_ids.next_display_id();
        state.create_display(id, screen, events);
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn get_display_info(&self, id: DisplayId) -> Option<DisplayInfo> {
        self.lock().displays.get(&id).cloned()
    }

    pub fn get_default_display_info(&self) -> Option<DisplayInfo> {
        let state = self.lock();
        state.default_display.and_then(|id| state.displays.get(&id).cloned())
    }

    pub fn default_display_id(&self) -> Option<DisplayId> {
        self.lock().default_display
    }

    /// Ids of every live display in ascending order.
    pub fn get_all_display_ids(&self) -> Vec<DisplayId> {
        self.lock().displays.keys().copied().collect()
    }

    pub fn get_all_display_infos(&self) -> Vec<DisplayInfo> {
        self.lock().displays.values().cloned().collect()
    }

    /// The display backed by `screen_id`; `None` for mirrored or ungrouped
    /// screens.
    pub fn get_display_by_screen(&self, screen_id: ScreenId) -> Option<DisplayInfo> {
        let state = self.lock();
        state
            .screen_to_display
            .get(&screen_id)
            .and_then(|id| state.displays.get(id).cloned())
    }

    // ── Updates ───────────────────────────────────────────────────────────────

    /// Records the area of the display left free by system bars and notifies
    /// AVAILABLE_AREA_CHANGED listeners exactly once.
    ///
    /// # Errors
    ///
    /// [`DmError::InvalidScreen`] if no display is bound to `screen_id`.
    pub fn update_available_area(&self, screen_id: ScreenId, area: Rect) -> Result<(), DmError> {
        let display_id = {
            let mut state = self.lock();
            let display = state
                .display_of_mut(screen_id)
                .ok_or(DmError::InvalidScreen(screen_id))?;
            display.available_area = area;
            display.id
        };
        debug!(display = %display_id, ?area, "available area updated");
        self.hub.notify(&AgentEvent::AvailableAreaChanged { display_id, area });
        Ok(())
    }

    /// Overrides the rotation and presented size of the display bound to
    /// `screen_id` and notifies DISPLAY_EVENT listeners exactly once.
    ///
    /// # Errors
    ///
    /// [`DmError::InvalidScreen`] if no display is bound to `screen_id`.
    pub fn update_screen_rotation_property(
        &self,
        screen_id: ScreenId,
        rotation: Rotation,
        width: u32,
        height: u32,
    ) -> Result<(), DmError> {
        let info = {
            let mut state = self.lock();
            let display = state
                .display_of_mut(screen_id)
                .ok_or(DmError::InvalidScreen(screen_id))?;
            display.rotation = rotation;
            display.width = width;
            display.height = height;
            (display.physical_width, display.physical_height) = if rotation.is_portrait_swap() {
                (height, width)
            } else {
                (width, height)
            };
            display.clone()
        };
        debug!(display = %info.id, ?rotation, width, height, "rotation property updated");
        self.hub.notify(&AgentEvent::DisplayChange {
            info,
            event: DisplayChangeEvent::UpdateRotation,
        });
        Ok(())
    }

    /// Applies `state` to every display.  Returns `false` when nothing
    /// changed.
    pub fn set_display_state(&self, display_state: DisplayState) -> bool {
        let display_ids = {
            let mut state = self.lock();
            if state.display_state == display_state {
                return false;
            }
            state.display_state = display_state;
            for display in state.displays.values_mut() {
                display.state = display_state;
            }
            state.displays.keys().copied().collect::<Vec<_>>()
        };
        info!(state = ?display_state, displays = display_ids.len(), "display state changed");
        self.hub.notify(&AgentEvent::DisplayStateChanged {
            state: display_state,
            display_ids,
        });
        true
    }

    pub fn display_state(&self) -> DisplayState {
        self.lock().display_state
    }

    // ── Fold ──────────────────────────────────────────────────────────────────

    pub fn is_foldable(&self) -> bool {
        self.fold_capability.foldable
    }

    fn require_foldable(&self) -> Result<(), DmError> {
        if self.fold_capability.foldable {
            Ok(())
        } else {
            Err(DmError::DeviceNotSupport("fold"))
        }
    }

    /// A hinge-sensor reading.  Always remembered as the physical status, but
    /// only applied while the status is not locked.
    ///
    /// # Errors
    ///
    /// [`DmError::DeviceNotSupport`] on a non-foldable device.
    pub fn on_sensor_fold_status(&self, status: FoldStatus) -> Result<(), DmError> {
        self.require_foldable()?;
        let changed = {
            let mut state = self.lock();
            state.fold.physical_status = status;
            if state.fold.locked || state.fold.status == status {
                false
            } else {
                state.fold.status = status;
                true
            }
        };
        if changed {
            info!(?status, "fold status changed");
            self.hub.notify(&AgentEvent::FoldStatusChanged(status));
        }
        Ok(())
    }

    /// Freezes (or releases) the reported fold status.  Unlocking does not
    /// re-apply the physical status; see
    /// [`restore_physical_fold_status`](Self::restore_physical_fold_status).
    ///
    /// # Errors
    ///
    /// [`DmError::DeviceNotSupport`] on a non-foldable device.
    pub fn set_fold_status_locked(&self, locked: bool) -> Result<(), DmError> {
        self.require_foldable()?;
        self.lock().fold.locked = locked;
        debug!(locked, "fold status lock set");
        Ok(())
    }

    /// Switches the fold display mode.  While the status is unlocked the
    /// status follows the mode (MAIN/SUB fold, FULL/COORDINATION expand).
    ///
    /// # Errors
    ///
    /// [`DmError::DeviceNotSupport`] on a non-foldable device;
    /// [`DmError::InvalidParam`] for [`FoldDisplayMode::Unknown`].
    pub fn set_fold_display_mode(&self, mode: FoldDisplayMode) -> Result<(), DmError> {
        self.require_foldable()?;
        let implied = mode
            .implied_status()
            .ok_or_else(|| DmError::InvalidParam("fold display mode must be known".into()))?;
        let mut events = Vec::new();
        {
            let mut state = self.lock();
            if state.fold.mode != mode {
                state.fold.mode = mode;
                events.push(AgentEvent::FoldDisplayModeChanged(mode));
            }
            if !state.fold.locked && state.fold.status != implied {
                state.fold.status = implied;
                events.push(AgentEvent::FoldStatusChanged(implied));
            }
        }
        info!(?mode, "fold display mode set");
        self.publish(events);
        Ok(())
    }

    /// Unlocks the status and re-applies the last sensor reading.
    ///
    /// # Errors
    ///
    /// [`DmError::DeviceNotSupport`] on a non-foldable device.
    pub fn restore_physical_fold_status(&self) -> Result<(), DmError> {
        self.require_foldable()?;
        let restored = {
            let mut state = self.lock();
            state.fold.locked = false;
            if state.fold.status == state.fold.physical_status {
                None
            } else {
                state.fold.status = state.fold.physical_status;
                Some(state.fold.status)
            }
        };
        if let Some(status) = restored {
            info!(?status, "physical fold status restored");
            self.hub.notify(&AgentEvent::FoldStatusChanged(status));
        }
        Ok(())
    }

    /// [`FoldStatus::Unknown`] on a non-foldable device.
    pub fn get_fold_status(&self) -> FoldStatus {
        if !self.fold_capability.foldable {
            return FoldStatus::Unknown;
        }
        self.lock().fold.status
    }

    pub fn get_fold_display_mode(&self) -> FoldDisplayMode {
        if !self.fold_capability.foldable {
            return FoldDisplayMode::Unknown;
        }
        self.lock().fold.mode
    }

    /// Crease of the default display; `None` on a non-foldable device.
    pub fn get_current_fold_crease_region(&self) -> Option<FoldCreaseRegion> {
        if !self.fold_capability.foldable {
            return None;
        }
        Some(FoldCreaseRegion {
            display_id: self.default_display_id(),
            rects: self.fold_capability.crease_rects.clone(),
        })
    }
}

impl ScreenLifecycleObserver for DisplayRegistry {
    fn on_topology_event(&self, event: &TopologyEvent) {
        let mut events = Vec::new();
        {
            let mut state = self.lock();
            match event {
                TopologyEvent::JoinedGroup { screen, group } => match group.combination {
                    CombinationMode::Mirror => state.destroy_display_of(screen.id, &mut events),
                    CombinationMode::Alone | CombinationMode::Expand => {
                        self.ensure_display(&mut state, screen, &mut events)
                    }
                },
                TopologyEvent::LeftGroup { screen, group, reason } => {
                    if *reason == LeaveReason::Detached && group.combination == CombinationMode::Mirror {
                        self.ensure_display(&mut state, screen, &mut events);
                    }
                }
                TopologyEvent::Disconnected(id) => state.destroy_display_of(*id, &mut events),
                TopologyEvent::BecameUnique { screen, display_id } => {
                    state.destroy_display_of(screen.id, &mut events);
                    state.create_display(*display_id, screen, &mut events);
                }
                TopologyEvent::Changed { info, event } => {
                    if let Some(display) = state.display_of_mut(info.id) {
                        if display.refresh_from_screen(info) {
                            let change = match event {
                                ScreenChangeEvent::UpdateRotation => DisplayChangeEvent::UpdateRotation,
                                ScreenChangeEvent::ChangeMode => DisplayChangeEvent::DisplaySizeChanged,
                            };
                            events.push(AgentEvent::DisplayChange {
                                info: display.clone(),
                                event: change,
                            });
                        }
                    }
                }
                TopologyEvent::Connected(_) | TopologyEvent::GroupDissolved(_) => {}
            }
        }
        self.publish(events);
    }
}
