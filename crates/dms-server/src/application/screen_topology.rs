//! ScreenTopologyController: the authoritative graph of screens and groups.
//!
//! Every physical and virtual screen, and every group that combines them, is
//! a [`ScreenEntity`] owned by this controller.  All mutations run under one
//! `Mutex` and restore the group invariant before the lock is released:
//!
//! > a screen's `parent` is the id of the one group whose child list
//! > contains it, or `None` when no group lists it.
//!
//! # Moving a screen between groups (for beginners)
//!
//! Re-parenting is always "detach, then attach":
//!
//! ```text
//!   detach(screen)          ── phase 1: unlink from the old group
//!   dissolve_if_empty(old)  ── phase 2: drop the old group if childless
//!   attach(screen, new)     ── link into the new group
//! ```
//!
//! Splitting removal into two plain functions over `&mut TopologyState` means
//! no operation ever needs to re-acquire the lock it already holds.
//!
//! # Events
//!
//! Mutations collect [`TopologyEvent`]s while the lock is held.  Once it is
//! released they are delivered in order, first to the registered
//! [`ScreenLifecycleObserver`]s (the display registry) and then to the
//! [`AgentNotificationHub`] as screen events.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use dms_core::domain::screen::{GroupData, ScreenEntity};
use dms_core::{
    ColorGamut, CombinationMode, DisplayId, DmError, IdAllocator, PhysicalScreenOptions, Point, Rotation,
    ScreenGroupInfo, ScreenId, ScreenInfo, ScreenKind, ScreenPowerState, SurfaceHandle, VirtualScreenOption,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::agent_hub::{AgentEvent, AgentNotificationHub, ScreenChangeEvent, ScreenGroupChangeEvent};

/// Render-engine ids handed to virtual screens start here so they never
/// collide with ids reported by physical hardware.
const VIRTUAL_RS_ID_BASE: u64 = 1000;

/// Why a screen left its group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveReason {
    /// The screen is alive and standalone (or about to join another group).
    Detached,
    /// The screen is being destroyed.
    Destroyed,
    /// The screen is becoming a unique composition target.
    MadeUnique,
}

/// A change to the topology, delivered after the lock is released.
#[derive(Debug, Clone, PartialEq)]
pub enum TopologyEvent {
    Connected(ScreenInfo),
    Disconnected(ScreenId),
    Changed {
        info: ScreenInfo,
        event: ScreenChangeEvent,
    },
    JoinedGroup {
        screen: ScreenInfo,
        group: ScreenGroupInfo,
    },
    /// `group` is the membership after the screen was removed.
    LeftGroup {
        screen: ScreenInfo,
        group: ScreenGroupInfo,
        reason: LeaveReason,
    },
    GroupDissolved(ScreenId),
    BecameUnique {
        screen: ScreenInfo,
        display_id: DisplayId,
    },
}

/// Receives topology changes synchronously, in mutation order.
pub trait ScreenLifecycleObserver: Send + Sync {
    fn on_topology_event(&self, event: &TopologyEvent);
}

/// Rotation handling for screens made unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UniqueScreenRotationOptions {
    /// When set, the screen is pinned to `rotation`.
    pub is_rotation_locked: bool,
    pub rotation: Rotation,
}

/// Serializable view of the whole topology.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopologySnapshot {
    pub default_screen: Option<ScreenId>,
    pub screens: Vec<ScreenInfo>,
    pub groups: Vec<ScreenGroupInfo>,
}

// ── Locked state ──────────────────────────────────────────────────────────────

#[derive(Default)]
struct TopologyState {
    /// Leaf screens and groups, keyed by logical id.
    screens: BTreeMap<ScreenId, ScreenEntity>,
    rs_to_screen: HashMap<u64, ScreenId>,
    default_screen: Option<ScreenId>,
    /// Group that newly connected physical screens join.
    default_group: Option<ScreenId>,
}

impl TopologyState {
    fn parent_of(&self, id: ScreenId) -> Option<ScreenId> {
        self.screens.get(&id).and_then(|s| s.parent)
    }

    fn combination_of(&self, group_id: ScreenId) -> Option<CombinationMode> {
        self.screens
            .get(&group_id)
            .and_then(ScreenEntity::group_data)
            .map(|g| g.combination)
    }

    fn screen_info(&self, id: ScreenId) -> Option<ScreenInfo> {
        self.screens.get(&id).map(ScreenEntity::to_info)
    }

    fn group_info(&self, id: ScreenId) -> Option<ScreenGroupInfo> {
        self.screens.get(&id).and_then(ScreenEntity::to_group_info)
    }

    /// Fails with `InvalidParam` unless every id names a live leaf screen.
    fn require_leaves(&self, ids: &[ScreenId]) -> Result<(), DmError> {
        for id in ids {
            match self.screens.get(id) {
                None => return Err(DmError::InvalidParam(format!("unknown screen {id}"))),
                Some(s) if s.is_group() => {
                    return Err(DmError::InvalidParam(format!("{id} is a screen group")))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    fn leaf_mut(&mut self, id: ScreenId) -> Result<&mut ScreenEntity, DmError> {
        match self.screens.get_mut(&id) {
            Some(s) if !s.is_group() => Ok(s),
            _ => Err(DmError::InvalidScreen(id)),
        }
    }

    fn create_group(&mut self, id: ScreenId, combination: CombinationMode, main: Option<ScreenId>) {
        self.screens
            .insert(id, ScreenEntity::group(id, GroupData::new(combination, main)));
        debug!(group = %id, ?combination, "screen group created");
    }

    /// Phase one of removal: unlink `id` from its group.
    ///
    /// Returns the former group so the caller can run phase two.
    fn detach(&mut self, id: ScreenId, reason: LeaveReason, events: &mut Vec<TopologyEvent>) -> Option<ScreenId> {
        let group_id = self.parent_of(id)?;
        if let Some(screen) = self.screens.get_mut(&id) {
            screen.parent = None;
        }
        let removed = self
            .screens
            .get_mut(&group_id)
            .and_then(ScreenEntity::group_data_mut)
            .map_or(false, |g| g.remove_child(id));
        if !removed {
            warn!(screen = %id, group = %group_id, "parent group did not list screen");
            return None;
        }
        if let (Some(screen), Some(group)) = (self.screen_info(id), self.group_info(group_id)) {
            events.push(TopologyEvent::LeftGroup { screen, group, reason });
        }
        Some(group_id)
    }

    /// Phase two of removal: drop `group_id` if it has no children left.
    fn dissolve_if_empty(&mut self, group_id: ScreenId, events: &mut Vec<TopologyEvent>) -> bool {
        let empty = self
            .screens
            .get(&group_id)
            .and_then(ScreenEntity::group_data)
            .map_or(false, GroupData::is_empty);
        if !empty {
            return false;
        }
        self.screens.remove(&group_id);
        if self.default_group == Some(group_id) {
            self.default_group = None;
        }
        info!(group = %group_id, "screen group dissolved");
        events.push(TopologyEvent::GroupDissolved(group_id));
        true
    }

    fn detach_and_dissolve(&mut self, id: ScreenId, reason: LeaveReason, events: &mut Vec<TopologyEvent>) {
        if let Some(group_id) = self.detach(id, reason, events) {
            self.dissolve_if_empty(group_id, events);
        }
    }

    fn attach(&mut self, id: ScreenId, group_id: ScreenId, start_point: Point, events: &mut Vec<TopologyEvent>) {
        let Some(group) = self.screens.get_mut(&group_id).and_then(ScreenEntity::group_data_mut) else {
            warn!(group = %group_id, "attach target is not a group");
            return;
        };
        group.add_child(id, start_point);
        if let Some(screen) = self.screens.get_mut(&id) {
            screen.parent = Some(group_id);
        }
        if let (Some(screen), Some(group)) = (self.screen_info(id), self.group_info(group_id)) {
            events.push(TopologyEvent::JoinedGroup { screen, group });
        }
    }

    /// Mirror groups whose source is `main`.
    fn mirror_groups_of(&self, main: ScreenId) -> Vec<ScreenId> {
        self.screens
            .values()
            .filter(|s| {
                s.group_data()
                    .map_or(false, |g| g.combination == CombinationMode::Mirror && g.main_screen == Some(main))
            })
            .map(|s| s.id)
            .collect()
    }

    fn stop_mirrors_of(&mut self, main: ScreenId, events: &mut Vec<TopologyEvent>) {
        for group_id in self.mirror_groups_of(main) {
            let children = self
                .screens
                .get(&group_id)
                .and_then(ScreenEntity::group_data)
                .map(GroupData::child_ids)
                .unwrap_or_default();
            for child in children {
                self.detach(child, LeaveReason::Detached, events);
            }
            self.dissolve_if_empty(group_id, events);
        }
    }

    /// Removes a leaf screen and everything that depended on it.
    fn erase_screen(&mut self, id: ScreenId, events: &mut Vec<TopologyEvent>) {
        self.stop_mirrors_of(id, events);
        self.detach_and_dissolve(id, LeaveReason::Destroyed, events);
        if let Some(screen) = self.screens.remove(&id) {
            if let Some(rs_id) = screen.rs_id {
                self.rs_to_screen.remove(&rs_id);
            }
        }
        if self.default_screen == Some(id) {
            self.default_screen = self
                .screens
                .values()
                .find(|s| s.kind == ScreenKind::Physical)
                .map(|s| s.id);
        }
        events.push(TopologyEvent::Disconnected(id));
    }

    fn stop_combination(
        &mut self,
        ids: &[ScreenId],
        combination: CombinationMode,
        events: &mut Vec<TopologyEvent>,
    ) -> Result<(), DmError> {
        self.require_leaves(ids)?;
        for &id in ids {
            match self.parent_of(id) {
                Some(group_id) if self.combination_of(group_id) == Some(combination) => {
                    self.detach_and_dissolve(id, LeaveReason::Detached, events);
                }
                _ => debug!(screen = %id, ?combination, "screen not in such a group, skipping"),
            }
        }
        Ok(())
    }
}

fn dedup(ids: &[ScreenId]) -> Vec<ScreenId> {
    let mut out: Vec<ScreenId> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(id) {
            out.push(*id);
        }
    }
    out
}

fn to_agent_event(event: &TopologyEvent) -> Option<AgentEvent> {
    match event {
        TopologyEvent::Connected(info) => Some(AgentEvent::ScreenConnect(info.clone())),
        TopologyEvent::Disconnected(id) => Some(AgentEvent::ScreenDisconnect(*id)),
        TopologyEvent::Changed { info, event } => Some(AgentEvent::ScreenChange {
            info: info.clone(),
            event: *event,
        }),
        TopologyEvent::JoinedGroup { screen, group } => Some(AgentEvent::ScreenGroupChange {
            group_id: group.id,
            screens: vec![screen.clone()],
            event: ScreenGroupChangeEvent::AddToGroup,
        }),
        TopologyEvent::LeftGroup { screen, group, .. } => Some(AgentEvent::ScreenGroupChange {
            group_id: group.id,
            screens: vec![screen.clone()],
            event: ScreenGroupChangeEvent::RemoveFromGroup,
        }),
        TopologyEvent::GroupDissolved(id) => Some(AgentEvent::ScreenGroupChange {
            group_id: *id,
            screens: Vec::new(),
            event: ScreenGroupChangeEvent::GroupDissolved,
        }),
        TopologyEvent::BecameUnique { .. } => None,
    }
}

// ── Controller ────────────────────────────────────────────────────────────────

/// Owner of every screen and screen group.
pub struct ScreenTopologyController {
    state: Mutex<TopologyState>,
    /// Shared by leaf screens and groups.
    screen_ids: IdAllocator,
    /// Shared with the display registry.
    display_ids: Arc<IdAllocator>,
    virtual_rs_ids: IdAllocator,
    observers: RwLock<Vec<Arc<dyn ScreenLifecycleObserver>>>,
    hub: Arc<dyn AgentNotificationHub>,
}

impl ScreenTopologyController {
    pub fn new(display_ids: Arc<IdAllocator>, hub: Arc<dyn AgentNotificationHub>) -> Self {
        Self {
            state: Mutex::new(TopologyState::default()),
            screen_ids: IdAllocator::new(),
            display_ids,
            virtual_rs_ids: IdAllocator::starting_at(VIRTUAL_RS_ID_BASE),
            observers: RwLock::new(Vec::new()),
            hub,
        }
    }

    /// Adds an observer that sees every subsequent [`TopologyEvent`].
    pub fn add_observer(&self, observer: Arc<dyn ScreenLifecycleObserver>) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    fn lock(&self) -> MutexGuard<'_, TopologyState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` under the lock, then delivers the events it produced.
    ///
    /// `f` must validate before it mutates: on `Err` the state is expected to
    /// be untouched, and any events already collected are still delivered.
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut TopologyState, &mut Vec<TopologyEvent>) -> Result<T, DmError>,
    ) -> Result<T, DmError> {
        let mut events = Vec::new();
        let result = {
            let mut state = self.lock();
            f(&mut state, &mut events)
        };
        self.dispatch(events);
        result
    }

    fn dispatch(&self, events: Vec<TopologyEvent>) {
        if events.is_empty() {
            return;
        }
        let observers = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for event in &events {
            for observer in &observers {
                observer.on_topology_event(event);
            }
            if let Some(agent_event) = to_agent_event(event) {
                self.hub.notify(&agent_event);
            }
        }
    }

    // ── Physical hot-plug ─────────────────────────────────────────────────────

    /// Registers a physical panel reported by the render engine.
    ///
    /// The first physical screen becomes the default screen and gets a fresh
    /// ALONE group; later ones join the default group.
    ///
    /// # Errors
    ///
    /// [`DmError::InvalidParam`] for an empty mode list, an out-of-range active
    /// mode, a non-positive pixel ratio, or an already-connected `rs_id`.
    pub fn on_physical_screen_connect(&self, rs_id: u64, options: PhysicalScreenOptions) -> Result<ScreenId, DmError> {
        if options.modes.is_empty() {
            return Err(DmError::InvalidParam("physical screen reports no modes".into()));
        }
        if options.active_mode >= options.modes.len() {
            return Err(DmError::InvalidParam(format!(
                "active mode {} out of range ({} modes)",
                options.active_mode,
                options.modes.len()
            )));
        }
        if !(options.virtual_pixel_ratio > 0.0) {
            return Err(DmError::InvalidParam("virtual pixel ratio must be positive".into()));
        }
        self.mutate(|state, events| {
            if state.rs_to_screen.contains_key(&rs_id) {
                return Err(DmError::InvalidParam(format!("render screen {rs_id} already connected")));
            }
            let id = self.screen_ids.next_screen_id();
            let entity = ScreenEntity::physical(id, rs_id, &options);
            events.push(TopologyEvent::Connected(entity.to_info()));
            state.screens.insert(id, entity);
            state.rs_to_screen.insert(rs_id, id);
            if state.default_screen.is_none() {
                state.default_screen = Some(id);
            }
            let group_id = match state.default_group {
                Some(group_id) => group_id,
                None => {
                    let group_id = self.screen_ids.next_screen_id();
                    state.create_group(group_id, CombinationMode::Alone, Some(id));
                    state.default_group = Some(group_id);
                    group_id
                }
            };
            state.attach(id, group_id, Point::default(), events);
            info!(screen = %id, rs_id, name = %options.name, "physical screen connected");
            Ok(id)
        })
    }

    /// Removes the physical screen bound to `rs_id`.
    ///
    /// # Errors
    ///
    /// [`DmError::InvalidParam`] if no screen is bound to `rs_id`.
    pub fn on_physical_screen_disconnect(&self, rs_id: u64) -> Result<ScreenId, DmError> {
        self.mutate(|state, events| {
            let id = *state
                .rs_to_screen
                .get(&rs_id)
                .ok_or_else(|| DmError::InvalidParam(format!("render screen {rs_id} is not connected")))?;
            state.erase_screen(id, events);
            info!(screen = %id, rs_id, "physical screen disconnected");
            Ok(id)
        })
    }

    // ── Virtual screens ───────────────────────────────────────────────────────

    /// Creates a virtual screen that belongs to no group.
    ///
    /// # Errors
    ///
    /// [`DmError::InvalidParam`] for a zero width or height or a non-positive
    /// density.
    pub fn create_virtual_screen(&self, option: VirtualScreenOption) -> Result<ScreenId, DmError> {
        if option.width == 0 || option.height == 0 {
            return Err(DmError::InvalidParam(format!(
                "virtual screen size {}x{} is empty",
                option.width, option.height
            )));
        }
        if !(option.density > 0.0) {
            return Err(DmError::InvalidParam("virtual screen density must be positive".into()));
        }
        self.mutate(|state, events| {
            let id = self.screen_ids.next_screen_id();
            let rs_id = self.virtual_rs_ids.next();
            let entity = ScreenEntity::virtual_screen(id, rs_id, &option);
            events.push(TopologyEvent::Connected(entity.to_info()));
            state.screens.insert(id, entity);
            state.rs_to_screen.insert(rs_id, id);
            info!(screen = %id, name = %option.name, width = option.width, height = option.height, "virtual screen created");
            Ok(id)
        })
    }

    /// Destroys a virtual screen.  If it was the last child of a group the
    /// group dissolves; if it was the source of a mirror, that mirror stops.
    ///
    /// # Errors
    ///
    /// [`DmError::InvalidScreen`] if `id` is unknown or not a virtual screen.
    pub fn destroy_virtual_screen(&self, id: ScreenId) -> Result<(), DmError> {
        self.mutate(|state, events| {
            match state.screens.get(&id) {
                Some(s) if s.is_virtual() => {}
                _ => return Err(DmError::InvalidScreen(id)),
            }
            state.erase_screen(id, events);
            info!(screen = %id, "virtual screen destroyed");
            Ok(())
        })
    }

    /// Sets or clears the consumer surface of a virtual screen.
    ///
    /// # Errors
    ///
    /// [`DmError::InvalidScreen`] if `id` is unknown or not virtual.
    pub fn set_virtual_screen_surface(&self, id: ScreenId, surface: Option<SurfaceHandle>) -> Result<(), DmError> {
        let mut state = self.lock();
        match state.screens.get_mut(&id) {
            Some(s) if s.is_virtual() => {
                s.surface = surface;
                debug!(screen = %id, ?surface, "virtual screen surface set");
                Ok(())
            }
            _ => Err(DmError::InvalidScreen(id)),
        }
    }

    // ── Composition ───────────────────────────────────────────────────────────

    /// Mirrors `main_screen` onto `mirror_ids`.
    ///
    /// Reuses the existing MIRROR group of `main_screen` when there is one.
    /// The main screen is the group's source, not one of its children.
    ///
    /// # Errors
    ///
    /// [`DmError::InvalidParam`] for an empty mirror list, a self-mirror, or
    /// any unknown or group id.  Nothing changes on error.
    pub fn make_mirror(&self, main_screen: ScreenId, mirror_ids: &[ScreenId]) -> Result<ScreenId, DmError> {
        self.mutate(|state, events| {
            if mirror_ids.is_empty() {
                return Err(DmError::InvalidParam("mirror screen list is empty".into()));
            }
            if mirror_ids.contains(&main_screen) {
                return Err(DmError::InvalidParam(format!("{main_screen} cannot mirror itself")));
            }
            state.require_leaves(&[main_screen])?;
            state.require_leaves(mirror_ids)?;

            let group_id = match state.mirror_groups_of(main_screen).first() {
                Some(&group_id) => group_id,
                None => {
                    let group_id = self.screen_ids.next_screen_id();
                    state.create_group(group_id, CombinationMode::Mirror, Some(main_screen));
                    group_id
                }
            };
            for id in dedup(mirror_ids) {
                if state.parent_of(id) == Some(group_id) {
                    continue;
                }
                state.detach_and_dissolve(id, LeaveReason::Detached, events);
                state.attach(id, group_id, Point::default(), events);
            }
            info!(main = %main_screen, group = %group_id, mirrors = mirror_ids.len(), "mirror configured");
            Ok(group_id)
        })
    }

    /// Extends a desktop across `screen_ids`, each at its start point.
    ///
    /// Reuses the first screen's EXPAND group when it has one.
    ///
    /// # Errors
    ///
    /// [`DmError::InvalidParam`] for an empty or duplicated id list, a length
    /// mismatch with `start_points`, or any unknown or group id.
    pub fn make_expand(&self, screen_ids: &[ScreenId], start_points: &[Point]) -> Result<ScreenId, DmError> {
        self.mutate(|state, events| {
            if screen_ids.is_empty() {
                return Err(DmError::InvalidParam("expand screen list is empty".into()));
            }
            if screen_ids.len() != start_points.len() {
                return Err(DmError::InvalidParam(format!(
                    "{} screens but {} start points",
                    screen_ids.len(),
                    start_points.len()
                )));
            }
            if dedup(screen_ids).len() != screen_ids.len() {
                return Err(DmError::InvalidParam("duplicate screen in expand list".into()));
            }
            state.require_leaves(screen_ids)?;

            let first = screen_ids[0];
            let group_id = match state
                .parent_of(first)
                .filter(|g| state.combination_of(*g) == Some(CombinationMode::Expand))
            {
                Some(group_id) => group_id,
                None => {
                    let group_id = self.screen_ids.next_screen_id();
                    state.create_group(group_id, CombinationMode::Expand, Some(first));
                    group_id
                }
            };
            for (&id, &point) in screen_ids.iter().zip(start_points) {
                if state.parent_of(id) == Some(group_id) {
                    if let Some(group) = state.screens.get_mut(&group_id).and_then(ScreenEntity::group_data_mut) {
                        group.add_child(id, point);
                    }
                    continue;
                }
                state.detach_and_dissolve(id, LeaveReason::Detached, events);
                state.attach(id, group_id, point, events);
            }
            info!(group = %group_id, screens = screen_ids.len(), "expand configured");
            Ok(group_id)
        })
    }

    /// Makes each screen a standalone composition target with a fresh
    /// display id.  Returns the display ids in input order.
    ///
    /// # Errors
    ///
    /// [`DmError::InvalidParam`] for an empty list; [`DmError::InvalidScreen`]
    /// for an unknown or group id.
    pub fn make_unique_screen(
        &self,
        screen_ids: &[ScreenId],
        options: UniqueScreenRotationOptions,
    ) -> Result<Vec<DisplayId>, DmError> {
        self.mutate(|state, events| {
            if screen_ids.is_empty() {
                return Err(DmError::InvalidParam("unique screen list is empty".into()));
            }
            for &id in screen_ids {
                match state.screens.get(&id) {
                    Some(s) if !s.is_group() => {}
                    _ => return Err(DmError::InvalidScreen(id)),
                }
            }
            let mut display_ids = Vec::with_capacity(screen_ids.len());
            for id in dedup(screen_ids) {
                state.detach_and_dissolve(id, LeaveReason::MadeUnique, events);
                let screen = state.leaf_mut(id)?;
                if options.is_rotation_locked {
                    screen.rotation = options.rotation;
                }
                let info = screen.to_info();
                let display_id = self.display_ids.next_display_id();
                events.push(TopologyEvent::BecameUnique {
                    screen: info,
                    display_id,
                });
                display_ids.push(display_id);
                info!(screen = %id, display = %display_id, "screen made unique");
            }
            Ok(display_ids)
        })
    }

    /// Removes each screen from its MIRROR group.  Screens not mirrored are
    /// skipped.
    ///
    /// # Errors
    ///
    /// [`DmError::InvalidParam`] for any unknown or group id.
    pub fn stop_mirror(&self, screen_ids: &[ScreenId]) -> Result<(), DmError> {
        self.mutate(|state, events| state.stop_combination(screen_ids, CombinationMode::Mirror, events))
    }

    /// Removes each screen from its EXPAND group.  Screens not expanded are
    /// skipped.
    ///
    /// # Errors
    ///
    /// [`DmError::InvalidParam`] for any unknown or group id.
    pub fn stop_expand(&self, screen_ids: &[ScreenId]) -> Result<(), DmError> {
        self.mutate(|state, events| state.stop_combination(screen_ids, CombinationMode::Expand, events))
    }

    /// Best-effort removal of virtual screens from their groups.
    ///
    /// Unknown ids and screens that are not virtual are skipped: teardown
    /// paths call this after a screen may already be gone.
    pub fn remove_virtual_screen_from_group(&self, screen_ids: &[ScreenId]) {
        let _ = self.mutate(|state, events| {
            for &id in screen_ids {
                match state.screens.get(&id) {
                    Some(s) if s.is_virtual() => state.detach_and_dissolve(id, LeaveReason::Detached, events),
                    Some(_) => debug!(screen = %id, "not a virtual screen, skipping"),
                    None => debug!(screen = %id, "unknown screen, skipping"),
                }
            }
            Ok(())
        });
    }

    // ── Screen properties ─────────────────────────────────────────────────────

    /// Rotates a screen.  90/270 swap the reported width and height.
    ///
    /// # Errors
    ///
    /// [`DmError::InvalidScreen`] if `id` is unknown or a group.
    pub fn request_rotation(&self, id: ScreenId, rotation: Rotation) -> Result<(), DmError> {
        self.mutate(|state, events| {
            let screen = state.leaf_mut(id)?;
            if screen.rotation == rotation {
                return Ok(());
            }
            screen.rotation = rotation;
            events.push(TopologyEvent::Changed {
                info: screen.to_info(),
                event: ScreenChangeEvent::UpdateRotation,
            });
            info!(screen = %id, ?rotation, "screen rotated");
            Ok(())
        })
    }

    /// Switches the active mode of a screen.
    ///
    /// # Errors
    ///
    /// [`DmError::InvalidScreen`] if `id` is unknown or a group;
    /// [`DmError::InvalidParam`] if `mode_index` is out of range.
    pub fn set_screen_active_mode(&self, id: ScreenId, mode_index: usize) -> Result<(), DmError> {
        self.mutate(|state, events| {
            let screen = state.leaf_mut(id)?;
            if mode_index >= screen.modes.len() {
                return Err(DmError::InvalidParam(format!(
                    "mode {mode_index} out of range ({} modes)",
                    screen.modes.len()
                )));
            }
            if screen.active_mode == mode_index {
                return Ok(());
            }
            screen.active_mode = mode_index;
            events.push(TopologyEvent::Changed {
                info: screen.to_info(),
                event: ScreenChangeEvent::ChangeMode,
            });
            info!(screen = %id, mode_index, "active mode changed");
            Ok(())
        })
    }

    /// # Errors
    ///
    /// [`DmError::InvalidScreen`] if `id` is unknown or a group;
    /// [`DmError::DeviceNotSupport`] if the screen reports no gamuts.
    pub fn get_supported_color_gamuts(&self, id: ScreenId) -> Result<Vec<ColorGamut>, DmError> {
        let state = self.lock();
        match state.screens.get(&id) {
            Some(s) if !s.is_group() => {
                if s.color_gamuts.is_empty() {
                    Err(DmError::DeviceNotSupport("color gamut query"))
                } else {
                    Ok(s.color_gamuts.clone())
                }
            }
            _ => Err(DmError::InvalidScreen(id)),
        }
    }

    /// Records the power state of one screen.  Returns `false` for unknown ids.
    pub fn set_screen_power(&self, id: ScreenId, power: ScreenPowerState) -> bool {
        let mut state = self.lock();
        match state.leaf_mut(id) {
            Ok(screen) => {
                screen.power = power;
                debug!(screen = %id, ?power, "screen power set");
                true
            }
            Err(_) => false,
        }
    }

    /// Records the power state of every physical screen; returns how many
    /// screens were updated.
    pub fn set_all_physical_screens_power(&self, power: ScreenPowerState) -> usize {
        let mut state = self.lock();
        let mut count = 0;
        for screen in state.screens.values_mut() {
            if screen.kind == ScreenKind::Physical {
                screen.power = power;
                count += 1;
            }
        }
        count
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn get_screen_info(&self, id: ScreenId) -> Option<ScreenInfo> {
        self.lock().screen_info(id)
    }

    /// Group membership snapshot; `None` for unknown ids and leaf screens.
    pub fn get_screen_group_info(&self, id: ScreenId) -> Option<ScreenGroupInfo> {
        self.lock().group_info(id)
    }

    /// Every screen and group, ordered by id.  Groups have `is_group` set.
    pub fn get_all_screen_infos(&self) -> Vec<ScreenInfo> {
        self.lock().screens.values().map(ScreenEntity::to_info).collect()
    }

    /// Children of a group in insertion order; empty for anything else.
    pub fn get_children(&self, group_id: ScreenId) -> Vec<ScreenId> {
        self.lock()
            .screens
            .get(&group_id)
            .and_then(ScreenEntity::group_data)
            .map(GroupData::child_ids)
            .unwrap_or_default()
    }

    pub fn default_screen_id(&self) -> Option<ScreenId> {
        self.lock().default_screen
    }

    pub fn screen_id_for_rs(&self, rs_id: u64) -> Option<ScreenId> {
        self.lock().rs_to_screen.get(&rs_id).copied()
    }

    pub fn snapshot(&self) -> TopologySnapshot {
        let state = self.lock();
        TopologySnapshot {
            default_screen: state.default_screen,
            screens: state
                .screens
                .values()
                .filter(|s| !s.is_group())
                .map(ScreenEntity::to_info)
                .collect(),
            groups: state.screens.values().filter_map(ScreenEntity::to_group_info).collect(),
        }
    }
}
