//! Session lifecycle: the server-side state of one window.
//!
//! # State machine (for beginners)
//!
//! ```text
//!             connect            foreground
//!  DISCONNECT ───────► CONNECT ─────────────► FOREGROUND ◄──┐
//!      ▲                                       │  ▲  │      │ set_active(false)
//!      │ disconnect (from any state)  set_active(true) │      │
//!      │                                       ▼  │  ▼      │
//!      │                                  ACTIVE ──► INACTIVE
//!      │                                       │        │
//!      │                  background           ▼        ▼
//!      └───────────────────────────────── BACKGROUND ◄──┘
//! ```
//!
//! FOREGROUND, ACTIVE and INACTIVE form the *foreground family*: the window
//! is on screen, and ACTIVE/INACTIVE only say whether it has focus.
//!
//! A [`Session`] does not lock.  Each one is driven from a single
//! serialising caller; [`SessionRegistry`] is the owner and is itself shared
//! behind one `Mutex` (see [`SessionRectUpdater`]).
//!
//! # Dialogs
//!
//! A main window keeps the ids of its dialogs in creation order.  While any
//! of them is in the foreground family, pointer-downs on the main window
//! are redirected to the top dialog, and key events to the main window and
//! its sub-windows are refused.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use dms_core::{DmError, HotZoneConfig, PersistentId, Rect};
use tracing::{debug, info, warn};

use super::move_drag::{MoveDragController, MoveDragListener};
use crate::infrastructure::vsync::VsyncStation;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Disconnect,
    Connect,
    Foreground,
    Active,
    Inactive,
    Background,
}

impl SessionState {
    pub fn is_foreground_family(self) -> bool {
        matches!(self, SessionState::Foreground | SessionState::Active | SessionState::Inactive)
    }
}

/// Why a window rect changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizeChangeReason {
    #[default]
    Undefined,
    Move,
    Resize,
    Rotation,
    Drag,
    DragStart,
    DragMove,
    DragEnd,
}

impl SizeChangeReason {
    /// Reasons whose rect is not final until the gesture ends.
    pub fn is_drag_class(self) -> bool {
        matches!(
            self,
            SizeChangeReason::Drag | SizeChangeReason::DragStart | SizeChangeReason::DragMove
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowType {
    AppMainWindow,
    AppSubWindow,
    Dialog,
    SystemFloat,
    StatusBar,
}

impl WindowType {
    /// System windows may connect without a surface node.
    pub fn is_system(self) -> bool {
        matches!(self, WindowType::SystemFloat | WindowType::StatusBar)
    }

    pub fn is_sub_or_dialog(self) -> bool {
        matches!(self, WindowType::AppSubWindow | WindowType::Dialog)
    }
}

/// Client-side half of a session.
#[cfg_attr(test, mockall::automock)]
pub trait SessionStage: Send + Sync {
    /// # Errors
    ///
    /// Any error means the client could not be reached.
    fn update_rect(&self, rect: Rect, reason: SizeChangeReason) -> Result<(), DmError>;

    /// # Errors
    ///
    /// Any error means the client could not be reached.
    fn set_active(&self, active: bool) -> Result<(), DmError>;
}

/// Render-tree node backing a session.
#[cfg_attr(test, mockall::automock)]
pub trait SurfaceNode: Send + Sync {
    fn id(&self) -> u64;
    fn set_bounds(&self, rect: Rect);
}

/// Invoked with the new state after every transition.
pub type PatternCallback = Box<dyn Fn(PersistentId, SessionState) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub persistent_id: PersistentId,
    pub name: String,
    pub window_type: WindowType,
    pub parent_id: Option<PersistentId>,
    /// Modal windows keep receiving pointer-downs while a dialog is shown.
    pub is_modal: bool,
}

/// The server-side state of one window.
pub struct Session {
    info: SessionInfo,
    state: SessionState,
    stage: Option<Arc<dyn SessionStage>>,
    surface: Option<Arc<dyn SurfaceNode>>,
    rect: Rect,
    reason: SizeChangeReason,
    rect_provisional: bool,
    focusable: bool,
    touchable: bool,
    focused: bool,
    /// Dialog children, oldest first.
    dialogs: Vec<PersistentId>,
    pattern_callback: Option<PatternCallback>,
}

impl Session {
    pub fn new(info: SessionInfo) -> Self {
        Self {
            info,
            state: SessionState::Disconnect,
            stage: None,
            surface: None,
            rect: Rect::default(),
            reason: SizeChangeReason::Undefined,
            rect_provisional: false,
            focusable: true,
            touchable: true,
            focused: false,
            dialogs: Vec::new(),
            pattern_callback: None,
        }
    }

    pub fn persistent_id(&self) -> PersistentId {
        self.info.persistent_id
    }

    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn size_change_reason(&self) -> SizeChangeReason {
        self.reason
    }

    /// `true` while the cached rect comes from an unfinished drag.
    pub fn is_rect_provisional(&self) -> bool {
        self.rect_provisional
    }

    pub fn surface_id(&self) -> Option<u64> {
        self.surface.as_ref().map(|s| s.id())
    }

    pub fn dialogs(&self) -> &[PersistentId] {
        &self.dialogs
    }

    pub fn is_focusable(&self) -> bool {
        self.focusable
    }

    pub fn set_focusable(&mut self, focusable: bool) {
        self.focusable = focusable;
    }

    pub fn is_touchable(&self) -> bool {
        self.touchable
    }

    pub fn set_touchable(&mut self, touchable: bool) {
        self.touchable = touchable;
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Focus follows the flag only for focusable windows.
    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused && self.focusable;
    }

    pub fn set_pattern_callback(&mut self, callback: PatternCallback) {
        self.pattern_callback = Some(callback);
    }

    fn invalid(&self, reason: &str) -> DmError {
        DmError::invalid_session(self.info.persistent_id, format!("{reason} (state {:?})", self.state))
    }

    fn transition(&mut self, next: SessionState) {
        let previous = std::mem::replace(&mut self.state, next);
        info!(session = self.info.persistent_id, from = ?previous, to = ?next, "session state changed");
        if let Some(callback) = &self.pattern_callback {
            callback(self.info.persistent_id, next);
        }
    }

    // ── Transitions ───────────────────────────────────────────────────────────

    /// Binds the client stage and render surface.
    ///
    /// # Errors
    ///
    /// - [`DmError::InvalidSession`] unless the session is disconnected.
    /// - [`DmError::NullReference`] without a stage, or without a surface for
    ///   a non-system window.
    pub fn connect(
        &mut self,
        stage: Option<Arc<dyn SessionStage>>,
        surface: Option<Arc<dyn SurfaceNode>>,
    ) -> Result<(), DmError> {
        if self.state != SessionState::Disconnect {
            return Err(self.invalid("connect requires a disconnected session"));
        }
        let stage = stage.ok_or(DmError::NullReference("session stage"))?;
        if surface.is_none() && !self.info.window_type.is_system() {
            return Err(DmError::NullReference("surface node"));
        }
        self.stage = Some(stage);
        self.surface = surface;
        self.transition(SessionState::Connect);
        Ok(())
    }

    /// # Errors
    ///
    /// [`DmError::InvalidSession`] unless the session is connected, in the
    /// background, or inactive.
    pub fn foreground(&mut self) -> Result<(), DmError> {
        match self.state {
            SessionState::Connect | SessionState::Background | SessionState::Inactive => {
                self.transition(SessionState::Foreground);
                Ok(())
            }
            _ => Err(self.invalid("foreground not allowed")),
        }
    }

    /// An active session is deactivated first.
    ///
    /// # Errors
    ///
    /// [`DmError::InvalidSession`] unless the session is in the foreground
    /// family.
    pub fn background(&mut self) -> Result<(), DmError> {
        if !self.state.is_foreground_family() {
            return Err(self.invalid("background not allowed"));
        }
        if self.state == SessionState::Active {
            self.set_active(false)?;
        }
        self.transition(SessionState::Background);
        Ok(())
    }

    /// # Errors
    ///
    /// [`DmError::InvalidSession`] outside the foreground family;
    /// [`DmError::IpcFailed`] if the client could not be told.
    pub fn set_active(&mut self, active: bool) -> Result<(), DmError> {
        if !self.state.is_foreground_family() {
            return Err(self.invalid("activation requires a foreground session"));
        }
        let next = match (active, self.state) {
            (true, SessionState::Active) | (false, SessionState::Inactive | SessionState::Foreground) => {
                return Ok(())
            }
            (true, _) => SessionState::Active,
            (false, _) => SessionState::Inactive,
        };
        if let Some(stage) = &self.stage {
            stage
                .set_active(active)
                .map_err(|e| DmError::IpcFailed(e.to_string()))?;
        }
        self.transition(next);
        Ok(())
    }

    /// Releases the client stage and surface.  Always succeeds; calling it on
    /// a disconnected session does nothing.
    pub fn disconnect(&mut self) -> Result<(), DmError> {
        if self.state == SessionState::Disconnect {
            debug!(session = self.info.persistent_id, "already disconnected");
            return Ok(());
        }
        self.stage = None;
        self.surface = None;
        self.rect_provisional = false;
        self.transition(SessionState::Disconnect);
        Ok(())
    }

    /// Pushes `rect` to the client and the render surface, then caches it.
    ///
    /// # Errors
    ///
    /// [`DmError::InvalidSession`] outside the foreground family;
    /// [`DmError::IpcFailed`] if the client rejects the update.
    pub fn update_rect(&mut self, rect: Rect, reason: SizeChangeReason) -> Result<(), DmError> {
        if !self.state.is_foreground_family() {
            return Err(self.invalid("update_rect requires a foreground session"));
        }
        if let Some(stage) = &self.stage {
            stage
                .update_rect(rect, reason)
                .map_err(|e| DmError::IpcFailed(e.to_string()))?;
        }
        if let Some(surface) = &self.surface {
            surface.set_bounds(rect);
        }
        self.rect = rect;
        self.reason = reason;
        self.rect_provisional = reason.is_drag_class();
        debug!(session = self.info.persistent_id, ?rect, ?reason, "session rect updated");
        Ok(())
    }
}

// ── Registry ──────────────────────────────────────────────────────────────────

/// Where a pointer-down ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerDispatch {
    /// Delivered to the window that was hit.
    Dispatched,
    /// A foreground dialog took it instead.
    RedirectedToDialog(PersistentId),
    /// Swallowed: a dialog of the window's parent is on top.
    Blocked,
}

/// Owns every session by persistent id.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: BTreeMap<PersistentId, Session>,
    next_id: PersistentId,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn unknown(id: PersistentId) -> DmError {
        DmError::invalid_session(id, "unknown session")
    }

    /// Creates a disconnected session.  A dialog with a parent is bound to it.
    ///
    /// # Errors
    ///
    /// [`DmError::InvalidSession`] if `parent_id` names no session.
    pub fn create_session(
        &mut self,
        name: impl Into<String>,
        window_type: WindowType,
        parent_id: Option<PersistentId>,
    ) -> Result<PersistentId, DmError> {
        if let Some(parent) = parent_id {
            if !self.sessions.contains_key(&parent) {
                return Err(Self::unknown(parent));
            }
        }
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        let info = SessionInfo {
            persistent_id: id,
            name: name.into(),
            window_type,
            parent_id,
            is_modal: false,
        };
        info!(session = id, name = %info.name, ?window_type, "session created");
        self.sessions.insert(id, Session::new(info));
        if let (WindowType::Dialog, Some(parent)) = (window_type, parent_id) {
            self.bind_dialog(parent, id)?;
        }
        Ok(id)
    }

    pub fn get(&self, id: PersistentId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: PersistentId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// # Errors
    ///
    /// [`DmError::InvalidSession`] if either id is unknown.
    pub fn set_modal(&mut self, id: PersistentId, modal: bool) -> Result<(), DmError> {
        let session = self.sessions.get_mut(&id).ok_or_else(|| Self::unknown(id))?;
        session.info.is_modal = modal;
        Ok(())
    }

    /// Appends `dialog` to `parent`'s dialog list.
    ///
    /// # Errors
    ///
    /// [`DmError::InvalidSession`] if either id is unknown.
    pub fn bind_dialog(&mut self, parent: PersistentId, dialog: PersistentId) -> Result<(), DmError> {
        if !self.sessions.contains_key(&dialog) {
            return Err(Self::unknown(dialog));
        }
        let parent_session = self.sessions.get_mut(&parent).ok_or_else(|| Self::unknown(parent))?;
        if !parent_session.dialogs.contains(&dialog) {
            parent_session.dialogs.push(dialog);
        }
        if let Some(dialog_session) = self.sessions.get_mut(&dialog) {
            dialog_session.info.parent_id = Some(parent);
        }
        debug!(parent, dialog, "dialog bound");
        Ok(())
    }

    fn dialog_showing(&self, dialog: PersistentId) -> bool {
        self.sessions
            .get(&dialog)
            .map_or(false, |d| d.state.is_foreground_family())
    }

    /// `true` if any dialog of `parent` is in the foreground family.
    pub fn check_dialog_on_foreground(&self, parent: PersistentId) -> bool {
        self.sessions
            .get(&parent)
            .map_or(false, |p| p.dialogs.iter().any(|d| self.dialog_showing(*d)))
    }

    /// The most recently bound dialog of `parent` that is showing.
    pub fn top_dialog(&self, parent: PersistentId) -> Option<PersistentId> {
        let session = self.sessions.get(&parent)?;
        session.dialogs.iter().rev().copied().find(|d| self.dialog_showing(*d))
    }

    /// Applies the dialog-on-top rule to a pointer-down on `id`.
    ///
    /// # Errors
    ///
    /// [`DmError::InvalidSession`] if `id` is unknown.
    pub fn process_point_down(&self, id: PersistentId) -> Result<PointerDispatch, DmError> {
        let session = self.sessions.get(&id).ok_or_else(|| Self::unknown(id))?;
        let dispatch = match (session.info.window_type, session.info.parent_id) {
            (WindowType::Dialog, Some(parent)) if self.check_dialog_on_foreground(parent) => {
                match self.top_dialog(parent) {
                    Some(top) if top != id => PointerDispatch::RedirectedToDialog(top),
                    _ => PointerDispatch::Dispatched,
                }
            }
            (WindowType::AppSubWindow, Some(parent))
                if !session.info.is_modal && self.check_dialog_on_foreground(parent) =>
            {
                PointerDispatch::Blocked
            }
            (window_type, _)
                if !window_type.is_sub_or_dialog()
                    && !session.info.is_modal
                    && self.check_dialog_on_foreground(id) =>
            {
                self.top_dialog(id)
                    .map_or(PointerDispatch::Dispatched, PointerDispatch::RedirectedToDialog)
            }
            _ => PointerDispatch::Dispatched,
        };
        debug!(session = id, ?dispatch, "pointer down processed");
        Ok(dispatch)
    }

    /// Checks whether a key event may reach `id`.
    ///
    /// # Errors
    ///
    /// [`DmError::InvalidSession`] for unknown or disconnected sessions;
    /// [`DmError::InvalidPermission`] while a dialog covers the window.
    pub fn transfer_key_event(&self, id: PersistentId) -> Result<(), DmError> {
        let session = self.sessions.get(&id).ok_or_else(|| Self::unknown(id))?;
        if session.state == SessionState::Disconnect {
            return Err(DmError::invalid_session(id, "session is disconnected"));
        }
        let blocked = match (session.info.window_type, session.info.parent_id) {
            (WindowType::Dialog, Some(parent)) => {
                self.check_dialog_on_foreground(parent) && self.top_dialog(parent) != Some(id)
            }
            (WindowType::AppSubWindow, Some(parent)) => self.check_dialog_on_foreground(parent),
            _ => self.check_dialog_on_foreground(id),
        };
        if blocked {
            return Err(DmError::InvalidPermission(format!("session {id} is covered by a dialog")));
        }
        Ok(())
    }

    /// # Errors
    ///
    /// [`DmError::InvalidSession`] for unknown ids, plus anything
    /// [`Session::update_rect`] returns.
    pub fn update_rect(&mut self, id: PersistentId, rect: Rect, reason: SizeChangeReason) -> Result<(), DmError> {
        self.sessions
            .get_mut(&id)
            .ok_or_else(|| Self::unknown(id))?
            .update_rect(rect, reason)
    }

    /// Disconnects and forgets a session, unbinding it from its parent.
    ///
    /// # Errors
    ///
    /// [`DmError::InvalidSession`] for unknown ids.
    pub fn remove_session(&mut self, id: PersistentId) -> Result<(), DmError> {
        let mut session = self.sessions.remove(&id).ok_or_else(|| Self::unknown(id))?;
        session.disconnect()?;
        if let Some(parent) = session.info.parent_id.and_then(|p| self.sessions.get_mut(&p)) {
            parent.dialogs.retain(|d| *d != id);
        }
        info!(session = id, "session removed");
        Ok(())
    }
}

/// Forwards move/drag rect changes into the shared [`SessionRegistry`].
#[derive(Clone)]
pub struct SessionRectUpdater {
    registry: Arc<Mutex<SessionRegistry>>,
}

impl SessionRectUpdater {
    pub fn new(registry: Arc<Mutex<SessionRegistry>>) -> Self {
        Self { registry }
    }
}

impl MoveDragListener for SessionRectUpdater {
    fn on_rect_change(&self, persistent_id: PersistentId, rect: Rect, reason: SizeChangeReason) {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = registry.update_rect(persistent_id, rect, reason) {
            warn!(session = persistent_id, error = %e, "dropping rect change");
        }
    }
}

/// Hands out [`MoveDragController`]s for sessions in one shared registry.
///
/// Every controller is paced by the same frame clock, uses the same hot-zone
/// settings and writes its rects back through a [`SessionRectUpdater`].
pub struct MoveDragFactory {
    registry: Arc<Mutex<SessionRegistry>>,
    vsync: Arc<dyn VsyncStation>,
    hot_zone: HotZoneConfig,
    fallback_vpr: f32,
}

impl MoveDragFactory {
    pub fn new(
        registry: Arc<Mutex<SessionRegistry>>,
        vsync: Arc<dyn VsyncStation>,
        hot_zone: HotZoneConfig,
        fallback_vpr: f32,
    ) -> Self {
        Self {
            registry,
            vsync,
            hot_zone,
            fallback_vpr,
        }
    }

    pub fn registry(&self) -> &Arc<Mutex<SessionRegistry>> {
        &self.registry
    }

    /// Builds the gesture controller for session `id`.
    ///
    /// # Errors
    ///
    /// [`DmError::InvalidSession`] when the registry has no such session.
    pub fn controller_for(&self, id: PersistentId) -> Result<MoveDragController, DmError> {
        let known = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .is_some();
        if !known {
            return Err(DmError::invalid_session(id, "no such session"));
        }
        debug!(session = id, "move/drag controller created");
        let updater = Arc::new(SessionRectUpdater::new(Arc::clone(&self.registry)));
        Ok(MoveDragController::new(id, Arc::clone(&self.vsync), updater)
            .with_hot_zone(self.hot_zone, self.fallback_vpr))
    }
}
