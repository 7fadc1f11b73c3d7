//! DisplayManagerService: the service facade clients talk to.
//!
//! Wires the [`ScreenTopologyController`] and the [`DisplayRegistry`] to one
//! [`AgentNotificationHub`] and exposes the query, composition, power and
//! rotation surfaces.  Composition and query calls are plain delegations;
//! the power and rotation surfaces live here because they span both
//! components.
//!
//! Return conventions:
//! - queries return `Option`/`Vec` (an absent display is a normal condition),
//! - composition calls return `Result<_, DmError>`,
//! - power calls return `bool`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dms_core::{
    DisplayId, DisplayInfo, DisplayPowerEvent, DisplayState, DmError, EventStatus, FoldDisplayMode, FoldStatus,
    IdAllocator, PhysicalScreenOptions, Point, PowerStateChangeReason, Rotation, ScreenGroupInfo, ScreenId,
    ScreenInfo, ScreenPowerState, SurfaceHandle, VirtualScreenOption,
};
use serde::Serialize;
use tracing::{debug, info};

use super::agent_hub::{AgentEvent, AgentNotificationHub, AgentType, DisplayManagerAgent};
use super::display_registry::{DisplayRegistry, FoldCapability};
use super::screen_topology::{ScreenTopologyController, TopologySnapshot, UniqueScreenRotationOptions};

/// JSON-serialisable state dump.
#[derive(Debug, Serialize)]
struct ServiceDump {
    topology: TopologySnapshot,
    default_display: Option<DisplayId>,
    displays: Vec<DisplayInfo>,
    display_state: DisplayState,
    fold_status: FoldStatus,
    fold_display_mode: FoldDisplayMode,
    rotation_locked: bool,
}

pub struct DisplayManagerService {
    hub: Arc<dyn AgentNotificationHub>,
    topology: Arc<ScreenTopologyController>,
    registry: Arc<DisplayRegistry>,
    rotation_locked: AtomicBool,
}

impl DisplayManagerService {
    pub fn new(hub: Arc<dyn AgentNotificationHub>, fold: FoldCapability) -> Self {
        let display_ids = Arc::new(IdAllocator::new());
        let topology = Arc::new(ScreenTopologyController::new(Arc::clone(&display_ids), Arc::clone(&hub)));
        let registry = Arc::new(DisplayRegistry::new(display_ids, fold, Arc::clone(&hub)));
        topology.add_observer(registry.clone());
        Self {
            hub,
            topology,
            registry,
            rotation_locked: AtomicBool::new(false),
        }
    }

    pub fn topology(&self) -> &Arc<ScreenTopologyController> {
        &self.topology
    }

    pub fn registry(&self) -> &Arc<DisplayRegistry> {
        &self.registry
    }

    // ── Listener registration ─────────────────────────────────────────────────

    /// # Errors
    ///
    /// Whatever the hub reports; the in-process registry never fails.
    pub fn register_display_manager_agent(
        &self,
        agent: Arc<dyn DisplayManagerAgent>,
        agent_type: AgentType,
    ) -> Result<(), DmError> {
        self.hub.register_agent(agent, agent_type)
    }

    /// # Errors
    ///
    /// Whatever the hub reports; unknown agents are not an error.
    pub fn unregister_display_manager_agent(
        &self,
        agent: &Arc<dyn DisplayManagerAgent>,
        agent_type: AgentType,
    ) -> Result<(), DmError> {
        self.hub.unregister_agent(agent, agent_type)
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn get_default_display_info(&self) -> Option<DisplayInfo> {
        self.registry.get_default_display_info()
    }

    pub fn get_display_info_by_id(&self, id: DisplayId) -> Option<DisplayInfo> {
        self.registry.get_display_info(id)
    }

    pub fn get_all_display_ids(&self) -> Vec<DisplayId> {
        self.registry.get_all_display_ids()
    }

    pub fn get_screen_info_by_id(&self, id: ScreenId) -> Option<ScreenInfo> {
        self.topology.get_screen_info(id)
    }

    pub fn get_all_screen_infos(&self) -> Vec<ScreenInfo> {
        self.topology.get_all_screen_infos()
    }

    pub fn get_screen_group_info_by_id(&self, id: ScreenId) -> Option<ScreenGroupInfo> {
        self.topology.get_screen_group_info(id)
    }

    // ── Hardware ──────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// See [`ScreenTopologyController::on_physical_screen_connect`].
    pub fn on_physical_screen_connect(&self, rs_id: u64, options: PhysicalScreenOptions) -> Result<ScreenId, DmError> {
        self.topology.on_physical_screen_connect(rs_id, options)
    }

    /// # Errors
    ///
    /// See [`ScreenTopologyController::on_physical_screen_disconnect`].
    pub fn on_physical_screen_disconnect(&self, rs_id: u64) -> Result<ScreenId, DmError> {
        self.topology.on_physical_screen_disconnect(rs_id)
    }

    // ── Composition ───────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// See [`ScreenTopologyController::create_virtual_screen`].
    pub fn create_virtual_screen(&self, option: VirtualScreenOption) -> Result<ScreenId, DmError> {
        self.topology.create_virtual_screen(option)
    }

    /// # Errors
    ///
    /// See [`ScreenTopologyController::destroy_virtual_screen`].
    pub fn destroy_virtual_screen(&self, id: ScreenId) -> Result<(), DmError> {
        self.topology.destroy_virtual_screen(id)
    }

    /// # Errors
    ///
    /// See [`ScreenTopologyController::make_mirror`].
    pub fn make_mirror(&self, main_screen: ScreenId, mirror_ids: &[ScreenId]) -> Result<ScreenId, DmError> {
        self.topology.make_mirror(main_screen, mirror_ids)
    }

    /// # Errors
    ///
    /// See [`ScreenTopologyController::make_expand`].
    pub fn make_expand(&self, screen_ids: &[ScreenId], start_points: &[Point]) -> Result<ScreenId, DmError> {
        self.topology.make_expand(screen_ids, start_points)
    }

    /// # Errors
    ///
    /// See [`ScreenTopologyController::make_unique_screen`].
    pub fn make_unique_screen(
        &self,
        screen_ids: &[ScreenId],
        options: UniqueScreenRotationOptions,
    ) -> Result<Vec<DisplayId>, DmError> {
        self.topology.make_unique_screen(screen_ids, options)
    }

    /// # Errors
    ///
    /// See [`ScreenTopologyController::stop_mirror`].
    pub fn stop_mirror(&self, screen_ids: &[ScreenId]) -> Result<(), DmError> {
        self.topology.stop_mirror(screen_ids)
    }

    /// # Errors
    ///
    /// See [`ScreenTopologyController::stop_expand`].
    pub fn stop_expand(&self, screen_ids: &[ScreenId]) -> Result<(), DmError> {
        self.topology.stop_expand(screen_ids)
    }

    /// # Errors
    ///
    /// See [`ScreenTopologyController::set_virtual_screen_surface`].
    pub fn set_virtual_screen_surface(&self, id: ScreenId, surface: Option<SurfaceHandle>) -> Result<(), DmError> {
        self.topology.set_virtual_screen_surface(id, surface)
    }

    pub fn remove_virtual_screen_from_group(&self, screen_ids: &[ScreenId]) {
        self.topology.remove_virtual_screen_from_group(screen_ids);
    }

    // ── Power ─────────────────────────────────────────────────────────────────

    fn notify_power(&self, event: DisplayPowerEvent, status: EventStatus, reason: PowerStateChangeReason) -> bool {
        info!(?event, ?status, ?reason, "display power event");
        self.hub.notify(&AgentEvent::DisplayPower { event, status, reason })
    }

    /// Returns whether any power listener was registered.
    pub fn wake_up_begin(&self, reason: PowerStateChangeReason) -> bool {
        self.notify_power(DisplayPowerEvent::WakeUp, EventStatus::Begin, reason)
    }

    pub fn wake_up_end(&self) -> bool {
        self.notify_power(DisplayPowerEvent::WakeUp, EventStatus::End, PowerStateChangeReason::default())
    }

    pub fn suspend_begin(&self, reason: PowerStateChangeReason) -> bool {
        self.notify_power(DisplayPowerEvent::Sleep, EventStatus::Begin, reason)
    }

    pub fn suspend_end(&self) -> bool {
        self.notify_power(DisplayPowerEvent::Sleep, EventStatus::End, PowerStateChangeReason::default())
    }

    /// Applies `power` to every physical screen.  Returns `false` when there
    /// is no physical screen to apply it to.
    pub fn set_screen_power_for_all(&self, power: ScreenPowerState, reason: PowerStateChangeReason) -> bool {
        let updated = self.topology.set_all_physical_screens_power(power);
        if updated == 0 {
            debug!(?power, "no physical screen to power");
            return false;
        }
        let event = if power == ScreenPowerState::PowerOn {
            DisplayPowerEvent::DisplayOn
        } else {
            DisplayPowerEvent::DisplayOff
        };
        self.notify_power(event, EventStatus::End, reason);
        true
    }

    /// Returns `false` for unknown ids.
    pub fn set_screen_power_by_id(&self, id: ScreenId, power: ScreenPowerState) -> bool {
        self.topology.set_screen_power(id, power)
    }

    pub fn set_display_state(&self, state: DisplayState) -> bool {
        self.registry.set_display_state(state)
    }

    // ── Rotation ──────────────────────────────────────────────────────────────

    pub fn set_screen_rotation_locked(&self, locked: bool) {
        self.rotation_locked.store(locked, Ordering::SeqCst);
        info!(locked, "screen rotation lock set");
    }

    pub fn is_screen_rotation_locked(&self) -> bool {
        self.rotation_locked.load(Ordering::SeqCst)
    }

    /// Rotates the default screen to follow the device sensor.  Ignored
    /// (returns `false`) while rotation is locked or without a default screen.
    pub fn on_sensor_rotation(&self, rotation: Rotation) -> bool {
        if self.is_screen_rotation_locked() {
            debug!(?rotation, "sensor rotation ignored while locked");
            return false;
        }
        let Some(id) = self.topology.default_screen_id() else {
            return false;
        };
        self.topology.request_rotation(id, rotation).is_ok()
    }

    // ── Diagnostics ───────────────────────────────────────────────────────────

    /// Pretty-printed JSON of every screen, group and display.
    ///
    /// # Errors
    ///
    /// Only if serialisation fails, which the dumped types never do.
    pub fn dump(&self) -> serde_json::Result<String> {
        let dump = ServiceDump {
            topology: self.topology.snapshot(),
            default_display: self.registry.default_display_id(),
            displays: self.registry.get_all_display_infos(),
            display_state: self.registry.display_state(),
            fold_status: self.registry.get_fold_status(),
            fold_display_mode: self.registry.get_fold_display_mode(),
            rotation_locked: self.is_screen_rotation_locked(),
        };
        serde_json::to_string_pretty(&dump)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::agent_hub::AgentRegistry;
    use crate::infrastructure::agents::RecordingAgent;
    use dms_core::{ColorGamut, ScreenMode};

    fn physical() -> PhysicalScreenOptions {
        PhysicalScreenOptions {
            name: "builtin".to_string(),
            modes: vec![ScreenMode {
                width: 2560,
                height: 1600,
                refresh_rate: 120,
            }],
            active_mode: 0,
            virtual_pixel_ratio: 2.0,
            color_gamuts: vec![ColorGamut::Native],
        }
    }

    fn service() -> DisplayManagerService {
        DisplayManagerService::new(Arc::new(AgentRegistry::new()), FoldCapability::default())
    }

    fn recorder_for(service: &DisplayManagerService, agent_type: AgentType) -> Arc<RecordingAgent> {
        let recorder = Arc::new(RecordingAgent::new());
        service
            .register_display_manager_agent(recorder.clone(), agent_type)
            .unwrap();
        recorder
    }

    #[test]
    fn test_physical_connect_produces_default_display() {
        // Arrange
        let service = service();

        // Act
        let screen = service.on_physical_screen_connect(0, physical()).unwrap();

        // Assert
        let display = service.get_default_display_info().unwrap();
        assert_eq!(display.screen_id, screen);
        assert_eq!((display.width, display.height), (2560, 1600));
    }

    #[test]
    fn test_wake_up_without_listeners_returns_false() {
        let service = service();
        assert!(!service.wake_up_begin(PowerStateChangeReason::PowerButton));
    }

    #[test]
    fn test_suspend_notifies_power_listeners_in_order() {
        // Arrange
        let service = service();
        let recorder = recorder_for(&service, AgentType::DisplayPowerEventListener);

        // Act
        assert!(service.suspend_begin(PowerStateChangeReason::Timeout));
        assert!(service.suspend_end());

        // Assert
        assert_eq!(
            recorder.events(),
            vec![
                AgentEvent::DisplayPower {
                    event: DisplayPowerEvent::Sleep,
                    status: EventStatus::Begin,
                    reason: PowerStateChangeReason::Timeout,
                },
                AgentEvent::DisplayPower {
                    event: DisplayPowerEvent::Sleep,
                    status: EventStatus::End,
                    reason: PowerStateChangeReason::Application,
                },
            ]
        );
    }

    #[test]
    fn test_set_screen_power_for_all_without_screens_returns_false() {
        let service = service();
        assert!(!service.set_screen_power_for_all(ScreenPowerState::PowerOff, PowerStateChangeReason::default()));
    }

    #[test]
    fn test_set_screen_power_for_all_notifies_display_off() {
        let service = service();
        let screen = service.on_physical_screen_connect(0, physical()).unwrap();
        let recorder = recorder_for(&service, AgentType::DisplayPowerEventListener);

        assert!(service.set_screen_power_for_all(ScreenPowerState::PowerOff, PowerStateChangeReason::PowerButton));

        assert_eq!(
            service.get_screen_info_by_id(screen).unwrap().power,
            ScreenPowerState::PowerOff
        );
        assert!(matches!(
            recorder.events().as_slice(),
            [AgentEvent::DisplayPower {
                event: DisplayPowerEvent::DisplayOff,
                status: EventStatus::End,
                ..
            }]
        ));
    }

    #[test]
    fn test_sensor_rotation_ignored_while_locked() {
        // Arrange
        let service = service();
        let screen = service.on_physical_screen_connect(0, physical()).unwrap();
        service.set_screen_rotation_locked(true);

        // Act
        let applied_locked = service.on_sensor_rotation(Rotation::Rotation90);
        service.set_screen_rotation_locked(false);
        let applied_unlocked = service.on_sensor_rotation(Rotation::Rotation90);

        // Assert
        assert!(!applied_locked);
        assert!(applied_unlocked);
        assert_eq!(service.get_screen_info_by_id(screen).unwrap().rotation, Rotation::Rotation90);
        let display = service.get_default_display_info().unwrap();
        assert_eq!((display.width, display.height), (1600, 2560));
    }

    #[test]
    fn test_make_unique_screen_ids_match_registered_displays() {
        let service = service();
        service.on_physical_screen_connect(0, physical()).unwrap();
        let virt = service
            .create_virtual_screen(VirtualScreenOption::new("cast", 1280, 720))
            .unwrap();

        let ids = service
            .make_unique_screen(&[virt], UniqueScreenRotationOptions::default())
            .unwrap();

        let display = service.get_display_info_by_id(ids[0]).unwrap();
        assert_eq!(display.screen_id, virt);
        assert_eq!(service.get_all_display_ids().len(), 2);
    }

    #[test]
    fn test_dump_is_valid_json_with_screens_and_displays() {
        let service = service();
        service.on_physical_screen_connect(0, physical()).unwrap();

        let json = service.dump().unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["topology"]["screens"].as_array().unwrap().len(), 1);
        assert_eq!(value["displays"].as_array().unwrap().len(), 1);
        assert_eq!(value["rotation_locked"], false);
    }
}
