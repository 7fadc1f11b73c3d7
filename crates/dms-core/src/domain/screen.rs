//! Screen and screen-group entities.
//!
//! A *screen* is a physical or virtual rendering target with its own set of
//! supported modes.  A *screen group* is a screen that additionally owns an
//! ordered list of child screens and a combination mode (ALONE, MIRROR or
//! EXPAND).
//!
//! # Tagged variant instead of inheritance (for beginners)
//!
//! Rather than a `Screen` base type with a `ScreenGroup` subtype, there is a
//! single [`ScreenEntity`] struct whose optional `group` field carries the
//! [`GroupData`] payload.  "Is this a group?" becomes `entity.is_group()`, and
//! code that needs group behaviour matches on `entity.group()`.
//!
//! Entities are owned exclusively by the topology controller.  Everyone else
//! receives [`ScreenInfo`] / [`ScreenGroupInfo`] snapshots.

use serde::{Deserialize, Serialize};

use super::geometry::Point;
use super::ids::ScreenId;

/// One supported resolution/refresh combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenMode {
    pub width: u32,
    pub height: u32,
    pub refresh_rate: u32,
}

/// Screen rotation in 90 degree steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Rotation0,
    Rotation90,
    Rotation180,
    Rotation270,
}

impl Rotation {
    /// `true` for 90/270, where width and height trade places.
    pub fn is_portrait_swap(self) -> bool {
        matches!(self, Rotation::Rotation90 | Rotation::Rotation270)
    }
}

/// Orientation a client requested for the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Unspecified,
    Vertical,
    Horizontal,
    ReverseVertical,
    ReverseHorizontal,
    Sensor,
}

/// How the children of a group are composed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombinationMode {
    /// A single standalone screen.
    Alone,
    /// Every child shows the main screen's content.
    Mirror,
    /// Children extend one logical desktop at their start points.
    Expand,
}

/// Physical hardware or a virtual (software) screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenKind {
    Physical,
    Virtual,
    Group,
}

/// Power state of a screen panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScreenPowerState {
    #[default]
    PowerOn,
    PowerStandBy,
    PowerSuspend,
    PowerOff,
}

/// Color gamuts a panel may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorGamut {
    Native,
    Srgb,
    DisplayP3,
    Bt2020,
}

/// Opaque handle to a consumer surface a virtual screen renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceHandle(pub u64);

/// A child slot inside a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildSlot {
    pub screen_id: ScreenId,
    /// Offset of the child's top-left corner inside an EXPAND group.
    pub start_point: Point,
}

/// Payload that turns a [`ScreenEntity`] into a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupData {
    pub combination: CombinationMode,
    /// Children in insertion order.
    pub children: Vec<ChildSlot>,
    /// Source screen of a MIRROR group; the default screen for ALONE.
    pub main_screen: Option<ScreenId>,
}

impl GroupData {
    pub fn new(combination: CombinationMode, main_screen: Option<ScreenId>) -> Self {
        Self {
            combination,
            children: Vec::new(),
            main_screen,
        }
    }

    pub fn contains(&self, id: ScreenId) -> bool {
        self.children.iter().any(|c| c.screen_id == id)
    }

    /// Appends `id`, or updates its start point if already present.
    pub fn add_child(&mut self, id: ScreenId, start_point: Point) {
        match self.children.iter_mut().find(|c| c.screen_id == id) {
            Some(slot) => slot.start_point = start_point,
            None => self.children.push(ChildSlot {
                screen_id: id,
                start_point,
            }),
        }
    }

    /// Removes `id`; returns `false` if it was not a child.
    pub fn remove_child(&mut self, id: ScreenId) -> bool {
        let before = self.children.len();
        self.children.retain(|c| c.screen_id != id);
        self.children.len() != before
    }

    pub fn child_ids(&self) -> Vec<ScreenId> {
        self.children.iter().map(|c| c.screen_id).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// Parameters of a virtual screen creation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualScreenOption {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub density: f32,
    pub surface: Option<SurfaceHandle>,
}

impl VirtualScreenOption {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            density: 1.0,
            surface: None,
        }
    }
}

/// Hardware description reported when a physical panel is plugged in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalScreenOptions {
    pub name: String,
    pub modes: Vec<ScreenMode>,
    pub active_mode: usize,
    pub virtual_pixel_ratio: f32,
    pub color_gamuts: Vec<ColorGamut>,
}

/// A screen or group owned by the topology controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenEntity {
    pub id: ScreenId,
    /// Id of the screen inside the render engine; `None` for groups.
    pub rs_id: Option<u64>,
    pub name: String,
    pub kind: ScreenKind,
    pub modes: Vec<ScreenMode>,
    pub active_mode: usize,
    pub virtual_pixel_ratio: f32,
    pub rotation: Rotation,
    pub orientation: Orientation,
    pub power: ScreenPowerState,
    pub color_gamuts: Vec<ColorGamut>,
    pub surface: Option<SurfaceHandle>,
    /// The group whose child list contains this screen.
    pub parent: Option<ScreenId>,
    group: Option<GroupData>,
}

impl ScreenEntity {
    /// Builds a physical screen entity from hardware options.
    pub fn physical(id: ScreenId, rs_id: u64, options: &PhysicalScreenOptions) -> Self {
        Self {
            id,
            rs_id: Some(rs_id),
            name: options.name.clone(),
            kind: ScreenKind::Physical,
            modes: options.modes.clone(),
            active_mode: options.active_mode,
            virtual_pixel_ratio: options.virtual_pixel_ratio,
            rotation: Rotation::default(),
            orientation: Orientation::default(),
            power: ScreenPowerState::default(),
            color_gamuts: options.color_gamuts.clone(),
            surface: None,
            parent: None,
            group: None,
        }
    }

    /// Builds a virtual screen entity with a single mode matching the option.
    pub fn virtual_screen(id: ScreenId, rs_id: u64, option: &VirtualScreenOption) -> Self {
        Self {
            id,
            rs_id: Some(rs_id),
            name: option.name.clone(),
            kind: ScreenKind::Virtual,
            modes: vec![ScreenMode {
                width: option.width,
                height: option.height,
                refresh_rate: 60,
            }],
            active_mode: 0,
            virtual_pixel_ratio: option.density,
            rotation: Rotation::default(),
            orientation: Orientation::default(),
            power: ScreenPowerState::default(),
            color_gamuts: Vec::new(),
            surface: option.surface,
            parent: None,
            group: None,
        }
    }

    /// Builds an empty group entity.
    pub fn group(id: ScreenId, data: GroupData) -> Self {
        Self {
            id,
            rs_id: None,
            name: format!("group-{}", id.0),
            kind: ScreenKind::Group,
            modes: Vec::new(),
            active_mode: 0,
            virtual_pixel_ratio: 1.0,
            rotation: Rotation::default(),
            orientation: Orientation::default(),
            power: ScreenPowerState::default(),
            color_gamuts: Vec::new(),
            surface: None,
            parent: None,
            group: Some(data),
        }
    }

    pub fn is_group(&self) -> bool {
        self.group.is_some()
    }

    pub fn group_data(&self) -> Option<&GroupData> {
        self.group.as_ref()
    }

    pub fn group_data_mut(&mut self) -> Option<&mut GroupData> {
        self.group.as_mut()
    }

    pub fn is_virtual(&self) -> bool {
        self.kind == ScreenKind::Virtual
    }

    pub fn active_mode(&self) -> Option<&ScreenMode> {
        self.modes.get(self.active_mode)
    }

    /// Width and height as currently presented, after rotation.
    pub fn presented_size(&self) -> (u32, u32) {
        let (w, h) = self
            .active_mode()
            .map(|m| (m.width, m.height))
            .unwrap_or((0, 0));
        if self.rotation.is_portrait_swap() {
            (h, w)
        } else {
            (w, h)
        }
    }

    /// Snapshot handed to readers outside the topology lock.
    pub fn to_info(&self) -> ScreenInfo {
        let (width, height) = self.presented_size();
        ScreenInfo {
            id: self.id,
            name: self.name.clone(),
            kind: self.kind,
            width,
            height,
            refresh_rate: self.active_mode().map(|m| m.refresh_rate).unwrap_or(0),
            modes: self.modes.clone(),
            active_mode: self.active_mode,
            virtual_pixel_ratio: self.virtual_pixel_ratio,
            rotation: self.rotation,
            orientation: self.orientation,
            power: self.power,
            parent: self.parent,
            is_group: self.is_group(),
        }
    }

    /// Group snapshot; `None` for leaf screens.
    pub fn to_group_info(&self) -> Option<ScreenGroupInfo> {
        self.group.as_ref().map(|g| ScreenGroupInfo {
            id: self.id,
            combination: g.combination,
            children: g.child_ids(),
            positions: g.children.iter().map(|c| c.start_point).collect(),
            main_screen: g.main_screen,
        })
    }
}

/// Read-only copy of a screen's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenInfo {
    pub id: ScreenId,
    pub name: String,
    pub kind: ScreenKind,
    pub width: u32,
    pub height: u32,
    pub refresh_rate: u32,
    pub modes: Vec<ScreenMode>,
    pub active_mode: usize,
    pub virtual_pixel_ratio: f32,
    pub rotation: Rotation,
    pub orientation: Orientation,
    pub power: ScreenPowerState,
    pub parent: Option<ScreenId>,
    pub is_group: bool,
}

/// Read-only copy of a group's membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenGroupInfo {
    pub id: ScreenId,
    pub combination: CombinationMode,
    /// Children in insertion order.
    pub children: Vec<ScreenId>,
    /// Start point of each child, same order as `children`.
    pub positions: Vec<Point>,
    pub main_screen: Option<ScreenId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> PhysicalScreenOptions {
        PhysicalScreenOptions {
            name: "builtin".to_string(),
            modes: vec![
                ScreenMode {
                    width: 1920,
                    height: 1080,
                    refresh_rate: 60,
                },
                ScreenMode {
                    width: 1280,
                    height: 720,
                    refresh_rate: 120,
                },
            ],
            active_mode: 0,
            virtual_pixel_ratio: 2.0,
            color_gamuts: vec![ColorGamut::Srgb],
        }
    }

    #[test]
    fn test_group_add_child_keeps_insertion_order() {
        let mut g = GroupData::new(CombinationMode::Expand, None);
        g.add_child(ScreenId(5), Point::new(0, 0));
        g.add_child(ScreenId(2), Point::new(1920, 0));
        g.add_child(ScreenId(9), Point::new(3840, 0));
        assert_eq!(g.child_ids(), vec![ScreenId(5), ScreenId(2), ScreenId(9)]);
    }

    #[test]
    fn test_group_add_existing_child_updates_point_without_duplicating() {
        let mut g = GroupData::new(CombinationMode::Expand, None);
        g.add_child(ScreenId(1), Point::new(0, 0));
        g.add_child(ScreenId(1), Point::new(10, 20));
        assert_eq!(g.children.len(), 1);
        assert_eq!(g.children[0].start_point, Point::new(10, 20));
    }

    #[test]
    fn test_group_remove_child_reports_membership() {
        let mut g = GroupData::new(CombinationMode::Mirror, Some(ScreenId(0)));
        g.add_child(ScreenId(1), Point::default());
        assert!(g.remove_child(ScreenId(1)));
        assert!(!g.remove_child(ScreenId(1)));
        assert!(g.is_empty());
    }

    #[test]
    fn test_physical_entity_reports_active_mode_size() {
        let s = ScreenEntity::physical(ScreenId(0), 100, &options());
        assert_eq!(s.presented_size(), (1920, 1080));
        assert!(!s.is_group());
        assert!(!s.is_virtual());
    }

    #[test]
    fn test_presented_size_swaps_on_rotation_90() {
        let mut s = ScreenEntity::physical(ScreenId(0), 100, &options());
        s.rotation = Rotation::Rotation90;
        assert_eq!(s.presented_size(), (1080, 1920));
        assert_eq!(s.to_info().width, 1080);
    }

    #[test]
    fn test_virtual_entity_has_single_mode_from_option() {
        let option = VirtualScreenOption::new("cast", 800, 600);
        let s = ScreenEntity::virtual_screen(ScreenId(3), 7, &option);
        assert!(s.is_virtual());
        assert_eq!(s.modes.len(), 1);
        assert_eq!(s.presented_size(), (800, 600));
    }

    #[test]
    fn test_group_entity_exposes_group_info() {
        let mut data = GroupData::new(CombinationMode::Mirror, Some(ScreenId(0)));
        data.add_child(ScreenId(4), Point::default());
        let g = ScreenEntity::group(ScreenId(10), data);
        let info = g.to_group_info().expect("group info");
        assert_eq!(info.children, vec![ScreenId(4)]);
        assert_eq!(info.combination, CombinationMode::Mirror);
        assert!(g.to_info().is_group);
    }

    #[test]
    fn test_leaf_entity_has_no_group_info() {
        let s = ScreenEntity::physical(ScreenId(0), 100, &options());
        assert!(s.to_group_info().is_none());
    }
}
