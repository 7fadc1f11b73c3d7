//! TOML-based configuration persistence for the display manager service.
//!
//! Reads and writes [`ServiceConfig`] to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\DisplayManager\config.toml`
//! - Linux:    `~/.config/dmserver/config.toml`
//! - macOS:    `~/Library/Application Support/DisplayManager/config.toml`
//!
//! # Example file (for beginners)
//!
//! ```toml
//! [service]
//! log_level = "debug"
//!
//! [default_screen]
//! name = "builtin"
//! width = 2560
//! height = 1600
//!
//! [drag]
//! hotzone_touch = 20.0
//!
//! [vsync]
//! frame_period_ms = 8
//! ```
//!
//! Every field carries a `#[serde(default = "...")]` helper, so a missing file,
//! a missing section, or a missing key all fall back to the built-in value.
//! That keeps the service starting cleanly on first run and after upgrades
//! that add new keys.

use std::path::{Path, PathBuf};
use std::time::Duration;

use dms_core::{ColorGamut, HotZoneConfig, PhysicalScreenOptions, Rect, ScreenMode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::display_registry::FoldCapability;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level service configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServiceConfig {
    #[serde(default)]
    pub service: ServiceSection,
    #[serde(default)]
    pub default_screen: DefaultScreenConfig,
    #[serde(default)]
    pub drag: DragConfig,
    #[serde(default)]
    pub vsync: VsyncConfig,
    #[serde(default)]
    pub fold: FoldConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceSection {
    /// Schema version string; bump when breaking changes are introduced.
    #[serde(default = "default_version")]
    pub version: String,
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// The built-in panel connected at start-up.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DefaultScreenConfig {
    #[serde(default = "default_screen_name")]
    pub name: String,
    #[serde(default = "default_screen_width")]
    pub width: u32,
    #[serde(default = "default_screen_height")]
    pub height: u32,
    #[serde(default = "default_refresh_rate")]
    pub refresh_rate: u32,
    #[serde(default = "default_virtual_pixel_ratio")]
    pub virtual_pixel_ratio: f32,
    #[serde(default = "default_color_gamuts")]
    pub color_gamuts: Vec<ColorGamut>,
}

/// Hot-zone widths in vp, plus the density used for windows without a display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DragConfig {
    #[serde(default = "default_window_frame_width")]
    pub window_frame_width: f32,
    #[serde(default = "default_window_frame_corner_width")]
    pub window_frame_corner_width: f32,
    #[serde(default = "default_hotzone_pointer")]
    pub hotzone_pointer: f32,
    #[serde(default = "default_hotzone_touch")]
    pub hotzone_touch: f32,
    #[serde(default = "default_fallback_vpr")]
    pub fallback_vpr: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VsyncConfig {
    #[serde(default = "default_frame_period_ms")]
    pub frame_period_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FoldConfig {
    #[serde(default)]
    pub foldable: bool,
    #[serde(default)]
    pub crease_rects: Vec<Rect>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_version() -> String {
    "1.0".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_screen_name() -> String {
    "builtin".to_string()
}
fn default_screen_width() -> u32 {
    1920
}
fn default_screen_height() -> u32 {
    1080
}
fn default_refresh_rate() -> u32 {
    60
}
fn default_virtual_pixel_ratio() -> f32 {
    1.5
}
fn default_color_gamuts() -> Vec<ColorGamut> {
    vec![ColorGamut::Native, ColorGamut::Srgb]
}
fn default_window_frame_width() -> f32 {
    HotZoneConfig::default().window_frame_width
}
fn default_window_frame_corner_width() -> f32 {
    HotZoneConfig::default().window_frame_corner_width
}
fn default_hotzone_pointer() -> f32 {
    HotZoneConfig::default().hotzone_pointer
}
fn default_hotzone_touch() -> f32 {
    HotZoneConfig::default().hotzone_touch
}
fn default_fallback_vpr() -> f32 {
    1.5
}
fn default_frame_period_ms() -> u64 {
    16
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            version: default_version(),
            log_level: default_log_level(),
        }
    }
}

impl Default for DefaultScreenConfig {
    fn default() -> Self {
        Self {
            name: default_screen_name(),
            width: default_screen_width(),
            height: default_screen_height(),
            refresh_rate: default_refresh_rate(),
            virtual_pixel_ratio: default_virtual_pixel_ratio(),
            color_gamuts: default_color_gamuts(),
        }
    }
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            window_frame_width: default_window_frame_width(),
            window_frame_corner_width: default_window_frame_corner_width(),
            hotzone_pointer: default_hotzone_pointer(),
            hotzone_touch: default_hotzone_touch(),
            fallback_vpr: default_fallback_vpr(),
        }
    }
}

impl Default for VsyncConfig {
    fn default() -> Self {
        Self {
            frame_period_ms: default_frame_period_ms(),
        }
    }
}

// ── Conversions into runtime types ────────────────────────────────────────────

impl DefaultScreenConfig {
    /// Hardware description for `on_physical_screen_connect`.
    pub fn to_physical_options(&self) -> PhysicalScreenOptions {
        PhysicalScreenOptions {
            name: self.name.clone(),
            modes: vec![ScreenMode {
                width: self.width,
                height: self.height,
                refresh_rate: self.refresh_rate,
            }],
            active_mode: 0,
            virtual_pixel_ratio: self.virtual_pixel_ratio,
            color_gamuts: self.color_gamuts.clone(),
        }
    }
}

impl DragConfig {
    pub fn hot_zone(&self) -> HotZoneConfig {
        HotZoneConfig {
            window_frame_width: self.window_frame_width,
            window_frame_corner_width: self.window_frame_corner_width,
            hotzone_pointer: self.hotzone_pointer,
            hotzone_touch: self.hotzone_touch,
        }
    }
}

impl VsyncConfig {
    pub fn frame_period(&self) -> Duration {
        Duration::from_millis(self.frame_period_ms)
    }
}

impl FoldConfig {
    pub fn capability(&self) -> FoldCapability {
        FoldCapability {
            foldable: self.foldable,
            crease_rects: self.crease_rects.clone(),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads the config from the platform path, or defaults if it does not exist.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<ServiceConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads the config at `path`, returning `ServiceConfig::default()` if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<ServiceConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ServiceConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to the platform path.
///
/// # Errors
///
/// See [`save_config_to`].
pub fn save_config(config: &ServiceConfig) -> Result<(), ConfigError> {
    save_config_to(config, &config_file_path()?)
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(config: &ServiceConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("DisplayManager"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("dmserver"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("DisplayManager")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
