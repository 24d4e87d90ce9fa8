//! Configuration for drishti

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Result, VisionError};
use crate::kinds::{ModuleKind, ParamKind};
use crate::resources::{Dependency, ResourceLayout};

/// Capture settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// USB camera device index (0, 1, 2, etc.)
    pub camera_id: u32,
    /// Target capture frame rate (frames per second)
    pub frame_rate: u32,
    /// Camera resolution (width, height)
    pub resolution: (u32, u32),
    /// Ticks per second driven by the run loop
    pub refresh_rate: u32,
    /// Read frames from a directory of still images instead of a device
    pub frames_dir: Option<PathBuf>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            camera_id: 0,
            frame_rate: 30,
            resolution: (640, 480),
            refresh_rate: 15,
            frames_dir: None,
        }
    }
}

/// Where module dependencies live
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    pub root: Option<PathBuf>,
    /// Per-kind replacements for the built-in dependency layout
    pub overrides: BTreeMap<ModuleKind, Vec<Dependency>>,
}

impl ResourceConfig {
    pub fn layout(&self) -> ResourceLayout {
        let mut layout = ResourceLayout::default();
        layout.merge(&self.overrides);
        layout
    }
}

/// A parameter applied right after a module is initialized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSetting {
    pub module: ModuleKind,
    pub param: ParamKind,
    pub value: f32,
}

/// Vision system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub camera: CameraConfig,
    pub resources: ResourceConfig,
    /// Modules initialized at startup, in dispatch order
    pub modules: Vec<ModuleKind>,
    /// Per-module drawing switches; modules not listed draw
    pub show: BTreeMap<ModuleKind, bool>,
    pub params: Vec<ParamSetting>,
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            resources: ResourceConfig::default(),
            modules: Vec::new(),
            show: BTreeMap::new(),
            params: Vec::new(),
            log_level: "info".to_string(),
        }
    }
}

impl VisionConfig {
    /// Load configuration from a JSON or TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            VisionError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_str(&content)
    }

    /// Parse configuration from a string (JSON or TOML)
    pub fn from_str(content: &str) -> Result<Self> {
        // Try JSON first
        if let Ok(config) = serde_json::from_str::<VisionConfig>(content) {
            return Ok(config);
        }

        Ok(toml::from_str::<VisionConfig>(content)?)
    }

    /// Default configuration with environment overrides applied
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Apply `DRISHTI_*` environment overrides
    pub fn apply_env(&mut self) {
        if let Ok(root) = std::env::var("DRISHTI_RESOURCE_PATH") {
            self.resources.root = Some(PathBuf::from(root));
        }

        if let Ok(id) = std::env::var("DRISHTI_CAMERA_INDEX") {
            if let Ok(id) = id.parse::<u32>() {
                self.camera.camera_id = id;
            }
        }

        if let Ok(log_level) = std::env::var("DRISHTI_LOG_LEVEL") {
            self.log_level = log_level;
        }
    }

    /// Show flag of `kind`; true unless configured otherwise
    pub fn show_flag(&self, kind: ModuleKind) -> bool {
        self.show.get(&kind).copied().unwrap_or(true)
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        let camera = &self.camera;
        if camera.frame_rate == 0 || camera.frame_rate > 120 {
            return Err("Frame rate must be between 1 and 120".to_string());
        }

        if camera.refresh_rate == 0 || camera.refresh_rate > 120 {
            return Err("Refresh rate must be between 1 and 120".to_string());
        }

        if camera.resolution.0 == 0 || camera.resolution.1 == 0 {
            return Err("Resolution must be non-zero".to_string());
        }

        if camera.resolution.0 > 7680 || camera.resolution.1 > 4320 {
            return Err("Resolution too large (max 8K)".to_string());
        }

        if camera.camera_id > 100 {
            return Err("Camera ID too large (max 100)".to_string());
        }

        for (i, kind) in self.modules.iter().enumerate() {
            if self.modules[..i].contains(kind) {
                return Err(format!("Module {} listed more than once", kind));
            }
        }

        for setting in &self.params {
            if !setting.param.applies_to(setting.module) {
                return Err(format!(
                    "Parameter {:?} does not apply to {}",
                    setting.param, setting.module
                ));
            }
            if !setting.value.is_finite() {
                return Err(format!("Parameter {:?} must be finite", setting.param));
            }
        }

        Ok(())
    }
}
