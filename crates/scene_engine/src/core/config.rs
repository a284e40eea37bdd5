//! # Unified Configuration System
//!
//! Configuration for engine behavior and the scene layer.
//!
//! ## Configuration Categories
//!
//! - **Engine Config**: Core engine behavior, logging, debug features, tick rate
//! - **Scene Config**: Where scene files live and which one loads first

use serde::{Serialize, Deserialize};
use std::path::PathBuf;

pub use crate::config::{Config, ConfigError};

/// # Engine Configuration
///
/// Core engine behavior configuration including logging, debug features,
/// and the fixed simulation tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log level for the engine
    pub log_level: String,
    /// Whether to enable debug features
    pub debug_mode: bool,
    /// Fixed simulation tick in seconds
    pub fixed_tick: f32,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            debug_mode: cfg!(debug_assertions),
            fixed_tick: 1.0 / 60.0,
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set the fixed simulation tick
    pub fn with_fixed_tick(mut self, tick: f32) -> Self {
        self.fixed_tick = tick;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(self.fixed_tick.is_finite() && self.fixed_tick > 0.0) {
            return Err(format!("Fixed tick must be positive, got {}", self.fixed_tick));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for EngineConfig {}

/// # Scene Configuration
///
/// Scene files are resolved as `<scene_directory>/<name>.xml`, prefab
/// references as `<prefab_directory>/<reference>.prefab`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Directory holding scene files
    pub scene_directory: PathBuf,
    /// Directory prefab references are resolved against
    pub prefab_directory: PathBuf,
    /// Scene loaded at startup, if any
    pub default_scene: Option<String>,
}

impl SceneConfig {
    /// Create a scene configuration for a level directory holding
    /// `Scenes/` and `Prefabs/`
    pub fn new(level_directory: impl Into<PathBuf>) -> Self {
        let level_directory = level_directory.into();
        Self {
            scene_directory: level_directory.join("Scenes"),
            prefab_directory: level_directory.join("Prefabs"),
            default_scene: None,
        }
    }

    /// Set the scene loaded at startup
    pub fn with_default_scene(mut self, name: impl Into<String>) -> Self {
        self.default_scene = Some(name.into());
        self
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self::new("assets/levels/Test")
    }
}

impl Config for SceneConfig {}
