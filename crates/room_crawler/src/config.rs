//! Game configuration
//!
//! Loaded from `<level>/Config/game.toml` (or `.ron`). Every field has a
//! default so a partial file works.

use std::path::PathBuf;

use scene_engine::prelude::{Config, EngineConfig};
use serde::{Deserialize, Serialize};

use crate::rooms::BoundaryResolution;

/// Game configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Engine settings (log level, fixed tick)
    pub engine: EngineConfig,

    /// Level and file layout
    pub level: LevelConfig,

    /// Player and weapon prefabs
    pub player: PlayerConfig,

    /// Room streaming behavior
    pub rooms: RoomConfig,

    /// Scene transition behavior
    pub transition: TransitionConfig,

    /// Seed for the spawner RNG; random when unset
    pub rng_seed: Option<u64>,
}

impl Config for GameConfig {}

impl GameConfig {
    /// Configuration for `level` under `levels_root`
    pub fn for_level(levels_root: impl Into<PathBuf>, level: impl Into<String>) -> Self {
        Self {
            level: LevelConfig {
                levels_root: levels_root.into(),
                name: level.into(),
                ..LevelConfig::default()
            },
            ..Self::default()
        }
    }

    /// Directory of the active level
    pub fn level_directory(&self) -> PathBuf {
        self.level.levels_root.join(&self.level.name)
    }

    /// Room file path, if rooms are used
    pub fn room_file(&self) -> Option<PathBuf> {
        self.level.room_file.as_ref().map(|file| self.level_directory().join(file))
    }

    /// Spawner file path, if spawners are used
    pub fn spawner_file(&self) -> Option<PathBuf> {
        self.level.spawner_file.as_ref().map(|file| self.level_directory().join(file))
    }

    /// Check values that would make the game misbehave
    pub fn validate(&self) -> Result<(), String> {
        self.engine.validate()?;
        if self.player.prefab.is_empty() || self.player.name.is_empty() {
            return Err("player prefab and name must be set".to_string());
        }
        if !(self.rooms.margin.is_finite() && self.rooms.margin >= 0.0) {
            return Err(format!("room margin must be non-negative, got {}", self.rooms.margin));
        }
        if !(self.transition.duration.is_finite() && self.transition.duration >= 0.0) {
            return Err(format!(
                "transition duration must be non-negative, got {}",
                self.transition.duration
            ));
        }
        Ok(())
    }
}

/// Where level data lives
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// Directory holding one subdirectory per level
    pub levels_root: PathBuf,

    /// Active level directory name
    pub name: String,

    /// Room definition file, relative to the level directory
    pub room_file: Option<String>,

    /// Spawner definition file, relative to the level directory
    pub spawner_file: Option<String>,

    /// Scene loaded at start-up when there is no room file
    pub start_scene: Option<String>,

    /// Scene script whose enemies are spawned at start-up
    pub scene_script: Option<String>,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            levels_root: PathBuf::from("assets/levels"),
            name: "Test".to_string(),
            room_file: Some("Config/RoomData.xml".to_string()),
            spawner_file: Some("Config/Enemy_Spawners.xml".to_string()),
            start_scene: None,
            scene_script: None,
        }
    }
}

/// Player set-up
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Player prefab reference
    pub prefab: String,

    /// Name given to the player root
    pub name: String,

    /// Walk speed
    pub speed: f32,

    /// Weapon prefab parented to the player's hand, if any
    pub weapon_prefab: Option<String>,

    /// Node the weapon attaches to; the player root when missing
    pub weapon_socket: String,

    /// Where the player is spawned at start-up
    pub start_position: [f32; 3],
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            prefab: "Player".to_string(),
            name: "Player".to_string(),
            speed: 5.0,
            weapon_prefab: Some("Sword".to_string()),
            weapon_socket: "Hand_R".to_string(),
            start_position: [0.0, 1.0, 0.0],
        }
    }
}

/// Room streaming
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// How far inside the destination boundary the player is placed
    pub margin: f32,

    /// Which exit wins when the player is past two edges at once
    pub boundary_resolution: BoundaryResolution,

    /// Name of the camera root
    pub camera_name: String,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            margin: 1.5,
            boundary_resolution: BoundaryResolution::FixedPriority,
            camera_name: "Camera".to_string(),
        }
    }
}

/// Scene transitions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    /// Seconds gameplay stays paused after a scene change
    pub duration: f32,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self { duration: 1.0 }
    }
}
