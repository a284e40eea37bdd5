//! Game error types

use std::path::PathBuf;

use scene_engine::prelude::{ConfigError, HierarchyError, SceneError};
use thiserror::Error;

/// Problems in a room definition file, all found when the file is loaded
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoomError {
    /// `first_room` names a room the file does not define
    #[error("first room '{0}' is not defined")]
    UnknownFirstRoom(String),

    /// Door tag other than r, l, t or b
    #[error("room '{room}' has exit to '{target}' with invalid door '{door}'")]
    InvalidDoor {
        /// Room holding the exit
        room: String,
        /// Exit target
        target: String,
        /// Offending tag
        door: String,
    },

    /// Exit to a room that does not exist
    #[error("room '{room}' has a {door} exit to unknown room '{target}'")]
    DanglingDoor {
        /// Room holding the exit
        room: String,
        /// Door tag
        door: char,
        /// Missing target
        target: String,
    },

    /// Same room name defined twice
    #[error("room '{0}' is defined twice")]
    DuplicateRoom(String),

    /// Boundary with `left >= right` or `down >= up`
    #[error("room '{0}' has a malformed boundary")]
    MalformedBoundary(String),

    /// Camera tag that is not a known camera mode
    #[error("room '{room}' has unknown camera type '{camera_type}'")]
    UnknownCameraType {
        /// Room holding the tag
        room: String,
        /// Offending tag
        camera_type: String,
    },

    /// Enemy entry without a prefab
    #[error("enemy '{enemy}' in room '{room}' has no prefab")]
    MissingPrefab {
        /// Room holding the enemy
        room: String,
        /// Enemy name
        enemy: String,
    },

    /// Room name the loaded map does not define
    #[error("room '{0}' is not defined")]
    UnknownRoom(String),

    /// Enemy name not found in any room
    #[error("unknown enemy '{0}'")]
    UnknownEnemy(String),

    /// No player root to move between rooms
    #[error("the player has not been spawned")]
    NoPlayer,
}

/// Problems with spawner definitions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpawnError {
    /// Spawn area with a negative extent
    #[error("spawner '{0}' has a negative area")]
    InvalidArea(String),

    /// Initial batch larger than the cap
    #[error("spawner '{name}' starts with {initial} enemies but allows only {max}")]
    InitialExceedsMax {
        /// Spawner name
        name: String,
        /// Initial batch size
        initial: u32,
        /// Cap
        max: u32,
    },

    /// Cooldown that is zero, negative or not finite
    #[error("spawner '{0}' needs a positive cooldown")]
    InvalidCooldown(String),
}

/// Top-level game error
#[derive(Error, Debug)]
pub enum GameError {
    /// Scene or prefab load/save failure
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// Invalid scene graph operation
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),

    /// Configuration file failure
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration values that fail validation
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Room definition problem
    #[error("{}: {source}", path.display())]
    Room {
        /// Room file
        path: PathBuf,
        /// Underlying problem
        source: RoomError,
    },

    /// Room controller used before a player exists
    #[error(transparent)]
    RoomState(#[from] RoomError),

    /// Spawner definition problem
    #[error("{}: {source}", path.display())]
    Spawner {
        /// Spawner file
        path: PathBuf,
        /// Underlying problem
        source: SpawnError,
    },

    /// Scene trigger pointing at a scene that is not in the database
    #[error("no scene with key {0:#010x}")]
    UnknownSceneKey(u32),
}

/// Game result alias
pub type GameResult<T> = Result<T, GameError>;
