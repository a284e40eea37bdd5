//! # Scene Engine
//!
//! The scene layer of a game engine: a small ECS world, a scene graph of
//! named nodes with parent/child links, an XML scene and prefab format, and
//! the registry that loads, saves, reparents and tears down scenes.
//!
//! ## Features
//!
//! - **ECS**: generational entities, typed component storage, deferred deletion
//! - **Scene graph**: reparenting without visual pops, recursive deletion,
//!   integrity checking
//! - **Serialization**: scene and prefab files with prefab references
//! - **Configuration**: TOML/RON config files via serde
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut registry = SceneRegistry::from_config(&SceneConfig::default());
//!     registry.load_scene("Arena")?;
//!
//!     let lamp = registry.create_light("Lamp", LightComponent::default(), Vec3::new(0.0, 5.0, 0.0));
//!     let floor = registry.find_root("Floor").ok_or("no floor")?;
//!     registry.make_child(lamp, floor)?;
//!     registry.save_scene()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod ecs;
pub mod foundation;
pub mod render;
pub mod scene;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        core::config::{Config, ConfigError, EngineConfig, SceneConfig},
        ecs::components::{
            CameraComponent, CharacterComponent, ColliderComponent, ColliderShape,
            CollisionStateComponent, EngineFlags, GameFlags, GuiComponent, LightComponent,
            NodeComponent, RigidBodyComponent, TransformComponent,
        },
        ecs::systems::TransformSystem,
        ecs::{Component, Entity, System, World},
        foundation::{
            math::{Mat4, Transform, Vec2, Vec3, Vec4},
            time::{FixedStep, Stopwatch},
        },
        render::{NullRenderer, ObjectMemoryTracker, RenderNotifier},
        scene::{HierarchyError, NodeRecord, NodeSerializer, SceneDocument, SceneError, SceneRegistry},
    };
}
