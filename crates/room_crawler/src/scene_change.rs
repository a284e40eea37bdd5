//! Collision-triggered scene transitions
//!
//! Touching a scene trigger pauses gameplay, swaps the whole scene for the
//! trigger's destination and leaves a `GameSceneComponent` marker on the
//! singleton so the player is respawned there. Gameplay resumes once the
//! transition has run for its configured duration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use scene_engine::prelude::*;
use scene_engine::scene::registry::SCENE_EXTENSION;

use crate::components::{AppState, GameSceneComponent, SceneTriggerComponent};
use crate::error::{GameError, GameResult};
use crate::game::GameContext;

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Stable 32-bit key for a scene name (FNV-1a)
pub fn scene_key(name: &str) -> u32 {
    name.bytes()
        .fold(FNV_OFFSET, |hash, byte| (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME))
}

/// A scene file known to the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneEntry {
    /// Level directory the scene belongs to
    pub level: String,
    /// Scene name (file stem)
    pub name: String,
    /// Scene file
    pub path: PathBuf,
}

/// Every scene under a levels root, keyed by `scene_key`
#[derive(Debug, Clone, Default)]
pub struct SceneDatabase {
    scenes: HashMap<u32, SceneEntry>,
}

impl SceneDatabase {
    /// Index `<levels_root>/<level>/Scenes/*.xml` for every level
    pub fn scan(levels_root: &Path) -> GameResult<Self> {
        let mut database = Self::default();
        for level in sorted_entries(levels_root)? {
            let scenes = level.join("Scenes");
            if !scenes.is_dir() {
                continue;
            }
            let level_name = level
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            for path in sorted_entries(&scenes)? {
                if path.extension().and_then(|ext| ext.to_str()) != Some(SCENE_EXTENSION) {
                    continue;
                }
                let Some(stem) = path.file_stem().map(|stem| stem.to_string_lossy().into_owned()) else {
                    continue;
                };
                database.insert(SceneEntry {
                    level: level_name.clone(),
                    name: stem,
                    path,
                });
            }
        }
        log::info!("Indexed {} scenes under {}", database.len(), levels_root.display());
        Ok(database)
    }

    /// Add a scene; the first entry wins on a key collision
    pub fn insert(&mut self, entry: SceneEntry) {
        let key = scene_key(&entry.name);
        match self.scenes.get(&key) {
            Some(existing) => log::warn!(
                "Scene {} collides with {} (key {:#010x}), keeping the first",
                entry.path.display(),
                existing.path.display(),
                key
            ),
            None => {
                self.scenes.insert(key, entry);
            }
        }
    }

    /// Scene for a key
    pub fn get(&self, key: u32) -> Option<&SceneEntry> {
        self.scenes.get(&key)
    }

    /// Number of indexed scenes
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    /// Whether no scenes were found
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

fn sorted_entries(dir: &Path) -> GameResult<Vec<PathBuf>> {
    let io_error = |source| SceneError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = std::fs::read_dir(dir)
        .map_err(io_error)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_error)?;
    entries.sort();
    Ok(entries)
}

/// Watches scene triggers and runs transitions
pub struct SceneChangeSystem {
    database: SceneDatabase,
    duration: f32,
    elapsed: Option<f32>,
}

impl SceneChangeSystem {
    /// System resolving trigger keys through `database`
    pub fn new(database: SceneDatabase, duration: f32) -> Self {
        Self {
            database,
            duration,
            elapsed: None,
        }
    }

    /// The scene index
    pub fn database(&self) -> &SceneDatabase {
        &self.database
    }

    /// Whether a transition is running
    pub fn in_transition(&self) -> bool {
        self.elapsed.is_some()
    }

    /// Advance a running transition, or start one if a character is
    /// touching a trigger. Returns `true` when a transition started.
    pub fn update(&mut self, ctx: &mut GameContext, delta_time: f32) -> GameResult<bool> {
        if let Some(elapsed) = self.elapsed.as_mut() {
            *elapsed += delta_time;
            if *elapsed > self.duration {
                self.finish(ctx);
            }
            return Ok(false);
        }

        let Some((trigger, character)) = Self::touched_trigger(ctx.registry.world()) else {
            return Ok(false);
        };

        ctx.state = AppState::Paused;
        if let Err(err) = self.begin(ctx, &trigger, character) {
            ctx.state = AppState::Play;
            return Err(err);
        }
        Ok(true)
    }

    fn touched_trigger(world: &World) -> Option<(SceneTriggerComponent, Entity)> {
        world.query::<SceneTriggerComponent>().find_map(|(entity, trigger)| {
            let collision = world.get_component::<CollisionStateComponent>(entity)?;
            collision
                .colliding_with
                .iter()
                .copied()
                .find(|&other| world.has_component::<CharacterComponent>(other))
                .map(|character| (trigger.clone(), character))
        })
    }

    fn begin(&mut self, ctx: &mut GameContext, trigger: &SceneTriggerComponent, character: Entity) -> GameResult<()> {
        let entry = self
            .database
            .get(trigger.scene_key)
            .ok_or(GameError::UnknownSceneKey(trigger.scene_key))?
            .clone();

        let current = ctx
            .registry
            .world()
            .get_component::<TransformComponent>(character)
            .map_or_else(Vec3::zeros, TransformComponent::world_position);
        ctx.globals.player_spawn = trigger.resolve(current);

        let other_level = entry.level != ctx.config.level.name;
        let level_dir = ctx.config.level.levels_root.join(&entry.level);
        let document = if other_level {
            ctx.registry.read_level_scene_file(&level_dir, &entry.path)?
        } else {
            ctx.registry.read_scene_file(&entry.path)?
        };
        if other_level {
            ctx.config.level.name = entry.level.clone();
            ctx.registry.set_directory(&level_dir);
        }
        ctx.registry.replace_scene(&document);
        ctx.globals.player = None;

        let world = ctx.registry.world_mut();
        let singleton = world.singleton();
        world.add_component(
            singleton,
            GameSceneComponent {
                level_index: document.scene_number,
                scene_changed: true,
            },
        );
        self.elapsed = Some(0.0);
        log::info!(
            "Scene change to '{}' (level {}), player will appear at {:?}",
            entry.name,
            entry.level,
            ctx.globals.player_spawn
        );
        Ok(())
    }

    fn finish(&mut self, ctx: &mut GameContext) {
        self.elapsed = None;
        let world = ctx.registry.world_mut();
        let singleton = world.singleton();
        world.remove_component::<GameSceneComponent>(singleton);
        ctx.state = AppState::Play;
        log::info!("Scene change complete");
    }
}
