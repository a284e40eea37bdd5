//! Game start-up and the respawn after a scene change

use std::path::Path;

use scene_engine::prelude::*;
use scene_engine::scene::{read_document, Attributes, XmlElement};

use crate::characters::{spawn_enemy_anim, spawn_player};
use crate::components::{AppState, GameSceneComponent};
use crate::error::{GameError, GameResult};
use crate::game::GameContext;
use crate::rooms::RoomController;

/// Brings the game up on the first playing tick and puts the player back
/// into the world whenever a scene change leaves its marker
#[derive(Debug, Default)]
pub struct GameSceneSystem {
    started: bool,
}

impl GameSceneSystem {
    /// Not yet started
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether start-up has run
    pub fn started(&self) -> bool {
        self.started
    }

    /// Start the game on the first tick in `Play`, then watch for the
    /// scene-change marker. The marker is honored even while paused so the
    /// player is in place before gameplay resumes.
    pub fn update(&mut self, ctx: &mut GameContext, rooms: Option<&mut RoomController>) -> GameResult<()> {
        if !self.started {
            if ctx.state == AppState::Play {
                self.start_up(ctx, rooms)?;
            }
            return Ok(());
        }
        self.respawn(ctx, rooms)?;
        Ok(())
    }

    /// Spawn the player, then enter the first room (or load the start
    /// scene when the level has no rooms) and import the scene script.
    ///
    /// Runs once; a failure is not retried.
    pub fn start_up(&mut self, ctx: &mut GameContext, rooms: Option<&mut RoomController>) -> GameResult<Entity> {
        self.started = true;

        if rooms.is_none() {
            if let Some(scene) = ctx.config.level.start_scene.clone() {
                ctx.registry.load_scene(&scene)?;
            }
        }

        let position = Vec3::from(ctx.config.player.start_position);
        let player = spawn_player(&mut ctx.registry, &ctx.config.player, position)?;
        ctx.globals.player = Some(player);
        ctx.globals.player_spawn = position;

        if let Some(rooms) = rooms {
            rooms.activate(&mut ctx.registry, player)?;
        }
        if let Some(script) = ctx.config.level.scene_script.clone() {
            let path = ctx.config.level_directory().join(script);
            import_scene_script(&mut ctx.registry, &path)?;
        }

        log::info!("Game started in scene '{}'", ctx.registry.current_scene());
        Ok(player)
    }

    /// Spawn the player at the pending spawn point if a scene change just
    /// happened. Returns the new player.
    pub fn respawn(&mut self, ctx: &mut GameContext, rooms: Option<&mut RoomController>) -> GameResult<Option<Entity>> {
        let singleton = ctx.registry.world().singleton();
        let Some(marker) = ctx.registry.world_mut().get_component_mut::<GameSceneComponent>(singleton) else {
            return Ok(None);
        };
        if !marker.scene_changed {
            return Ok(None);
        }
        marker.scene_changed = false;

        let player = spawn_player(&mut ctx.registry, &ctx.config.player, ctx.globals.player_spawn)?;
        ctx.globals.player = Some(player);
        if let Some(rooms) = rooms {
            let scene = ctx.registry.current_scene().to_string();
            rooms.sync_to_scene(&mut ctx.registry, &scene, player)?;
        }
        log::info!(
            "Player respawned at {:?} in scene '{}'",
            ctx.globals.player_spawn,
            ctx.registry.current_scene()
        );
        Ok(Some(player))
    }
}

/// Spawn the enemies listed in a scene script.
///
/// ```xml
/// <Root>
///   <Node Name="Ghoul1" Prefab="Ghoul" Type="enemy">
///     <Transform><Position x="2" y="1" z="4"/><Rotation x="0" y="90" z="0"/></Transform>
///   </Node>
/// </Root>
/// ```
///
/// Rotation is in degrees. Entries of another type are skipped.
pub fn import_scene_script(registry: &mut SceneRegistry, path: &Path) -> GameResult<Vec<Entity>> {
    let root = read_document(path)?;
    let mut spawned = Vec::new();

    for node in root.children_named("Node") {
        let attrs = Attributes::new(node, path);
        let name = attrs.string("Name")?;
        let prefab = attrs.string("Prefab")?;
        let kind: String = attrs.parse_or("Type", "enemy".to_string())?;
        if kind != "enemy" {
            log::warn!("Skipping '{}' in {}: unsupported type '{}'", name, path.display(), kind);
            continue;
        }

        let transform = node.child("Transform");
        let position = script_vector(transform, "Position", path)?;
        let rotation = script_vector(transform, "Rotation", path)?;
        spawned.push(spawn_enemy_anim(registry, position, rotation, name, prefab)?);
    }

    log::info!("Imported {} enemies from {}", spawned.len(), path.display());
    Ok(spawned)
}

fn script_vector(transform: Option<&XmlElement>, element: &str, path: &Path) -> Result<Vec3, GameError> {
    let Some(el) = transform.and_then(|transform| transform.child(element)) else {
        return Ok(Vec3::zeros());
    };
    let attrs = Attributes::new(el, path);
    Ok(Vec3::new(
        attrs.parse_or("x", 0.0)?,
        attrs.parse_or("y", 0.0)?,
        attrs.parse_or("z", 0.0)?,
    ))
}
