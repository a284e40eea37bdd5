//! The game loop
//!
//! One `Game::tick` runs every gameplay system once in a fixed order:
//!
//! 1. world maintenance (deferred deletions)
//! 2. start-up / respawn
//! 3. room streaming and spawners, skipped while paused
//! 4. scene-change triggers and the transition timer
//! 5. transform propagation and renderer notification
//!
//! System errors are logged and the frame continues.

use scene_engine::prelude::*;

use crate::components::{AppState, GlobalData};
use crate::config::GameConfig;
use crate::error::{GameError, GameResult};
use crate::game_scene::GameSceneSystem;
use crate::rooms::RoomController;
use crate::scene_change::{SceneChangeSystem, SceneDatabase};
use crate::spawn::{load_spawners, SpawnSystem};

/// State shared by the gameplay systems
pub struct GameContext {
    /// Scene roots and the world
    pub registry: SceneRegistry,
    /// Active configuration; the level name follows scene changes
    pub config: GameConfig,
    /// Play or paused
    pub state: AppState,
    /// Player handle and pending spawn point
    pub globals: GlobalData,
}

impl GameContext {
    /// Context with a registry pointed at the configured level
    pub fn new(config: GameConfig) -> Self {
        let level = config.level_directory();
        let registry = SceneRegistry::new(level.join("Scenes"), level.join("Prefabs"));
        Self {
            registry,
            config,
            state: AppState::Play,
            globals: GlobalData::default(),
        }
    }
}

/// The assembled game
pub struct Game {
    ctx: GameContext,
    game_scene: GameSceneSystem,
    rooms: Option<RoomController>,
    spawner: SpawnSystem,
    scene_change: SceneChangeSystem,
    transforms: TransformSystem,
    frame: u64,
}

impl Game {
    /// Validate `config`, read the level's room and spawner files and index
    /// every scene under the levels root
    pub fn new(config: GameConfig) -> GameResult<Self> {
        config.validate().map_err(GameError::InvalidConfig)?;

        let mut ctx = GameContext::new(config);
        let rooms = ctx
            .config
            .room_file()
            .map(|path| RoomController::load(&path, &ctx.config))
            .transpose()?;
        if let Some(path) = ctx.config.spawner_file() {
            load_spawners(&mut ctx.registry, &path)?;
        }
        let database = SceneDatabase::scan(&ctx.config.level.levels_root)?;

        Ok(Self {
            spawner: SpawnSystem::new(ctx.config.rng_seed),
            scene_change: SceneChangeSystem::new(database, ctx.config.transition.duration),
            game_scene: GameSceneSystem::new(),
            transforms: TransformSystem::new(),
            rooms,
            ctx,
            frame: 0,
        })
    }

    /// Shared state
    pub fn context(&self) -> &GameContext {
        &self.ctx
    }

    /// Shared state, mutably
    pub fn context_mut(&mut self) -> &mut GameContext {
        &mut self.ctx
    }

    /// The room controller, when the level has rooms
    pub fn rooms(&self) -> Option<&RoomController> {
        self.rooms.as_ref()
    }

    /// The room controller, mutably
    pub fn rooms_mut(&mut self) -> Option<&mut RoomController> {
        self.rooms.as_mut()
    }

    /// The scene-change system
    pub fn scene_change(&self) -> &SceneChangeSystem {
        &self.scene_change
    }

    /// Ticks run so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Route change notifications to a renderer
    pub fn set_renderer(&mut self, renderer: Box<dyn RenderNotifier>) {
        self.ctx.registry.set_renderer(renderer);
    }

    /// Advance the game by one fixed step of `delta_time` seconds
    pub fn tick(&mut self, delta_time: f32) {
        let removed = self.ctx.registry.world_mut().maintain();
        if removed > 0 {
            log::trace!("Removed {} entities", removed);
        }

        if let Err(err) = self.game_scene.update(&mut self.ctx, self.rooms.as_mut()) {
            log::error!("Game scene: {}", err);
        }

        if self.ctx.state == AppState::Play {
            if let (Some(rooms), Some(player)) = (self.rooms.as_mut(), self.ctx.globals.player) {
                if let Err(err) = rooms.process(&mut self.ctx.registry, player) {
                    log::error!("Rooms: {}", err);
                }
            }
            if let Err(err) = self.spawner.update(&mut self.ctx.registry, delta_time) {
                log::error!("Spawners: {}", err);
            }
        }

        if let Err(err) = self.scene_change.update(&mut self.ctx, delta_time) {
            log::error!("Scene change: {}", err);
        }

        self.transforms.run(self.ctx.registry.world_mut());
        self.ctx.registry.flush_changes();
        self.frame += 1;
    }
}
