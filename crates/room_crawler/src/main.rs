//! Headless runner
//!
//! `room_crawler [config] [frames]` loads the configuration (defaults to
//! the Test level), runs the game for a number of simulated frames and
//! walks the player east so room swaps can be watched in the log.

use std::error::Error;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use room_crawler::components::{AppState, MovementComponent};
use room_crawler::config::GameConfig;
use room_crawler::game::Game;
use scene_engine::foundation::logging;
use scene_engine::prelude::*;

const DEFAULT_CONFIG: &str = "assets/levels/Test/Config/game.toml";
const DEFAULT_FRAMES: u64 = 600;
const FRAME_TIME: f32 = 1.0 / 60.0;

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let config_path = args.next().map_or_else(|| PathBuf::from(DEFAULT_CONFIG), PathBuf::from);
    let frames = args.next().map(|arg| arg.parse::<u64>()).transpose()?.unwrap_or(DEFAULT_FRAMES);

    let config = GameConfig::load_or_default(&config_path)?;
    logging::init_with_level(&config.engine.log_level);
    log::info!("Using {}", config_path.display());

    let mut clock = FixedStep::new(config.engine.fixed_tick);
    let mut game = Game::new(config)?;
    let memory = Arc::new(Mutex::new(ObjectMemoryTracker::default()));
    game.set_renderer(Box::new(Arc::clone(&memory)));
    let stopwatch = Stopwatch::start_new();

    for _ in 0..frames {
        for _ in 0..clock.advance(FRAME_TIME) {
            walk_east(&mut game, clock.step());
            game.tick(clock.step());
        }
    }

    let ctx = game.context();
    log::info!(
        "Ran {} ticks in {:.1} ms; scene '{}' has {} roots",
        game.frame(),
        stopwatch.elapsed_millis(),
        ctx.registry.current_scene(),
        ctx.registry.parents().len()
    );
    if let Ok(memory) = memory.lock() {
        log::info!(
            "Renderer notified {} times, peak {} roots",
            memory.updates,
            memory.peak_root_count
        );
    }
    if let Some(room) = game.rooms().and_then(|rooms| rooms.current_room()) {
        log::info!("Player finished in room '{}'", room.name);
    }
    Ok(())
}

/// Stand-in for input: move the player along +x at walk speed
fn walk_east(game: &mut Game, delta_time: f32) {
    let ctx = game.context_mut();
    if ctx.state != AppState::Play {
        return;
    }
    let Some(player) = ctx.globals.player else {
        return;
    };
    let world = ctx.registry.world();
    let Some(position) = world.get_component::<TransformComponent>(player).map(|t| t.local.position) else {
        return;
    };
    let speed = world
        .get_component::<MovementComponent>(player)
        .map_or(0.0, |movement| movement.walk_speed);
    ctx.registry.teleport(player, position + Vec3::new(speed * delta_time, 0.0, 0.0));
}
