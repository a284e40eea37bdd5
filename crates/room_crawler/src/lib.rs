//! # Room Crawler
//!
//! A top-down action game built on `scene_engine`. The level is a set of
//! rooms, each its own scene; walking through a door streams the next room
//! in around the player. Enemies come from room definitions, timed
//! spawners and scene scripts, and collision triggers move the player
//! between whole scenes.
//!
//! ```rust,no_run
//! use room_crawler::{config::GameConfig, game::Game};
//! use scene_engine::prelude::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GameConfig::load_or_default("assets/levels/Test/Config/game.toml")?;
//!     let mut game = Game::new(config)?;
//!     for _ in 0..60 {
//!         game.tick(1.0 / 60.0);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod characters;
pub mod components;
pub mod config;
pub mod environment;
pub mod error;
pub mod game;
pub mod game_scene;
pub mod items;
pub mod rooms;
pub mod scene_change;
pub mod spawn;

pub use error::{GameError, GameResult};

#[cfg(test)]
mod tests;
