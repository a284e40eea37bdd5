use approx::assert_relative_eq;
use scene_engine::prelude::*;

use super::fixtures::{self, TestLevel};
use crate::components::{CameraFollowComponent, CameraMode};
use crate::game::Game;
use crate::rooms::RoomState;

const TICK: f32 = 1.0 / 60.0;

fn started_game(level: &TestLevel) -> (Game, Entity) {
    let mut config = level.config();
    config.level.spawner_file = None;
    let mut game = Game::new(config).expect("game");
    game.tick(TICK);
    let player = game.context().globals.player.expect("player spawned");
    (game, player)
}

fn current_room(game: &Game) -> String {
    match game.rooms().expect("rooms").state() {
        RoomState::InRoom { current } => current.clone(),
        RoomState::Idle => String::new(),
    }
}

fn position(game: &Game, entity: Entity) -> Vec3 {
    game.context()
        .registry
        .world()
        .get_component::<TransformComponent>(entity)
        .expect("transform")
        .local
        .position
}

fn controlled_roots(game: &Game) -> usize {
    let registry = &game.context().registry;
    registry
        .parents()
        .iter()
        .filter(|&&root| {
            registry
                .node(root)
                .is_some_and(|node| node.game_flags.contains(GameFlags::CONTROLLER))
        })
        .count()
}

#[test]
fn test_start_up_enters_first_room() {
    let level = fixtures::level();
    let (game, player) = started_game(&level);
    let registry = &game.context().registry;

    assert_eq!(current_room(&game), "RoomA");
    assert!(registry.find_root("Floor").is_some());
    assert!(registry.find_root("Bat1").is_some());
    let camera = registry.find_root("Camera").expect("camera");
    let follow = registry
        .world()
        .get_component::<CameraFollowComponent>(camera)
        .expect("follow");
    assert_eq!(follow.target, player);
    assert_eq!(follow.camera_type, CameraMode::Follow);
    registry.verify_hierarchy().expect("hierarchy");
}

#[test]
fn test_right_door_places_player_inside_left_edge() {
    let level = fixtures::level();
    let (mut game, player) = started_game(&level);

    game.context_mut().registry.teleport(player, Vec3::new(10.1, 1.0, 3.0));
    game.tick(TICK);

    assert_eq!(current_room(&game), "RoomB");
    assert_relative_eq!(position(&game, player), Vec3::new(21.5, 1.0, 3.0));

    let registry = &game.context().registry;
    assert!(registry.find_root("Crate").is_none());
    assert!(registry.find_root("Bat1").is_none());
    assert!(registry.find_root("Pillar").is_some());
    assert!(registry.find_root("Ghoul1").is_some());
    assert!(registry.find_root("Ghoul2").is_some());
    assert_eq!(controlled_roots(&game), 1);

    let camera = registry.find_root("Camera").expect("camera");
    let follow = registry
        .world()
        .get_component::<CameraFollowComponent>(camera)
        .expect("follow");
    assert_eq!(follow.camera_type, CameraMode::FollowX);
    registry.verify_hierarchy().expect("hierarchy");
}

#[test]
fn test_killed_enemy_stays_dead_when_returning() {
    let level = fixtures::level();
    let (mut game, player) = started_game(&level);

    game.rooms_mut()
        .expect("rooms")
        .set_enemy_death("Bat1", Vec3::new(4.0, 1.0, -1.0))
        .expect("death");

    game.context_mut().registry.teleport(player, Vec3::new(10.1, 1.0, 0.0));
    game.tick(TICK);
    assert_eq!(current_room(&game), "RoomB");

    game.context_mut().registry.teleport(player, Vec3::new(19.0, 1.0, 0.0));
    game.tick(TICK);
    assert_eq!(current_room(&game), "RoomA");
    assert_relative_eq!(position(&game, player), Vec3::new(8.5, 1.0, 0.0));

    let registry = &game.context().registry;
    assert!(registry.find_root("Floor").is_some());
    assert!(registry.find_root("Bat1").is_none());
    let bat = game
        .rooms()
        .and_then(|rooms| rooms.current_room())
        .and_then(|room| room.enemy("Bat1"))
        .expect("record");
    assert!(!bat.alive);
    assert_relative_eq!(bat.spawn_point, Vec2::new(4.0, -1.0));
}

#[test]
fn test_wall_without_door_keeps_player_in_room() {
    let level = fixtures::level();
    let (mut game, player) = started_game(&level);

    game.context_mut().registry.teleport(player, Vec3::new(2.0, 1.0, 9.0));
    game.tick(TICK);

    assert_eq!(current_room(&game), "RoomA");
    assert_relative_eq!(position(&game, player), Vec3::new(2.0, 1.0, 8.0));
    assert!(game.context().registry.find_root("Crate").is_some());
}

#[test]
fn test_unreadable_destination_leaves_room_intact() {
    let level = fixtures::level();
    let (mut game, player) = started_game(&level);
    std::fs::remove_file(level.path("Scenes/RoomB.xml")).expect("remove");

    game.context_mut().registry.teleport(player, Vec3::new(10.1, 1.0, 0.0));
    game.tick(TICK);

    assert_eq!(current_room(&game), "RoomA");
    assert_relative_eq!(position(&game, player), Vec3::new(10.1, 1.0, 0.0));
    let registry = &game.context().registry;
    assert!(registry.find_root("Crate").is_some());
    assert!(registry.find_root("Bat1").is_some());
}

#[test]
fn test_first_tick_loads_spawners() {
    let level = fixtures::level();
    let mut game = Game::new(level.config()).expect("game");
    game.tick(TICK);

    let registry = &game.context().registry;
    assert!(registry.find_root("Bats(0)").is_some());
    assert_eq!(controlled_roots(&game), 1);
}
