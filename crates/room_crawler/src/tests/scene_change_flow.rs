use approx::assert_relative_eq;
use scene_engine::prelude::*;

use super::fixtures::{self, TestLevel};
use crate::components::{AppState, Axis, GameSceneComponent, SceneTriggerComponent};
use crate::characters::spawn_enemy;
use crate::environment::spawn_scene_trigger;
use crate::game::Game;
use crate::rooms::RoomState;
use crate::scene_change::scene_key;

fn started_game(level: &TestLevel) -> (Game, Entity) {
    let mut config = level.config();
    config.level.spawner_file = None;
    let mut game = Game::new(config).expect("game");
    game.tick(0.1);
    let player = game.context().globals.player.expect("player spawned");
    (game, player)
}

/// Place a trigger already touching `player`
fn touching_trigger(game: &mut Game, player: Entity, trigger: SceneTriggerComponent) -> Entity {
    let registry = &mut game.context_mut().registry;
    let entity = spawn_scene_trigger(registry, "Portal", Vec3::new(0.0, 1.0, 0.0), Vec3::repeat(1.0), trigger);
    registry
        .world_mut()
        .get_component_mut::<CollisionStateComponent>(entity)
        .expect("collision state")
        .begin_contact(player);
    entity
}

fn marker(game: &Game) -> Option<GameSceneComponent> {
    let world = game.context().registry.world();
    world.get_component::<GameSceneComponent>(world.singleton()).copied()
}

#[test]
fn test_trigger_pauses_swaps_scene_and_respawns_player() {
    let level = fixtures::level();
    let (mut game, player) = started_game(&level);
    assert_eq!(game.scene_change().database().len(), 4);
    touching_trigger(
        &mut game,
        player,
        SceneTriggerComponent::new(scene_key("Arena"), Vec3::new(0.0, 1.0, 104.0)),
    );

    game.tick(0.1);
    assert_eq!(game.context().state, AppState::Paused);
    assert_eq!(game.context().registry.current_scene(), "Arena");
    assert!(game.context().globals.player.is_none());
    assert!(game.context().registry.find_root("Gate").is_some());
    assert!(game.context().registry.find_root("Player").is_none());
    assert_eq!(
        marker(&game),
        Some(GameSceneComponent {
            level_index: 10,
            scene_changed: true
        })
    );

    game.tick(0.1);
    let respawned = game.context().globals.player.expect("respawned");
    assert_ne!(respawned, player);
    let transform = game
        .context()
        .registry
        .world()
        .get_component::<TransformComponent>(respawned)
        .expect("transform");
    assert_relative_eq!(transform.local.position, Vec3::new(0.0, 1.0, 104.0));
    assert_eq!(marker(&game).map(|m| m.scene_changed), Some(false));
    assert_eq!(game.rooms().map(|rooms| rooms.state().clone()), Some(RoomState::Idle));
    assert_eq!(game.context().state, AppState::Paused);

    game.tick(0.5);
    assert_eq!(game.context().state, AppState::Paused);
    game.tick(0.5);
    assert_eq!(game.context().state, AppState::Play);
    assert!(marker(&game).is_none());
    assert!(!game.scene_change().in_transition());

    let registry = &game.context().registry;
    let players = registry
        .parents()
        .iter()
        .filter(|&&root| registry.world().has_component::<CharacterComponent>(root))
        .count();
    assert_eq!(players, 1);
    registry.verify_hierarchy().expect("hierarchy");
}

#[test]
fn test_axis_trigger_keeps_the_other_coordinates() {
    let level = fixtures::level();
    let (mut game, player) = started_game(&level);
    game.context_mut().registry.teleport(player, Vec3::new(3.0, 1.0, -2.0));
    touching_trigger(
        &mut game,
        player,
        SceneTriggerComponent::new(scene_key("Arena"), Vec3::new(0.0, 0.0, 90.0)).along(Axis::Z),
    );

    game.tick(0.1);
    assert_relative_eq!(game.context().globals.player_spawn, Vec3::new(3.0, 1.0, 90.0));
}

#[test]
fn test_unknown_scene_unpauses_and_keeps_scene() {
    let level = fixtures::level();
    let (mut game, player) = started_game(&level);
    touching_trigger(&mut game, player, SceneTriggerComponent::new(42, Vec3::zeros()));

    game.tick(0.1);
    assert_eq!(game.context().state, AppState::Play);
    assert_eq!(game.context().globals.player, Some(player));
    assert!(game.context().registry.find_root("Crate").is_some());
    assert!(marker(&game).is_none());
    assert!(!game.scene_change().in_transition());
}

#[test]
fn test_scene_change_back_into_a_room_resumes_streaming() {
    let level = fixtures::level();
    let (mut game, player) = started_game(&level);
    touching_trigger(
        &mut game,
        player,
        SceneTriggerComponent::new(scene_key("RoomB"), Vec3::new(30.0, 1.0, 0.0)),
    );

    game.tick(0.1);
    game.tick(0.1);
    assert_eq!(
        game.rooms().map(|rooms| rooms.state().clone()),
        Some(RoomState::InRoom {
            current: "RoomB".to_string()
        })
    );
    assert!(game.context().registry.find_root("Ghoul1").is_some());
}

#[test]
fn test_broken_scene_in_other_level_keeps_directories() {
    let level = fixtures::level();
    level.write_level_file("Other", "Scenes/Broken.xml", r#"<Root><Scene Num="3"/><Node Name="Half">"#);
    let (mut game, player) = started_game(&level);
    let scene_dir = game.context().registry.scene_dir().to_path_buf();
    let prefab_dir = game.context().registry.serializer().prefab_dir().to_path_buf();
    touching_trigger(&mut game, player, SceneTriggerComponent::new(scene_key("Broken"), Vec3::zeros()));

    game.tick(0.1);
    let ctx = game.context_mut();
    assert_eq!(ctx.state, AppState::Play);
    assert_eq!(ctx.config.level.name, "Test");
    assert_eq!(ctx.registry.scene_dir(), scene_dir.as_path());
    assert_eq!(ctx.registry.serializer().prefab_dir(), prefab_dir.as_path());
    assert!(ctx.registry.find_root("Crate").is_some());
    spawn_enemy(&mut ctx.registry, Vec3::zeros(), Vec3::zeros(), "Bat9", "Bat").expect("prefabs still resolve");
}

#[test]
fn test_scene_in_other_level_uses_that_levels_prefabs() {
    let level = fixtures::level();
    level.write_level_file("Other", "Prefabs/Statue.prefab", r#"<Node Name="Statue" Engine="transform"/>"#);
    level.write_level_file(
        "Other",
        "Scenes/Gallery.xml",
        r#"<Root><Scene Num="5"/><Node Name="Statue1" Prefab="Statue"/></Root>"#,
    );
    let (mut game, player) = started_game(&level);
    touching_trigger(
        &mut game,
        player,
        SceneTriggerComponent::new(scene_key("Gallery"), Vec3::new(0.0, 1.0, 0.0)),
    );

    game.tick(0.1);
    let ctx = game.context();
    assert_eq!(ctx.state, AppState::Paused);
    assert_eq!(ctx.config.level.name, "Other");
    assert_eq!(ctx.registry.current_scene(), "Gallery");
    assert!(ctx.registry.find_root("Statue1").is_some());
    assert!(ctx.registry.scene_dir().ends_with("Other/Scenes"));
}
