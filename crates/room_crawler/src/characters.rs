//! Player and enemy spawning
//!
//! Every character starts as a prefab; the runtime-only components
//! (controllers, AI, stats, collision) are attached here.

use scene_engine::prelude::*;

use crate::components::{
    AnimationComponent, AttackComponent, AudioComponent, CharacterRotationComponent,
    ControllerComponent, EnemyAiComponent, Facing, MovementComponent, NodeGraphComponent,
    StatsComponent,
};
use crate::config::PlayerConfig;
use crate::error::GameResult;

/// Mass of character physics bodies
pub const CHARACTER_MASS: f32 = 0.1;

/// Weapon placement relative to the hand socket
const WEAPON_OFFSET: [f32; 3] = [0.0, 0.0, -2.25];
const WEAPON_ROTATION_DEGREES: [f32; 3] = [0.0, 0.0, 90.0];
const WEAPON_SCALE: f32 = 10.0;

/// Spawn the player prefab at `position` with controller, combat and
/// collision components, and its weapon in hand
///
/// On error the partly built player is removed again.
pub fn spawn_player(registry: &mut SceneRegistry, config: &PlayerConfig, position: Vec3) -> GameResult<Entity> {
    let player = registry.load_prefab(&config.prefab)?;
    if let Err(err) = equip_player(registry, player, config, position) {
        registry.delete_node(player);
        return Err(err);
    }
    log::info!("Spawned player '{}' at {:?}", config.name, position);
    Ok(player)
}

fn equip_player(registry: &mut SceneRegistry, player: Entity, config: &PlayerConfig, position: Vec3) -> GameResult<()> {
    registry.rename(player, config.name.as_str())?;
    registry.insert_controller(player)?;

    {
        let world = registry.world_mut();
        world.add_component(player, ControllerComponent::new());
        world.add_component(player, CharacterComponent::new(config.speed));
        world.add_component(
            player,
            MovementComponent {
                walk_speed: config.speed,
                ..MovementComponent::default()
            },
        );
        world.add_component(player, CharacterRotationComponent::new(Facing::Down));
        world.add_component(
            player,
            ColliderComponent::new(ColliderShape::Capsule { radius: 0.25, height: 0.8 }, CHARACTER_MASS),
        );

        let graph = NodeGraphComponent::flatten(world, player);
        world.add_component(player, graph);
        world.add_component(
            player,
            AnimationComponent::looping(config.prefab.as_str(), "idleStart", "idleEnd", 2.0),
        );
        world.add_component(player, AttackComponent::default());
        world.add_component(player, StatsComponent::new(100, 25, 10, 0.75));
        world.add_component(player, AudioComponent::new("Audio/hitHurt.wav"));

        if let Some(node) = world.get_component_mut::<NodeComponent>(player) {
            node.is_parent = true;
            node.engine_flags |= EngineFlags::TRANSFORM | EngineFlags::COLLIDER | EngineFlags::HEADNODE;
            node.game_flags |= GameFlags::MOVEMENT;
        }
        world.refresh(player);
    }

    registry.teleport(player, position);
    registry.insert_rigid_body(player, CHARACTER_MASS)?;

    if let Some(weapon) = &config.weapon_prefab {
        attach_weapon(registry, player, weapon, &config.weapon_socket)?;
    }
    Ok(())
}

/// Parent a weapon prefab to the node called `socket` in the character's
/// graph, falling back to the character root
fn attach_weapon(registry: &mut SceneRegistry, character: Entity, prefab: &str, socket: &str) -> GameResult<Entity> {
    let weapon = registry.load_prefab(prefab)?;
    let hand = registry
        .world()
        .get_component::<NodeGraphComponent>(character)
        .and_then(|graph| graph.find(registry.world(), socket))
        .unwrap_or_else(|| {
            log::warn!("No socket '{}' on {:?}, attaching weapon to the root", socket, character);
            character
        });

    registry.make_child(weapon, hand)?;

    let world = registry.world_mut();
    if let Some(transform) = world.get_component_mut::<TransformComponent>(weapon) {
        transform.local = Transform::from_euler_degrees(
            Vec3::from(WEAPON_OFFSET),
            Vec3::from(WEAPON_ROTATION_DEGREES),
            Vec3::repeat(WEAPON_SCALE),
        );
    }
    let parent_world = TransformSystem::parent_world(world, weapon);
    TransformSystem::propagate(world, weapon, parent_world);
    world.refresh(weapon);
    Ok(weapon)
}

/// Spawn a static-pose enemy
pub fn spawn_enemy(
    registry: &mut SceneRegistry,
    position: Vec3,
    rotation_degrees: Vec3,
    name: &str,
    prefab: &str,
) -> GameResult<Entity> {
    let enemy = spawn_enemy_base(registry, position, rotation_degrees, name, prefab, Facing::Up)?;
    let world = registry.world_mut();
    world.add_component(enemy, AudioComponent::new("Audio/menu.wav"));
    world.refresh(enemy);
    Ok(enemy)
}

/// Spawn an enemy that plays its walk cycle.
///
/// Only prefabs with a skeleton (more than one node) get the animation.
pub fn spawn_enemy_anim(
    registry: &mut SceneRegistry,
    position: Vec3,
    rotation_degrees: Vec3,
    name: &str,
    prefab: &str,
) -> GameResult<Entity> {
    let enemy = spawn_enemy_base(registry, position, rotation_degrees, name, prefab, Facing::Left)?;
    let world = registry.world_mut();
    let rigged = world
        .get_component::<NodeGraphComponent>(enemy)
        .is_some_and(|graph| graph.nodes.len() > 1);
    if rigged {
        world.add_component(enemy, AnimationComponent::looping(prefab, "walkStart", "walkEnd", 0.5));
        world.refresh(enemy);
    }
    Ok(enemy)
}

fn spawn_enemy_base(
    registry: &mut SceneRegistry,
    position: Vec3,
    rotation_degrees: Vec3,
    name: &str,
    prefab: &str,
    facing: Facing,
) -> GameResult<Entity> {
    let enemy = registry.load_prefab(prefab)?;
    if let Err(err) = dress_enemy(registry, enemy, position, rotation_degrees, name, facing) {
        registry.delete_node(enemy);
        return Err(err);
    }
    log::debug!("Spawned enemy '{}' from '{}' at {:?}", name, prefab, position);
    Ok(enemy)
}

fn dress_enemy(
    registry: &mut SceneRegistry,
    enemy: Entity,
    position: Vec3,
    rotation_degrees: Vec3,
    name: &str,
    facing: Facing,
) -> GameResult<()> {
    registry.rename(enemy, name)?;

    let world = registry.world_mut();
    let scale = world
        .get_component::<TransformComponent>(enemy)
        .map_or_else(|| Vec3::repeat(1.0), |transform| transform.local.scale);
    world.add_component(
        enemy,
        TransformComponent::from_transform(Transform::from_euler_degrees(position, rotation_degrees, scale)),
    );
    TransformSystem::propagate(world, enemy, None);

    let graph = NodeGraphComponent::flatten(world, enemy);
    world.add_component(enemy, graph);
    world.add_component(enemy, CharacterRotationComponent::new(facing));
    world.add_component(enemy, EnemyAiComponent::default());
    world.add_component(enemy, MovementComponent::default());
    world.add_component(enemy, StatsComponent::default());
    if !world.has_component::<ColliderComponent>(enemy) {
        world.add_component(enemy, ColliderComponent::new(ColliderShape::Box(scale), CHARACTER_MASS));
    }

    if let Some(node) = world.get_component_mut::<NodeComponent>(enemy) {
        node.is_parent = true;
        node.engine_flags |= EngineFlags::TRANSFORM | EngineFlags::COLLIDER | EngineFlags::HEADNODE;
        node.game_flags |= GameFlags::MOVEMENT;
    }
    world.refresh(enemy);

    let mass = world
        .get_component::<RigidBodyComponent>(enemy)
        .map_or(CHARACTER_MASS, |body| body.mass);
    registry.insert_rigid_body(enemy, mass)?;
    Ok(())
}

/// Scene roots that are enemies
pub fn find_enemies(registry: &SceneRegistry) -> Vec<Entity> {
    registry
        .parents()
        .iter()
        .copied()
        .filter(|&root| registry.world().has_component::<EnemyAiComponent>(root))
        .collect()
}
