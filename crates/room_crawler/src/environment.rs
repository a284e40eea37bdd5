//! Level hazards and well-known scene roots

use scene_engine::prelude::*;

use crate::components::{AudioComponent, Environmental, EnvironmentalComponent, SceneTriggerComponent};
use crate::error::GameResult;
use crate::items::place_prefab;

/// A hole the player can fall into, with a trigger volume of half-size `extents`
pub fn spawn_hole(registry: &mut SceneRegistry, position: Vec3, extents: Vec3) -> GameResult<Entity> {
    let hole = place_prefab(registry, "Hole", position)?;
    let world = registry.world_mut();
    world.add_component(hole, EnvironmentalComponent { kind: Environmental::Hole });
    world.add_component(hole, ColliderComponent::new(ColliderShape::Box(extents), 0.0).as_trigger());
    if let Some(node) = world.get_component_mut::<NodeComponent>(hole) {
        node.engine_flags |= EngineFlags::COLLIDER;
    }
    world.refresh(hole);
    Ok(hole)
}

/// An invisible trigger volume of half-size `extents` that sends a character
/// touching it to another scene
pub fn spawn_scene_trigger(
    registry: &mut SceneRegistry,
    name: &str,
    position: Vec3,
    extents: Vec3,
    trigger: SceneTriggerComponent,
) -> Entity {
    let entity = registry.create_empty_object(name);
    registry.teleport(entity, position);
    let world = registry.world_mut();
    world.add_component(entity, ColliderComponent::new(ColliderShape::Box(extents), 0.0).as_trigger());
    world.add_component(entity, CollisionStateComponent::default());
    world.add_component(entity, trigger);
    if let Some(node) = world.get_component_mut::<NodeComponent>(entity) {
        node.engine_flags |= EngineFlags::COLLIDER | EngineFlags::HEADNODE;
    }
    world.refresh(entity);
    entity
}

/// First light root and first camera root.
///
/// The camera is given the pickup sound if it has no audio yet.
pub fn find_light_camera(registry: &mut SceneRegistry) -> (Option<Entity>, Option<Entity>) {
    let light = registry.find_root_with::<LightComponent>();
    let camera = registry.find_root_with::<CameraComponent>();
    if let Some(camera) = camera {
        let world = registry.world_mut();
        if !world.has_component::<AudioComponent>(camera) {
            world.add_component(camera, AudioComponent::new("Audio/pickupCoin.wav"));
            world.refresh(camera);
        }
    }
    (light, camera)
}

/// The root called `Floor`
pub fn find_floor(registry: &SceneRegistry) -> Option<Entity> {
    registry.find_root("Floor")
}
