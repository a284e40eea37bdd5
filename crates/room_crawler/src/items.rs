//! Pickups and interactable props

use scene_engine::prelude::*;

use crate::components::{
    Collectible, CollectibleComponent, Interactable, InteractableComponent, NodeGraphComponent,
};
use crate::error::GameResult;

/// Load `prefab` as a head-node root placed at `position`
pub(crate) fn place_prefab(registry: &mut SceneRegistry, prefab: &str, position: Vec3) -> GameResult<Entity> {
    let entity = registry.load_prefab(prefab)?;
    registry.teleport(entity, position);
    if let Some(node) = registry.world_mut().get_component_mut::<NodeComponent>(entity) {
        node.engine_flags |= EngineFlags::HEADNODE;
    }
    Ok(entity)
}

fn collectible(registry: &mut SceneRegistry, prefab: &str, kind: Collectible, position: Vec3) -> GameResult<Entity> {
    let entity = place_prefab(registry, prefab, position)?;
    let world = registry.world_mut();
    world.add_component(entity, CollectibleComponent { kind });
    world.refresh(entity);
    Ok(entity)
}

/// A heart that restores health when collected
pub fn spawn_heart(registry: &mut SceneRegistry, position: Vec3) -> GameResult<Entity> {
    collectible(registry, "Heart", Collectible::Heart, position)
}

/// A power-up pickup
pub fn spawn_power_up(registry: &mut SceneRegistry, position: Vec3) -> GameResult<Entity> {
    collectible(registry, "PowerUp", Collectible::Power, position)
}

/// A chest the player can open
pub fn spawn_chest(registry: &mut SceneRegistry, position: Vec3) -> GameResult<Entity> {
    let chest = place_prefab(registry, "Chest", position)?;
    let world = registry.world_mut();
    if let Some(node) = world.get_component_mut::<NodeComponent>(chest) {
        node.is_parent = true;
    }
    let graph = NodeGraphComponent::flatten(world, chest);
    world.add_component(chest, graph);
    world.add_component(chest, InteractableComponent::new(Interactable::Chest));
    world.refresh(chest);
    Ok(chest)
}

/// A floor button
pub fn spawn_button(registry: &mut SceneRegistry, position: Vec3) -> GameResult<Entity> {
    let button = place_prefab(registry, "Button", position)?;
    let world = registry.world_mut();
    world.add_component(button, InteractableComponent::new(Interactable::Button));
    world.refresh(button);
    Ok(button)
}

/// A sword lying on the ground
pub fn spawn_sword(registry: &mut SceneRegistry, position: Vec3) -> GameResult<Entity> {
    let sword = registry.load_prefab("Sword")?;
    registry.teleport(sword, position);
    registry.world_mut().refresh(sword);
    Ok(sword)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures;
    use approx::assert_relative_eq;

    #[test]
    fn test_pickups_are_placed_head_nodes() {
        let level = fixtures::level();
        let mut registry = level.registry();

        let heart = spawn_heart(&mut registry, Vec3::new(1.0, 0.5, 2.0)).expect("heart");
        let power = spawn_power_up(&mut registry, Vec3::zeros()).expect("power");

        let world = registry.world();
        assert_eq!(
            world.get_component::<CollectibleComponent>(heart).map(|c| c.kind),
            Some(Collectible::Heart)
        );
        assert_eq!(
            world.get_component::<CollectibleComponent>(power).map(|c| c.kind),
            Some(Collectible::Power)
        );
        assert!(registry.node(heart).expect("node").engine_flags.contains(EngineFlags::HEADNODE));
        assert_relative_eq!(
            world.get_component::<TransformComponent>(heart).expect("transform").world_position(),
            Vec3::new(1.0, 0.5, 2.0)
        );
    }

    #[test]
    fn test_chest_and_button_are_interactable() {
        let level = fixtures::level();
        let mut registry = level.registry();

        let chest = spawn_chest(&mut registry, Vec3::zeros()).expect("chest");
        let button = spawn_button(&mut registry, Vec3::zeros()).expect("button");
        let world = registry.world();

        assert_eq!(
            world.get_component::<InteractableComponent>(chest).map(|i| i.kind),
            Some(Interactable::Chest)
        );
        assert_eq!(
            world.get_component::<NodeGraphComponent>(chest).map(|g| g.nodes.len()),
            Some(2)
        );
        assert_eq!(
            world.get_component::<InteractableComponent>(button).map(|i| i.kind),
            Some(Interactable::Button)
        );
    }
}
