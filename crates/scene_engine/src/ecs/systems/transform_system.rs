//! Transform propagation
//!
//! Walks every root's subtree and recomputes `world = parent.world * local`.
//! Nodes without a transform pass their parent's world matrix through to
//! their children unchanged.

use crate::ecs::components::{NodeComponent, TransformComponent};
use crate::ecs::{Entity, System, World};
use crate::foundation::math::Mat4;

/// Recomputes cached world matrices every frame
#[derive(Debug, Default)]
pub struct TransformSystem;

impl TransformSystem {
    /// Create the system
    pub fn new() -> Self {
        Self
    }

    /// Propagate world matrices below `entity`, starting from `parent_world`
    pub fn propagate(world: &mut World, entity: Entity, parent_world: Option<Mat4>) {
        let mut stack = vec![(entity, parent_world)];
        while let Some((current, parent)) = stack.pop() {
            let current_world = match world.get_component_mut::<TransformComponent>(current) {
                Some(transform) => {
                    transform.update_world(parent.as_ref());
                    Some(transform.world)
                }
                None => parent,
            };
            if let Some(node) = world.get_component::<NodeComponent>(current) {
                stack.extend(node.children.iter().rev().map(|&child| (child, current_world)));
            }
        }
    }

    /// World matrix of `entity`'s parent, if it has one with a transform
    pub fn parent_world(world: &World, entity: Entity) -> Option<Mat4> {
        let mut parent = world.get_component::<NodeComponent>(entity)?.parent;
        while let Some(current) = parent {
            if let Some(transform) = world.get_component::<TransformComponent>(current) {
                return Some(transform.world);
            }
            parent = world.get_component::<NodeComponent>(current)?.parent;
        }
        None
    }
}

impl System for TransformSystem {
    fn run(&mut self, world: &mut World) {
        let roots: Vec<Entity> = world
            .query::<NodeComponent>()
            .filter(|(_, node)| node.is_root())
            .map(|(entity, _)| entity)
            .collect();
        for root in roots {
            Self::propagate(world, root, None);
        }

        let loose: Vec<Entity> = world
            .entities_with::<TransformComponent>()
            .into_iter()
            .filter(|&entity| !world.has_component::<NodeComponent>(entity))
            .collect();
        for entity in loose {
            if let Some(transform) = world.get_component_mut::<TransformComponent>(entity) {
                transform.update_world(None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use approx::assert_relative_eq;

    #[test]
    fn test_propagation_skips_nodes_without_transform() {
        let mut world = World::new();
        let root = world.create_entity();
        let pivot = world.create_entity();
        let leaf = world.create_entity();

        let mut root_node = NodeComponent::root(root, "Root");
        root_node.push_child(pivot);
        let mut pivot_node = NodeComponent::child(pivot, "Pivot", root);
        pivot_node.push_child(leaf);
        world.add_component(root, root_node);
        world.add_component(pivot, pivot_node);
        world.add_component(leaf, NodeComponent::child(leaf, "Leaf", pivot));
        world.add_component(root, TransformComponent::from_position(Vec3::new(10.0, 0.0, 0.0)));
        world.add_component(leaf, TransformComponent::from_position(Vec3::new(0.0, 1.0, 0.0)));

        TransformSystem::new().run(&mut world);

        let leaf_world = world.get_component::<TransformComponent>(leaf).expect("leaf").world_position();
        assert_relative_eq!(leaf_world, Vec3::new(10.0, 1.0, 0.0));
        assert_eq!(
            TransformSystem::parent_world(&world, leaf).map(|m| m.m14),
            Some(10.0)
        );
    }
}
