//! Collision and rigid-body components for ECS
//!
//! Narrow-phase collision lives outside the scene layer. These components
//! carry the data the physics backend consumes and the per-frame contact set
//! it writes back, which gameplay systems such as scene triggers read.

use std::collections::HashSet;

use crate::ecs::{Component, Entity};
use crate::foundation::math::{Mat4, Vec3};

/// Collision shape in model space
#[derive(Debug, Clone, PartialEq)]
pub enum ColliderShape {
    /// Box with half extents
    Box(Vec3),
    /// Sphere with radius
    Sphere(f32),
    /// Upright capsule
    Capsule {
        /// Capsule radius
        radius: f32,
        /// Cylinder height between the caps
        height: f32,
    },
}

impl ColliderShape {
    /// Serialized shape tag
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Box(_) => "box",
            Self::Sphere(_) => "sphere",
            Self::Capsule { .. } => "capsule",
        }
    }

    /// Radius of a sphere enclosing the shape
    pub fn bounding_radius(&self) -> f32 {
        match self {
            Self::Box(half_extents) => half_extents.magnitude(),
            Self::Sphere(radius) => *radius,
            Self::Capsule { radius, height } => radius + height * 0.5,
        }
    }
}

/// Component that marks an entity as having collision detection enabled
#[derive(Debug, Clone, PartialEq)]
pub struct ColliderComponent {
    /// The collision shape
    pub shape: ColliderShape,
    /// Mass handed to the physics backend, `0.0` for static geometry
    pub mass: f32,
    /// Is this a trigger volume (generates contacts but no response)?
    pub is_trigger: bool,
}

impl Component for ColliderComponent {}

impl ColliderComponent {
    /// Create a solid collider
    pub fn new(shape: ColliderShape, mass: f32) -> Self {
        Self {
            shape,
            mass,
            is_trigger: false,
        }
    }

    /// Mark this as a trigger volume
    pub fn as_trigger(mut self) -> Self {
        self.is_trigger = true;
        self
    }
}

/// Physics body handle as seen by the scene layer
///
/// The backend reads `world_transform` when it syncs; gameplay code that
/// teleports an entity must push the new transform through
/// `set_world_transform` so the body does not snap back.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBodyComponent {
    /// Body mass
    pub mass: f32,
    /// Last transform pushed to the physics backend
    pub world_transform: Mat4,
    /// Whether the body needs to be re-synced by the backend
    pub dirty: bool,
}

impl Component for RigidBodyComponent {}

impl Default for RigidBodyComponent {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl RigidBodyComponent {
    /// Create a body with the given mass at the origin
    pub fn new(mass: f32) -> Self {
        Self {
            mass,
            world_transform: Mat4::identity(),
            dirty: false,
        }
    }

    /// Overwrite the body's world transform
    pub fn set_world_transform(&mut self, transform: Mat4) {
        self.world_transform = transform;
        self.dirty = true;
    }
}

/// Component that tracks the current collision state of an entity
///
/// Updated each frame by the physics backend to reflect which entities are
/// currently overlapping this one.
#[derive(Debug, Default, Clone)]
pub struct CollisionStateComponent {
    /// All entities we're currently colliding with
    pub colliding_with: HashSet<Entity>,
    /// Entities we started colliding with this frame
    pub collision_entered: Vec<Entity>,
    /// Entities we stopped colliding with this frame
    pub collision_exited: Vec<Entity>,
}

impl Component for CollisionStateComponent {}

impl CollisionStateComponent {
    /// Check if we're currently colliding with any entity
    pub fn is_colliding(&self) -> bool {
        !self.colliding_with.is_empty()
    }

    /// Check if we're colliding with a specific entity
    pub fn is_colliding_with(&self, entity: Entity) -> bool {
        self.colliding_with.contains(&entity)
    }

    /// Record the start of a contact
    pub fn begin_contact(&mut self, entity: Entity) {
        if self.colliding_with.insert(entity) {
            self.collision_entered.push(entity);
        }
    }

    /// Record the end of a contact
    pub fn end_contact(&mut self, entity: Entity) {
        if self.colliding_with.remove(&entity) {
            self.collision_exited.push(entity);
        }
    }

    /// Clear per-frame data
    pub fn clear_frame_data(&mut self) {
        self.collision_entered.clear();
        self.collision_exited.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::World;
    use approx::assert_relative_eq;

    #[test]
    fn test_contacts_track_enter_and_exit() {
        let mut world = World::new();
        let other = world.create_entity();
        let mut state = CollisionStateComponent::default();

        state.begin_contact(other);
        state.begin_contact(other);
        assert_eq!(state.collision_entered, vec![other]);
        assert!(state.is_colliding_with(other));

        state.clear_frame_data();
        state.end_contact(other);
        assert!(!state.is_colliding());
        assert_eq!(state.collision_exited, vec![other]);
    }

    #[test]
    fn test_set_world_transform_marks_dirty() {
        let mut body = RigidBodyComponent::new(2.0);
        assert!(!body.dirty);
        body.set_world_transform(Mat4::new_translation(&Vec3::new(1.0, 0.0, 0.0)));
        assert!(body.dirty);
        assert_relative_eq!(body.world_transform.m14, 1.0);
    }

    #[test]
    fn test_capsule_bounding_radius() {
        let shape = ColliderShape::Capsule { radius: 0.5, height: 2.0 };
        assert_relative_eq!(shape.bounding_radius(), 1.5);
        assert_eq!(shape.kind(), "capsule");
    }
}
