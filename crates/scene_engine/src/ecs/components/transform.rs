//! Transform component for the ECS system
//!
//! A node's transform is stored twice: the local transform relative to its
//! parent (the authored value) and the cached world matrix produced by
//! `TransformSystem`. Roots have `world == local.to_matrix()`.

use crate::ecs::Component;
use crate::foundation::math::{utils, Mat4, Quat, Transform, Vec3};

/// ECS Transform component
#[derive(Debug, Clone, PartialEq)]
pub struct TransformComponent {
    /// Transform relative to the parent node
    pub local: Transform,
    /// Cached world matrix
    pub world: Mat4,
}

impl Component for TransformComponent {}

impl Default for TransformComponent {
    fn default() -> Self {
        Self::from_transform(Transform::identity())
    }
}

impl TransformComponent {
    /// Create identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create from a local transform; the world matrix starts equal to it
    pub fn from_transform(local: Transform) -> Self {
        let world = local.to_matrix();
        Self { local, world }
    }

    /// Create from position only
    pub fn from_position(position: Vec3) -> Self {
        Self::from_transform(Transform::from_position(position))
    }

    /// Builder pattern: Set rotation
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.local.rotation = rotation;
        self.world = self.local.to_matrix();
        self
    }

    /// Builder pattern: Set scale (non-uniform)
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.local.scale = scale;
        self.world = self.local.to_matrix();
        self
    }

    /// World-space position taken from the cached matrix
    pub fn world_position(&self) -> Vec3 {
        utils::translation_of(&self.world)
    }

    /// Recompute the world matrix from a parent's world matrix
    pub fn update_world(&mut self, parent_world: Option<&Mat4>) {
        let local = self.local.to_matrix();
        self.world = match parent_world {
            Some(parent) => parent * local,
            None => local,
        };
    }

    /// Overwrite the position in both local and world space.
    ///
    /// Only meaningful for roots, whose local space is world space.
    pub fn teleport(&mut self, position: Vec3) {
        self.local.position = position;
        utils::set_translation(&mut self.world, &position);
    }
}
