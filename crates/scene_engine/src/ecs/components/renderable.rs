//! Render payload components
//!
//! The renderer owns meshes, materials and built-in primitives; the scene
//! only stores the ids it needs to reference them.

use crate::ecs::Component;

/// Reference to a loaded model and the mesh inside it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshComponent {
    /// Model id in the renderer's model table
    pub model: u32,
    /// Mesh index inside the model
    pub index: u32,
}

impl Component for MeshComponent {}

/// Material id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialComponent {
    /// Material id in the renderer's material table
    pub id: i32,
}

impl Component for MaterialComponent {}

/// Built-in primitive id (negative ids are engine primitives)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimitiveComponent {
    /// Primitive id
    pub id: i32,
}

impl Component for PrimitiveComponent {}

/// Camera parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraComponent {
    /// Aspect ratio (width / height)
    pub aspect: f32,
    /// Vertical field of view in degrees
    pub fov: f32,
}

impl Component for CameraComponent {}

impl Default for CameraComponent {
    fn default() -> Self {
        Self {
            aspect: 16.0 / 10.0,
            fov: 60.0,
        }
    }
}
