//! Lighting component for ECS
//!
//! Position and direction come from the node's transform.

use crate::ecs::Component;
use crate::foundation::math::Vec3;

/// Point light data
#[derive(Debug, Clone, PartialEq)]
pub struct LightComponent {
    /// RGB color values for the light (0.0 to 1.0 range)
    pub color: Vec3,
    /// Light intensity multiplier
    pub intensity: f32,
}

impl Component for LightComponent {}

impl Default for LightComponent {
    fn default() -> Self {
        Self::new(Vec3::new(1.0, 1.0, 1.0), 1.0)
    }
}

impl LightComponent {
    /// Create a light
    pub fn new(color: Vec3, intensity: f32) -> Self {
        Self { color, intensity }
    }
}
