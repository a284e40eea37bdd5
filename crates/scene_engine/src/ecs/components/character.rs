//! Marker components the scene registry filters on

use crate::ecs::Component;

/// Marks the player character.
///
/// `delete_scene_except_player` keeps exactly the roots carrying this.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CharacterComponent {
    /// Movement speed in units per second
    pub speed: f32,
}

impl Component for CharacterComponent {}

impl CharacterComponent {
    /// Create a character moving at `speed`
    pub fn new(speed: f32) -> Self {
        Self { speed }
    }
}

/// Marks an on-screen UI element; survives `delete_scene_except_ui`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuiComponent {
    /// Draw order, higher draws later
    pub layer: u8,
}

impl Component for GuiComponent {}
