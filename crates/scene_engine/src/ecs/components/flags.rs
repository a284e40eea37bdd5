//! Capability flags carried by every scene node
//!
//! The engine flags describe which engine components a node owns, the game
//! flags which gameplay components. Both serialize as `|`-separated lowercase
//! names, e.g. `transform|material|headnode`.

use bitflags::bitflags;

bitflags! {
    /// Engine-side capabilities of a node
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EngineFlags: u32 {
        /// Owns a `TransformComponent`
        const TRANSFORM = 1 << 0;
        /// Owns a `MeshComponent`
        const MESH = 1 << 1;
        /// Owns a `MaterialComponent`
        const MATERIAL = 1 << 2;
        /// Owns a `PrimitiveComponent`
        const PRIMITIVE = 1 << 3;
        /// Owns an axis-aligned bounding box
        const AABB = 1 << 4;
        /// Owns a `RigidBodyComponent`
        const RIGIDBODY = 1 << 5;
        /// Owns a `ColliderComponent`
        const COLLIDER = 1 << 6;
        /// Owns a `LightComponent`
        const LIGHT = 1 << 7;
        /// Owns a `CameraComponent`
        const CAMERA = 1 << 8;
        /// Owns a `GuiComponent`
        const GUI = 1 << 9;
        /// Root of a persisted subtree
        const HEADNODE = 1 << 10;
    }
}

bitflags! {
    /// Gameplay-side capabilities of a node
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct GameFlags: u32 {
        /// Driven by player input
        const CONTROLLER = 1 << 0;
        /// Owns a movement component
        const MOVEMENT = 1 << 1;
    }
}

const ENGINE_NAMES: &[(&str, EngineFlags)] = &[
    ("transform", EngineFlags::TRANSFORM),
    ("mesh", EngineFlags::MESH),
    ("material", EngineFlags::MATERIAL),
    ("primitive", EngineFlags::PRIMITIVE),
    ("aabb", EngineFlags::AABB),
    ("rigidbody", EngineFlags::RIGIDBODY),
    ("collider", EngineFlags::COLLIDER),
    ("light", EngineFlags::LIGHT),
    ("camera", EngineFlags::CAMERA),
    ("gui", EngineFlags::GUI),
    ("headnode", EngineFlags::HEADNODE),
];

const GAME_NAMES: &[(&str, GameFlags)] = &[
    ("controller", GameFlags::CONTROLLER),
    ("movement", GameFlags::MOVEMENT),
];

fn format_names<F: Copy>(names: &[(&str, F)], contains: impl Fn(F) -> bool) -> String {
    names
        .iter()
        .filter(|(_, flag)| contains(*flag))
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join("|")
}

fn parse_names<F: Copy>(text: &str, names: &[(&str, F)]) -> Result<Vec<F>, String> {
    text.split('|')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            names
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(token))
                .map(|(_, flag)| *flag)
                .ok_or_else(|| token.to_string())
        })
        .collect()
}

impl EngineFlags {
    /// Serialized form
    pub fn to_names(self) -> String {
        format_names(ENGINE_NAMES, |flag| self.contains(flag))
    }

    /// Parse the serialized form; the error carries the unknown token
    pub fn from_names(text: &str) -> Result<Self, String> {
        Ok(parse_names(text, ENGINE_NAMES)?
            .into_iter()
            .fold(Self::empty(), |acc, flag| acc | flag))
    }
}

impl GameFlags {
    /// Serialized form
    pub fn to_names(self) -> String {
        format_names(GAME_NAMES, |flag| self.contains(flag))
    }

    /// Parse the serialized form; the error carries the unknown token
    pub fn from_names(text: &str) -> Result<Self, String> {
        Ok(parse_names(text, GAME_NAMES)?
            .into_iter()
            .fold(Self::empty(), |acc, flag| acc | flag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_flag_names() {
        let flags = EngineFlags::TRANSFORM | EngineFlags::MATERIAL | EngineFlags::HEADNODE;
        assert_eq!(flags.to_names(), "transform|material|headnode");
        assert_eq!(EngineFlags::from_names("transform | MATERIAL|headnode"), Ok(flags));
        assert_eq!(EngineFlags::from_names(""), Ok(EngineFlags::empty()));
    }

    #[test]
    fn test_unknown_flag_is_reported() {
        assert_eq!(GameFlags::from_names("controller|jetpack"), Err("jetpack".to_string()));
    }
}
