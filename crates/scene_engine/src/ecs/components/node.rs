//! Scene-graph node component
//!
//! Every entity that takes part in the scene hierarchy carries a
//! `NodeComponent`. Links are plain entity handles: the parent link never
//! owns, and `children` keeps insertion order, which is also the order in
//! which a subtree is saved.

use crate::ecs::{Component, Entity};

use super::flags::{EngineFlags, GameFlags};

/// Tree node wrapping an entity
#[derive(Debug, Clone)]
pub struct NodeComponent {
    /// The entity this node describes
    pub entity: Entity,
    /// Display name, used for lookups such as `find_root`
    pub name: String,
    /// Engine capabilities
    pub engine_flags: EngineFlags,
    /// Gameplay capabilities
    pub game_flags: GameFlags,
    /// Parent node, `None` for roots
    pub parent: Option<Entity>,
    /// Children in insertion order
    pub children: Vec<Entity>,
    /// Whether the node moves at runtime
    pub is_dynamic: bool,
    /// Whether the node has ever had children attached
    pub is_parent: bool,
    /// Set once deletion has been requested
    pub needs_delete: bool,
}

impl Component for NodeComponent {}

impl NodeComponent {
    /// Create a root node
    pub fn root(entity: Entity, name: impl Into<String>) -> Self {
        Self {
            entity,
            name: name.into(),
            engine_flags: EngineFlags::empty(),
            game_flags: GameFlags::empty(),
            parent: None,
            children: Vec::new(),
            is_dynamic: false,
            is_parent: false,
            needs_delete: false,
        }
    }

    /// Create a node attached below `parent`
    pub fn child(entity: Entity, name: impl Into<String>, parent: Entity) -> Self {
        Self {
            parent: Some(parent),
            ..Self::root(entity, name)
        }
    }

    /// Builder: set the engine flags
    pub fn with_engine_flags(mut self, flags: EngineFlags) -> Self {
        self.engine_flags = flags;
        self
    }

    /// Builder: set the game flags
    pub fn with_game_flags(mut self, flags: GameFlags) -> Self {
        self.game_flags = flags;
        self
    }

    /// Whether this node is a root
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Append a child, keeping insertion order
    pub fn push_child(&mut self, child: Entity) {
        if !self.children.contains(&child) {
            self.children.push(child);
            self.is_parent = true;
        }
    }

    /// Remove a child link; returns whether it was present
    pub fn remove_child(&mut self, child: Entity) -> bool {
        let before = self.children.len();
        self.children.retain(|&c| c != child);
        before != self.children.len()
    }
}
