//! Component Storage
//!
//! One `ComponentStorage<T>` per component type, keyed by entity. The world
//! keeps them type-erased behind `ComponentStore` so it can purge every
//! component of a destroyed entity without knowing the concrete types.

use std::any::Any;

use slotmap::SecondaryMap;

use crate::ecs::{Component, Entity};

/// Type-erased view of a component storage
pub trait ComponentStore: Send + Sync {
    /// Drop the component belonging to `entity`, if any
    fn remove_entity(&mut self, entity: Entity);

    /// Whether `entity` has a component in this storage
    fn contains(&self, entity: Entity) -> bool;

    /// Number of stored components
    fn len(&self) -> usize;

    /// Whether the storage is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Downcast support
    fn as_any(&self) -> &dyn Any;

    /// Mutable downcast support
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Dense-by-entity storage for a single component type
pub struct ComponentStorage<T: Component> {
    components: SecondaryMap<Entity, T>,
}

impl<T: Component> Default for ComponentStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> ComponentStorage<T> {
    /// Create an empty storage
    pub fn new() -> Self {
        Self {
            components: SecondaryMap::new(),
        }
    }

    /// Insert a component, returning the one it replaced.
    ///
    /// Inserting for a stale entity handle is a no-op.
    pub fn insert(&mut self, entity: Entity, component: T) -> Option<T> {
        self.components.insert(entity, component)
    }

    /// Remove a component
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        self.components.remove(entity)
    }

    /// Get a component
    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.components.get(entity)
    }

    /// Get a component mutably
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.components.get_mut(entity)
    }

    /// Iterate over `(entity, component)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.components.iter()
    }

    /// Iterate mutably over `(entity, component)` pairs
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.components.iter_mut()
    }
}

impl<T: Component> ComponentStore for ComponentStorage<T> {
    fn remove_entity(&mut self, entity: Entity) {
        self.components.remove(entity);
    }

    fn contains(&self, entity: Entity) -> bool {
        self.components.contains_key(entity)
    }

    fn len(&self) -> usize {
        self.components.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
