//! ECS World implementation
//!
//! Entities live in a generational slot map; components live in one storage
//! per type. Deletion is deferred: `delete_entity` only queues the entity and
//! `maintain` destroys everything queued, so systems iterating this frame
//! never observe a half-destroyed entity.

use std::any::TypeId;
use std::collections::HashMap;

use slotmap::SlotMap;

use super::storage::{ComponentStorage, ComponentStore};
use super::{Component, Entity};

/// ECS World containing all entities and components
pub struct World {
    entities: SlotMap<Entity, ()>,
    storages: HashMap<TypeId, Box<dyn ComponentStore>>,
    pending_delete: Vec<Entity>,
    changed: Vec<Entity>,
    singleton: Entity,
}

impl World {
    /// Create a new world
    pub fn new() -> Self {
        let mut entities = SlotMap::with_key();
        let singleton = entities.insert(());
        Self {
            entities,
            storages: HashMap::new(),
            pending_delete: Vec::new(),
            changed: Vec::new(),
            singleton,
        }
    }

    /// Create a new entity
    pub fn create_entity(&mut self) -> Entity {
        self.entities.insert(())
    }

    /// The world-wide entity used for global marker components.
    ///
    /// It is never deleted.
    pub fn singleton(&self) -> Entity {
        self.singleton
    }

    /// Queue an entity for destruction at the next `maintain`.
    ///
    /// Returns `false` when the entity is already dead or already queued.
    pub fn delete_entity(&mut self, entity: Entity) -> bool {
        if entity == self.singleton || !self.is_alive(entity) {
            return false;
        }
        self.pending_delete.push(entity);
        true
    }

    /// Whether the entity exists and is not queued for deletion
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.contains_key(entity) && !self.pending_delete.contains(&entity)
    }

    /// Whether a deletion request for the entity is pending
    pub fn is_pending_delete(&self, entity: Entity) -> bool {
        self.pending_delete.contains(&entity)
    }

    /// Destroy every queued entity together with its components.
    ///
    /// Returns the number of entities destroyed.
    pub fn maintain(&mut self) -> usize {
        let pending = std::mem::take(&mut self.pending_delete);
        let mut destroyed = 0;
        for entity in pending {
            for storage in self.storages.values_mut() {
                storage.remove_entity(entity);
            }
            if self.entities.remove(entity).is_some() {
                destroyed += 1;
            }
        }
        self.changed.retain(|entity| self.entities.contains_key(*entity));
        destroyed
    }

    /// Add a component to an entity, returning the component it replaced
    pub fn add_component<T: Component>(&mut self, entity: Entity, component: T) -> Option<T> {
        if !self.entities.contains_key(entity) {
            log::warn!("add_component::<{}> on dead entity {:?}", std::any::type_name::<T>(), entity);
            return None;
        }
        self.storage_mut_or_insert::<T>().insert(entity, component)
    }

    /// Remove a component from an entity
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Option<T> {
        self.storage_mut::<T>()?.remove(entity)
    }

    /// Get a component from an entity
    pub fn get_component<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.storage::<T>()?.get(entity)
    }

    /// Get a mutable component from an entity
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.storage_mut::<T>()?.get_mut(entity)
    }

    /// Whether the entity carries a component of type `T`
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.storages
            .get(&TypeId::of::<T>())
            .is_some_and(|storage| storage.contains(entity))
    }

    /// Iterate over every entity carrying `T`
    pub fn query<T: Component>(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.storage::<T>().into_iter().flat_map(|storage| storage.iter())
    }

    /// Iterate mutably over every entity carrying `T`
    pub fn query_mut<T: Component>(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.storage_mut::<T>().into_iter().flat_map(|storage| storage.iter_mut())
    }

    /// Collect the entities carrying `T`, for loops that need to mutate the world
    pub fn entities_with<T: Component>(&self) -> Vec<Entity> {
        self.query::<T>().map(|(entity, _)| entity).collect()
    }

    /// Notify the world that an entity's component set changed
    pub fn refresh(&mut self, entity: Entity) {
        if self.entities.contains_key(entity) && !self.changed.contains(&entity) {
            self.changed.push(entity);
        }
    }

    /// Drain the entities refreshed since the last call
    pub fn take_changed(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.changed)
    }

    /// Number of live entities, including the singleton and pending deletions
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Get an iterator over all entities
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.keys()
    }

    fn storage<T: Component>(&self) -> Option<&ComponentStorage<T>> {
        self.storages
            .get(&TypeId::of::<T>())
            .and_then(|storage| storage.as_any().downcast_ref::<ComponentStorage<T>>())
    }

    fn storage_mut<T: Component>(&mut self) -> Option<&mut ComponentStorage<T>> {
        self.storages
            .get_mut(&TypeId::of::<T>())
            .and_then(|storage| storage.as_any_mut().downcast_mut::<ComponentStorage<T>>())
    }

    fn storage_mut_or_insert<T: Component>(&mut self) -> &mut ComponentStorage<T> {
        let storage = self
            .storages
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(ComponentStorage::<T>::new()));
        match storage.as_any_mut().downcast_mut::<ComponentStorage<T>>() {
            Some(storage) => storage,
            None => unreachable!("component storage registered under the wrong TypeId"),
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Health(i32);
    impl Component for Health {}

    #[derive(Debug, PartialEq)]
    struct Tag;
    impl Component for Tag {}

    #[test]
    fn test_add_get_remove_component() {
        let mut world = World::new();
        let entity = world.create_entity();

        assert!(world.add_component(entity, Health(10)).is_none());
        assert_eq!(world.add_component(entity, Health(5)), Some(Health(10)));
        assert_eq!(world.get_component::<Health>(entity), Some(&Health(5)));

        world.get_component_mut::<Health>(entity).expect("health").0 += 1;
        assert_eq!(world.remove_component::<Health>(entity), Some(Health(6)));
        assert!(!world.has_component::<Health>(entity));
    }

    #[test]
    fn test_deletion_is_deferred_until_maintain() {
        let mut world = World::new();
        let entity = world.create_entity();
        world.add_component(entity, Tag);

        assert!(world.delete_entity(entity));
        assert!(!world.delete_entity(entity), "second request must be rejected");
        assert!(!world.is_alive(entity));
        assert!(world.has_component::<Tag>(entity));

        assert_eq!(world.maintain(), 1);
        assert!(!world.has_component::<Tag>(entity));
        assert_eq!(world.maintain(), 0);
    }

    #[test]
    fn test_singleton_survives_delete_requests() {
        let mut world = World::new();
        let singleton = world.singleton();
        assert!(!world.delete_entity(singleton));
        world.maintain();
        assert!(world.is_alive(singleton));
    }

    #[test]
    fn test_query_visits_only_matching_entities() {
        let mut world = World::new();
        let a = world.create_entity();
        let b = world.create_entity();
        world.add_component(a, Health(1));
        world.add_component(b, Tag);

        let found: Vec<Entity> = world.query::<Health>().map(|(e, _)| e).collect();
        assert_eq!(found, vec![a]);
        assert_eq!(world.query::<Tag>().count(), 1);
    }

    #[test]
    fn test_refresh_is_deduplicated() {
        let mut world = World::new();
        let entity = world.create_entity();
        world.refresh(entity);
        world.refresh(entity);
        assert_eq!(world.take_changed(), vec![entity]);
        assert!(world.take_changed().is_empty());
    }
}
