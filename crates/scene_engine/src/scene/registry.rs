//! Scene registry
//!
//! Owns the ECS world and the ordered list of scene roots. Every structural
//! change to the scene graph goes through here so the root list, the node
//! links and the renderer stay consistent.
//!
//! ## Loading
//!
//! Loads happen in two halves. `read_scene` parses a file into a
//! `SceneDocument` without touching the world; `append_scene` and
//! `replace_scene` then install it and cannot fail. A broken file therefore
//! never leaves a half-torn-down scene behind.

use std::path::{Path, PathBuf};

use crate::core::config::SceneConfig;
use crate::ecs::components::{
    CameraComponent, CharacterComponent, EngineFlags, GameFlags, GuiComponent, LightComponent,
    NodeComponent, RigidBodyComponent, TransformComponent,
};
use crate::ecs::systems::TransformSystem;
use crate::ecs::{Component, Entity, World};
use crate::foundation::math::{Transform, Vec3};
use crate::render::{NullRenderer, RenderNotifier};

use super::document::XmlElement;
use super::error::{HierarchyError, SceneError};
use super::serializer::{read_document, write_document, Attributes, NodeRecord, NodeSerializer};

/// File extension of scene documents
pub const SCENE_EXTENSION: &str = "xml";

/// A parsed scene file, ready to be installed
#[derive(Debug, Clone, PartialEq)]
pub struct SceneDocument {
    /// Scene name (file stem)
    pub name: String,
    /// File the scene was read from
    pub path: PathBuf,
    /// Value of `<Scene Num>`
    pub scene_number: i32,
    /// Root subtrees in file order
    pub roots: Vec<NodeRecord>,
}

/// The forest of scene roots and the world that backs it
pub struct SceneRegistry {
    world: World,
    parents: Vec<Entity>,
    current_scene: String,
    scene_number: i32,
    dir: PathBuf,
    serializer: NodeSerializer,
    renderer: Box<dyn RenderNotifier>,
}

impl SceneRegistry {
    /// Registry reading scenes from `scene_dir` and prefabs from `prefab_dir`
    pub fn new(scene_dir: impl Into<PathBuf>, prefab_dir: impl Into<PathBuf>) -> Self {
        Self {
            world: World::new(),
            parents: Vec::new(),
            current_scene: String::new(),
            scene_number: 0,
            dir: scene_dir.into(),
            serializer: NodeSerializer::new(prefab_dir),
            renderer: Box::new(NullRenderer),
        }
    }

    /// Registry configured from a `SceneConfig`
    pub fn from_config(config: &SceneConfig) -> Self {
        Self::new(&config.scene_directory, &config.prefab_directory)
    }

    /// Replace the renderer notified of root-list changes
    pub fn set_renderer(&mut self, renderer: Box<dyn RenderNotifier>) {
        self.renderer = renderer;
    }

    /// Point the registry at a level directory containing `Scenes/` and `Prefabs/`
    pub fn set_directory(&mut self, level_dir: impl AsRef<Path>) {
        let level_dir = level_dir.as_ref();
        self.dir = level_dir.join("Scenes");
        self.serializer.set_prefab_dir(level_dir.join("Prefabs"));
        log::info!("Scene directory set to {}", level_dir.display());
    }

    /// Directory scene files are read from
    pub fn scene_dir(&self) -> &Path {
        &self.dir
    }

    /// The serializer (and its prefab directory)
    pub fn serializer(&self) -> &NodeSerializer {
        &self.serializer
    }

    /// The ECS world
    pub fn world(&self) -> &World {
        &self.world
    }

    /// The ECS world, mutably
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Scene roots in order
    pub fn parents(&self) -> &[Entity] {
        &self.parents
    }

    /// Name of the active scene, empty before the first load
    pub fn current_scene(&self) -> &str {
        &self.current_scene
    }

    /// `<Scene Num>` of the active scene
    pub fn scene_number(&self) -> i32 {
        self.scene_number
    }

    /// Node attached to `entity`
    pub fn node(&self, entity: Entity) -> Option<&NodeComponent> {
        self.world.get_component::<NodeComponent>(entity)
    }

    /// Display name of `entity`'s node
    pub fn node_name(&self, entity: Entity) -> Option<&str> {
        self.node(entity).map(|node| node.name.as_str())
    }

    /// First root with the given name
    pub fn find_root(&self, name: &str) -> Option<Entity> {
        self.parents
            .iter()
            .copied()
            .find(|&root| self.node_name(root) == Some(name))
    }

    /// First root carrying component `T`
    pub fn find_root_with<T: Component>(&self) -> Option<Entity> {
        self.parents
            .iter()
            .copied()
            .find(|&root| self.world.has_component::<T>(root))
    }

    /// Every node with a transform, in depth-first scene order
    pub fn transforms(&self) -> Vec<Entity> {
        let mut out = Vec::new();
        let mut stack: Vec<Entity> = self.parents.iter().rev().copied().collect();
        while let Some(entity) = stack.pop() {
            if self.world.has_component::<TransformComponent>(entity) {
                out.push(entity);
            }
            if let Some(node) = self.node(entity) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    // ----------------------------------------------------------------------
    // Creation
    // ----------------------------------------------------------------------

    /// Create a root with only a transform
    pub fn create_empty_object(&mut self, name: &str) -> Entity {
        self.create_root(name, EngineFlags::TRANSFORM, Transform::identity())
    }

    /// Create a light root at `position`
    pub fn create_light(&mut self, name: &str, light: LightComponent, position: Vec3) -> Entity {
        let entity = self.create_root(
            name,
            EngineFlags::TRANSFORM | EngineFlags::LIGHT,
            Transform::from_position(position),
        );
        self.world.add_component(entity, light);
        entity
    }

    /// Create a camera root at `position`
    pub fn create_camera(&mut self, name: &str, camera: CameraComponent, position: Vec3) -> Entity {
        let entity = self.create_root(
            name,
            EngineFlags::TRANSFORM | EngineFlags::CAMERA,
            Transform::from_position(position),
        );
        self.world.add_component(entity, camera);
        entity
    }

    fn create_root(&mut self, name: &str, flags: EngineFlags, local: Transform) -> Entity {
        let entity = self.world.create_entity();
        self.world
            .add_component(entity, NodeComponent::root(entity, name).with_engine_flags(flags));
        self.world.add_component(entity, TransformComponent::from_transform(local));
        self.world.refresh(entity);
        self.parents.push(entity);
        log::debug!("Created root {:?} '{}'", entity, name);
        self.notify_renderer();
        entity
    }

    /// Register an externally created entity as a scene root.
    ///
    /// A node is created for it when it has none. Returns `false` when the
    /// entity is dead or already part of the hierarchy.
    pub fn add_entity_to_scene(&mut self, entity: Entity) -> bool {
        if !self.world.is_alive(entity) || self.parents.contains(&entity) {
            return false;
        }
        match self.world.get_component::<NodeComponent>(entity).map(|node| node.parent) {
            Some(Some(_)) => return false,
            Some(None) => {}
            None => {
                let mut flags = EngineFlags::empty();
                flags.set(EngineFlags::TRANSFORM, self.world.has_component::<TransformComponent>(entity));
                flags.set(EngineFlags::LIGHT, self.world.has_component::<LightComponent>(entity));
                flags.set(EngineFlags::CAMERA, self.world.has_component::<CameraComponent>(entity));
                flags.set(EngineFlags::GUI, self.world.has_component::<GuiComponent>(entity));
                let node = NodeComponent::root(entity, format!("Entity{}", entity.id())).with_engine_flags(flags);
                self.world.add_component(entity, node);
            }
        }
        self.world.refresh(entity);
        self.parents.push(entity);
        self.notify_renderer();
        true
    }

    /// Flag a node as player-controlled
    pub fn insert_controller(&mut self, entity: Entity) -> Result<(), HierarchyError> {
        let node = self.node_mut(entity)?;
        node.game_flags |= GameFlags::CONTROLLER;
        self.world.refresh(entity);
        Ok(())
    }

    /// Give a node a rigid body synced to its current world transform
    pub fn insert_rigid_body(&mut self, entity: Entity, mass: f32) -> Result<(), HierarchyError> {
        self.node_mut(entity)?.engine_flags |= EngineFlags::RIGIDBODY;
        let mut body = RigidBodyComponent::new(mass);
        if let Some(transform) = self.world.get_component::<TransformComponent>(entity) {
            body.world_transform = transform.world;
        }
        self.world.add_component(entity, body);
        self.world.refresh(entity);
        Ok(())
    }

    /// Move a root to `position`, updating the world matrices below it and
    /// the physics body
    pub fn teleport(&mut self, entity: Entity, position: Vec3) {
        if let Some(transform) = self.world.get_component_mut::<TransformComponent>(entity) {
            transform.teleport(position);
        }
        let parent_world = TransformSystem::parent_world(&self.world, entity);
        TransformSystem::propagate(&mut self.world, entity, parent_world);
        let world_matrix = self
            .world
            .get_component::<TransformComponent>(entity)
            .map(|transform| transform.world);
        if let (Some(matrix), Some(body)) = (
            world_matrix,
            self.world.get_component_mut::<RigidBodyComponent>(entity),
        ) {
            body.set_world_transform(matrix);
        }
    }

    /// Change a node's display name
    pub fn rename(&mut self, entity: Entity, name: impl Into<String>) -> Result<(), HierarchyError> {
        self.node_mut(entity)?.name = name.into();
        Ok(())
    }

    /// Drain the world's refresh notifications, telling the renderer when
    /// anything changed. Returns the number of refreshed entities.
    pub fn flush_changes(&mut self) -> usize {
        let changed = self.world.take_changed();
        if !changed.is_empty() {
            self.notify_renderer();
        }
        changed.len()
    }

    // ----------------------------------------------------------------------
    // Hierarchy
    // ----------------------------------------------------------------------

    /// Detach `child` from its parent and make it a root without moving it
    pub fn make_parent(&mut self, child: Entity) -> Result<(), HierarchyError> {
        let old_parent = self.live_node(child)?.parent;
        let Some(old_parent) = old_parent else {
            if !self.parents.contains(&child) {
                self.parents.push(child);
            }
            return Ok(());
        };

        if let Some(parent_node) = self.world.get_component_mut::<NodeComponent>(old_parent) {
            parent_node.remove_child(child);
        }

        let inherited_world = TransformSystem::parent_world(&self.world, child);
        match self.world.get_component_mut::<TransformComponent>(child) {
            Some(transform) => {
                transform.local = Transform::from_matrix(transform.world);
            }
            None => {
                let mut transform = self
                    .world
                    .get_component::<TransformComponent>(old_parent)
                    .cloned()
                    .unwrap_or_default();
                if let Some(world_matrix) = inherited_world {
                    transform.world = world_matrix;
                }
                transform.local = Transform::from_matrix(transform.world);
                self.world.add_component(child, transform);
            }
        }

        let node = self.node_mut(child)?;
        node.parent = None;
        node.engine_flags |= EngineFlags::TRANSFORM;
        self.parents.push(child);
        TransformSystem::propagate(&mut self.world, child, None);
        self.world.refresh(child);
        log::debug!("Node {:?} detached from {:?}", child, old_parent);
        self.notify_renderer();
        Ok(())
    }

    /// Attach `child` below `parent`, keeping its world transform
    pub fn make_child(&mut self, child: Entity, parent: Entity) -> Result<(), HierarchyError> {
        let old_parent = self.live_node(child)?.parent;
        self.live_node(parent)?;
        if child == parent || self.is_ancestor(child, parent) {
            return Err(HierarchyError::Cycle { child, parent });
        }

        match old_parent {
            Some(old) => {
                if let Some(old_node) = self.world.get_component_mut::<NodeComponent>(old) {
                    old_node.remove_child(child);
                }
            }
            None => self.parents.retain(|&root| root != child),
        }

        let parent_world = self
            .world
            .get_component::<TransformComponent>(parent)
            .map(|transform| transform.world)
            .or_else(|| TransformSystem::parent_world(&self.world, parent));

        match self.world.get_component_mut::<TransformComponent>(child) {
            Some(transform) => {
                transform.local = match &parent_world {
                    Some(parent_world) => Transform::relative_to(parent_world, &transform.world)
                        .unwrap_or_else(|| {
                            log::warn!("Parent {:?} has a singular transform", parent);
                            Transform::from_matrix(transform.world)
                        }),
                    None => Transform::from_matrix(transform.world),
                };
            }
            None => {
                let copied = self
                    .world
                    .get_component::<TransformComponent>(parent)
                    .cloned()
                    .unwrap_or_default();
                self.world.add_component(child, copied);
            }
        }

        let node = self.node_mut(child)?;
        node.parent = Some(parent);
        node.engine_flags |= EngineFlags::TRANSFORM;
        self.node_mut(parent)?.push_child(child);

        TransformSystem::propagate(&mut self.world, child, parent_world);
        self.world.refresh(child);
        log::debug!("Node {:?} attached to {:?}", child, parent);
        self.notify_renderer();
        Ok(())
    }

    /// Deep-copy a subtree below `parent`, or as a new root
    pub fn copy_node(&mut self, node: Entity, parent: Option<Entity>) -> Result<Entity, HierarchyError> {
        self.live_node(node)?;
        if let Some(parent) = parent {
            self.live_node(parent)?;
        }
        let mut record = NodeSerializer::capture(&self.world, node).ok_or(HierarchyError::NotANode(node))?;
        record.inherited = false;
        let copy = NodeSerializer::instantiate(&mut self.world, &record, parent);
        if parent.is_none() {
            self.parents.push(copy);
        }
        self.notify_renderer();
        Ok(copy)
    }

    fn is_ancestor(&self, ancestor: Entity, mut entity: Entity) -> bool {
        while let Some(parent) = self.node(entity).and_then(|node| node.parent) {
            if parent == ancestor {
                return true;
            }
            entity = parent;
        }
        false
    }

    fn live_node(&self, entity: Entity) -> Result<&NodeComponent, HierarchyError> {
        let node = self.node(entity).ok_or(HierarchyError::NotANode(entity))?;
        if node.needs_delete || !self.world.is_alive(entity) {
            return Err(HierarchyError::Deleted(entity));
        }
        Ok(node)
    }

    fn node_mut(&mut self, entity: Entity) -> Result<&mut NodeComponent, HierarchyError> {
        self.world
            .get_component_mut::<NodeComponent>(entity)
            .ok_or(HierarchyError::NotANode(entity))
    }

    // ----------------------------------------------------------------------
    // Deletion
    // ----------------------------------------------------------------------

    /// Delete a node and its whole subtree.
    ///
    /// Descendants are deleted before their parents. The node is removed
    /// from the root list or from its parent's children right away; the
    /// entities themselves are destroyed at the next `World::maintain`.
    /// Returns `false` if the node was already being deleted.
    pub fn delete_node(&mut self, entity: Entity) -> bool {
        let Some(node) = self.node(entity) else {
            return self.world.delete_entity(entity);
        };
        if node.needs_delete {
            return false;
        }
        let parent = node.parent;

        for doomed in self.post_order(entity) {
            if let Some(node) = self.world.get_component_mut::<NodeComponent>(doomed) {
                node.needs_delete = true;
            }
            self.world.delete_entity(doomed);
        }

        match parent {
            Some(parent) => {
                if let Some(parent_node) = self.world.get_component_mut::<NodeComponent>(parent) {
                    parent_node.remove_child(entity);
                }
            }
            None => self.parents.retain(|&root| root != entity),
        }

        log::debug!("Deleted node {:?}", entity);
        self.notify_renderer();
        true
    }

    fn post_order(&self, entity: Entity) -> Vec<Entity> {
        let mut order = Vec::new();
        let mut stack = vec![(entity, false)];
        while let Some((current, expanded)) = stack.pop() {
            if expanded {
                order.push(current);
                continue;
            }
            stack.push((current, true));
            if let Some(node) = self.node(current) {
                stack.extend(node.children.iter().rev().map(|&child| (child, false)));
            }
        }
        order
    }

    /// Delete every root and its subtree
    pub fn delete_scene(&mut self) {
        let roots = std::mem::take(&mut self.parents);
        let count = roots.len();
        for root in roots {
            self.delete_node(root);
        }
        if count > 0 {
            log::info!("Deleted scene '{}' ({} roots)", self.current_scene, count);
        }
        self.notify_renderer();
    }

    /// Delete every root that is not a character.
    ///
    /// # Panics
    ///
    /// Exactly one root must survive and it must be named `player_name`.
    pub fn delete_scene_except_player(&mut self, player_name: &str) {
        self.retain_roots_with::<CharacterComponent>();
        assert!(
            self.parents.len() == 1 && self.node_name(self.parents[0]) == Some(player_name),
            "expected only '{}' to survive, found {:?}",
            player_name,
            self.parents
                .iter()
                .map(|&root| self.node_name(root).unwrap_or("<no node>"))
                .collect::<Vec<_>>()
        );
    }

    /// Delete every root that is not a UI element
    pub fn delete_scene_except_ui(&mut self) {
        self.retain_roots_with::<GuiComponent>();
    }

    fn retain_roots_with<T: Component>(&mut self) {
        let doomed: Vec<Entity> = self
            .parents
            .iter()
            .copied()
            .filter(|&root| !self.world.has_component::<T>(root))
            .collect();
        for root in doomed {
            self.delete_node(root);
        }
    }

    // ----------------------------------------------------------------------
    // Loading and saving
    // ----------------------------------------------------------------------

    /// Path of the scene file called `name`
    pub fn scene_path(&self, name: &str) -> PathBuf {
        let path = self.dir.join(name);
        if path.extension().is_some() {
            path
        } else {
            path.with_extension(SCENE_EXTENSION)
        }
    }

    /// Parse a scene file without touching the world
    pub fn read_scene(&self, name: &str) -> Result<SceneDocument, SceneError> {
        self.read_scene_file(&self.scene_path(name))
    }

    /// Parse a scene file by path without touching the world
    pub fn read_scene_file(&self, path: &Path) -> Result<SceneDocument, SceneError> {
        Self::parse_scene(&self.serializer, path)
    }

    /// Parse a scene file belonging to another level directory.
    ///
    /// Prefabs resolve against `<level_dir>/Prefabs`; the registry's own
    /// directories are not changed.
    pub fn read_level_scene_file(&self, level_dir: impl AsRef<Path>, path: &Path) -> Result<SceneDocument, SceneError> {
        let serializer = NodeSerializer::new(level_dir.as_ref().join("Prefabs"));
        Self::parse_scene(&serializer, path)
    }

    fn parse_scene(serializer: &NodeSerializer, path: &Path) -> Result<SceneDocument, SceneError> {
        let root = read_document(path)?;
        if root.name != "Root" {
            return Err(SceneError::UnexpectedRoot {
                path: path.to_path_buf(),
                expected: "Root".to_string(),
                found: root.name,
            });
        }

        let scene = root.child("Scene").ok_or_else(|| SceneError::MissingElement {
            path: path.to_path_buf(),
            element: "Scene".to_string(),
        })?;
        let scene_number = Attributes::new(scene, path).parse("Num")?;

        let roots = root
            .children_named("Node")
            .map(|element| serializer.load_node(element, path))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SceneDocument {
            name: path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: path.to_path_buf(),
            scene_number,
            roots,
        })
    }

    /// Install a parsed scene next to the current roots
    pub fn append_scene(&mut self, document: &SceneDocument) -> Vec<Entity> {
        let roots: Vec<Entity> = document
            .roots
            .iter()
            .map(|record| NodeSerializer::instantiate(&mut self.world, record, None))
            .collect();
        self.parents.extend(roots.iter().copied());
        self.scene_number = document.scene_number;
        log::info!(
            "Loaded scene '{}' #{} ({} roots)",
            document.name,
            document.scene_number,
            roots.len()
        );
        self.notify_renderer();
        roots
    }

    /// Tear down the current scene and install a parsed one
    pub fn replace_scene(&mut self, document: &SceneDocument) -> Vec<Entity> {
        self.delete_scene();
        self.current_scene = document.name.clone();
        self.append_scene(document)
    }

    /// Replace the current scene with `<dir>/<name>.xml`.
    ///
    /// On error the current scene is left untouched.
    pub fn load_scene(&mut self, name: &str) -> Result<Vec<Entity>, SceneError> {
        let document = self.read_scene(name)?;
        Ok(self.replace_scene(&document))
    }

    /// Add the roots of `<dir>/<name>.xml` to the current scene
    pub fn load_new_scene(&mut self, name: &str) -> Result<Vec<Entity>, SceneError> {
        let document = self.read_scene(name)?;
        Ok(self.append_scene(&document))
    }

    /// Write every root back to the active scene file
    pub fn save_scene(&mut self) -> Result<PathBuf, SceneError> {
        if self.current_scene.is_empty() {
            return Err(SceneError::NoActiveScene);
        }
        let path = self.scene_path(&self.current_scene);

        for &root in &self.parents {
            if let Some(node) = self.world.get_component_mut::<NodeComponent>(root) {
                node.engine_flags |= EngineFlags::HEADNODE;
            }
        }

        let mut document = XmlElement::new("Root")
            .with_child(XmlElement::new("Scene").with_attr("Num", self.scene_number));
        document.children.extend(
            self.parents
                .iter()
                .filter_map(|&root| NodeSerializer::save_node(&self.world, root)),
        );
        write_document(&path, &document)?;
        log::info!("Saved scene '{}' to {}", self.current_scene, path.display());
        Ok(path)
    }

    /// Save under a new name and make it the active scene
    pub fn save_scene_as(&mut self, name: &str) -> Result<PathBuf, SceneError> {
        self.current_scene = name.to_string();
        self.save_scene()
    }

    /// Instantiate a prefab as a new root
    pub fn load_prefab(&mut self, reference: &str) -> Result<Entity, SceneError> {
        let record = self.serializer.read_prefab(reference)?;
        let entity = NodeSerializer::instantiate(&mut self.world, &record, None);
        self.parents.push(entity);
        log::debug!("Loaded prefab '{}' as {:?}", reference, entity);
        self.notify_renderer();
        Ok(entity)
    }

    /// Load a prefab's components and children onto an existing node
    pub fn attach_prefab_to_entity(&mut self, reference: &str, entity: Entity) -> Result<(), SceneError> {
        let record = self.serializer.read_prefab(reference)?;
        if self.world.get_component::<NodeComponent>(entity).is_none() {
            self.world.add_component(entity, NodeComponent::root(entity, record.name.clone()));
            if !self.parents.contains(&entity) {
                self.parents.push(entity);
            }
        }
        NodeSerializer::apply(&mut self.world, entity, &record);
        for child in &record.children {
            NodeSerializer::instantiate(&mut self.world, child, Some(entity));
        }
        self.notify_renderer();
        Ok(())
    }

    // ----------------------------------------------------------------------
    // Integrity
    // ----------------------------------------------------------------------

    /// Check that every node is reachable exactly once from the root list
    /// and that parent links agree with child lists
    pub fn verify_hierarchy(&self) -> Result<(), HierarchyError> {
        let mut seen = std::collections::HashSet::new();
        let mut stack = Vec::new();

        for &root in &self.parents {
            let node = self.node(root).ok_or(HierarchyError::NotANode(root))?;
            if !self.world.is_alive(root) || node.needs_delete {
                return Err(HierarchyError::DeadRoot(root));
            }
            if node.parent.is_some() {
                return Err(HierarchyError::RootHasParent(root));
            }
            stack.push(root);
        }

        while let Some(entity) = stack.pop() {
            if !seen.insert(entity) {
                return Err(HierarchyError::Aliased(entity));
            }
            let node = self.node(entity).ok_or(HierarchyError::NotANode(entity))?;
            for &child in &node.children {
                let child_node = self.node(child).ok_or(HierarchyError::NotANode(child))?;
                if child_node.parent != Some(entity) {
                    return Err(HierarchyError::BrokenLink {
                        child,
                        listed_under: entity,
                        parent: child_node.parent,
                    });
                }
                stack.push(child);
            }
        }

        for (entity, node) in self.world.query::<NodeComponent>() {
            if !node.needs_delete && self.world.is_alive(entity) && !seen.contains(&entity) {
                return Err(HierarchyError::Orphan(entity));
            }
        }
        Ok(())
    }

    fn notify_renderer(&mut self) {
        self.renderer.update_object_memory(self.parents.len());
    }
}
