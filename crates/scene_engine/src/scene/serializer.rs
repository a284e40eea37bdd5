//! Node serializer
//!
//! Converts between node subtrees in the world and their document form.
//! Loading is split in two: `load_node` turns elements into plain
//! `NodeRecord` data (this is where every error surfaces) and `instantiate`
//! turns records into entities (this cannot fail). Callers can therefore
//! validate a whole file before touching the world.

use std::path::{Path, PathBuf};

use crate::ecs::components::{
    CameraComponent, ColliderComponent, ColliderShape, EngineFlags, GameFlags, LightComponent,
    MaterialComponent, MeshComponent, NodeComponent, PrimitiveComponent, RigidBodyComponent,
    TransformComponent,
};
use crate::ecs::systems::TransformSystem;
use crate::ecs::{Component, Entity, World};
use crate::foundation::math::{Quat, Quaternion, Transform, Vec3};

use super::document::XmlElement;
use super::error::SceneError;

/// Prefab references may nest at most this deep
pub const MAX_PREFAB_DEPTH: usize = 16;

/// File extension of prefab documents
pub const PREFAB_EXTENSION: &str = "prefab";

/// Remembers which prefab a node was instantiated from.
///
/// Such nodes are saved as a reference plus their overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefabRef(pub String);

impl Component for PrefabRef {}

/// Marks a node that belongs to an enclosing prefab's own subtree.
///
/// Saving a prefab root skips these nodes since loading the prefab
/// recreates them; only their added children are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefabPart;

impl Component for PrefabPart {}

/// Plain-data image of one node subtree
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeRecord {
    /// Display name
    pub name: String,
    /// Engine capabilities
    pub engine_flags: EngineFlags,
    /// Gameplay capabilities
    pub game_flags: GameFlags,
    /// Moves at runtime
    pub is_dynamic: bool,
    /// Local transform
    pub transform: Option<Transform>,
    /// Mesh reference
    pub mesh: Option<MeshComponent>,
    /// Material id
    pub material: Option<MaterialComponent>,
    /// Primitive id
    pub primitive: Option<PrimitiveComponent>,
    /// Light parameters
    pub light: Option<LightComponent>,
    /// Camera parameters
    pub camera: Option<CameraComponent>,
    /// Collision shape
    pub collider: Option<ColliderComponent>,
    /// Rigid body mass
    pub rigid_body: Option<f32>,
    /// Prefab this subtree was instantiated from
    pub prefab: Option<String>,
    /// Created by the nearest prefab ancestor rather than added to it
    pub inherited: bool,
    /// Child subtrees in order
    pub children: Vec<NodeRecord>,
}

impl NodeRecord {
    /// Empty record with a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Number of nodes in this subtree
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(NodeRecord::node_count).sum::<usize>()
    }

    /// Descendant called `name`, depth first
    pub fn find_descendant_mut(&mut self, name: &str) -> Option<&mut NodeRecord> {
        for child in &mut self.children {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.find_descendant_mut(name) {
                return Some(found);
            }
        }
        None
    }

    fn mark_inherited(&mut self) {
        for child in &mut self.children {
            child.inherited = true;
            child.mark_inherited();
        }
    }

    /// Make the engine flags agree with the payloads present
    fn sync_flags(&mut self) {
        let present = [
            (self.transform.is_some(), EngineFlags::TRANSFORM),
            (self.mesh.is_some(), EngineFlags::MESH),
            (self.material.is_some(), EngineFlags::MATERIAL),
            (self.primitive.is_some(), EngineFlags::PRIMITIVE),
            (self.light.is_some(), EngineFlags::LIGHT),
            (self.camera.is_some(), EngineFlags::CAMERA),
            (self.collider.is_some(), EngineFlags::COLLIDER),
            (self.rigid_body.is_some(), EngineFlags::RIGIDBODY),
        ];
        for (is_present, flag) in present {
            self.engine_flags.set(flag, is_present);
        }
    }
}

/// Typed attribute access with errors that name the file and element
pub struct Attributes<'a> {
    element: &'a XmlElement,
    path: &'a Path,
}

impl<'a> Attributes<'a> {
    /// Wrap an element read from `path`
    pub fn new(element: &'a XmlElement, path: &'a Path) -> Self {
        Self { element, path }
    }

    /// Required string attribute
    pub fn string(&self, key: &str) -> Result<&'a str, SceneError> {
        self.element.attr(key).ok_or_else(|| SceneError::MissingAttribute {
            path: self.path.to_path_buf(),
            element: self.element.name.clone(),
            attribute: key.to_string(),
        })
    }

    /// Required attribute parsed with `FromStr`
    pub fn parse<T: std::str::FromStr>(&self, key: &str) -> Result<T, SceneError> {
        let raw = self.string(key)?;
        self.interpret(key, raw)
    }

    /// Optional attribute parsed with `FromStr`, `default` when absent
    pub fn parse_or<T: std::str::FromStr>(&self, key: &str, default: T) -> Result<T, SceneError> {
        match self.element.attr(key) {
            Some(raw) => self.interpret(key, raw),
            None => Ok(default),
        }
    }

    /// Error for an attribute whose value is present but unusable
    pub fn invalid(&self, key: &str, value: &str) -> SceneError {
        SceneError::InvalidAttribute {
            path: self.path.to_path_buf(),
            element: self.element.name.clone(),
            attribute: key.to_string(),
            value: value.to_string(),
        }
    }

    fn interpret<T: std::str::FromStr>(&self, key: &str, raw: &str) -> Result<T, SceneError> {
        raw.trim().parse().map_err(|_| self.invalid(key, raw))
    }
}

/// Read and parse a document file
pub fn read_document(path: &Path) -> Result<XmlElement, SceneError> {
    let text = std::fs::read_to_string(path).map_err(|source| SceneError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    XmlElement::parse(&text).map_err(|source| SceneError::Xml {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize and write a document file
pub fn write_document(path: &Path, root: &XmlElement) -> Result<(), SceneError> {
    let text = root.to_xml_string().map_err(|source| SceneError::Xml {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, text).map_err(|source| SceneError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads and saves node subtrees
#[derive(Debug, Clone)]
pub struct NodeSerializer {
    prefab_dir: PathBuf,
}

impl NodeSerializer {
    /// Serializer resolving prefab references against `prefab_dir`
    pub fn new(prefab_dir: impl Into<PathBuf>) -> Self {
        Self {
            prefab_dir: prefab_dir.into(),
        }
    }

    /// Directory prefab references are resolved against
    pub fn prefab_dir(&self) -> &Path {
        &self.prefab_dir
    }

    /// Change the prefab directory
    pub fn set_prefab_dir(&mut self, dir: impl Into<PathBuf>) {
        self.prefab_dir = dir.into();
    }

    /// File a prefab reference points at; a missing extension means `.prefab`
    pub fn prefab_path(&self, reference: &str) -> PathBuf {
        let path = self.prefab_dir.join(reference);
        if path.extension().is_some() {
            path
        } else {
            path.with_extension(PREFAB_EXTENSION)
        }
    }

    /// Load a prefab file into a record
    pub fn read_prefab(&self, reference: &str) -> Result<NodeRecord, SceneError> {
        self.read_prefab_at(reference, 0)
    }

    /// Convert a `<Node>` element (and its subtree) into a record
    pub fn load_node(&self, element: &XmlElement, path: &Path) -> Result<NodeRecord, SceneError> {
        self.load_node_at(element, path, 0)
    }

    fn read_prefab_at(&self, reference: &str, depth: usize) -> Result<NodeRecord, SceneError> {
        let path = self.prefab_path(reference);
        if depth >= MAX_PREFAB_DEPTH {
            return Err(SceneError::PrefabDepth { path });
        }

        let document = read_document(&path)?;
        let node = match document.name.as_str() {
            "Node" => &document,
            "Root" => document.child("Node").ok_or_else(|| SceneError::MissingElement {
                path: path.clone(),
                element: "Node".to_string(),
            })?,
            other => {
                return Err(SceneError::UnexpectedRoot {
                    path: path.clone(),
                    expected: "Root".to_string(),
                    found: other.to_string(),
                })
            }
        };

        let mut record = self.load_node_at(node, &path, depth + 1)?;
        record.prefab = Some(reference.to_string());
        record.mark_inherited();
        Ok(record)
    }

    fn load_node_at(
        &self,
        element: &XmlElement,
        path: &Path,
        depth: usize,
    ) -> Result<NodeRecord, SceneError> {
        let attrs = Attributes::new(element, path);

        let mut record = match element.attr("Prefab") {
            Some(reference) => {
                let mut base = self.read_prefab_at(reference, depth)?;
                if let Some(name) = element.attr("Name") {
                    base.name = name.to_string();
                }
                let (engine_flags, game_flags) = parse_flags(&attrs)?;
                base.engine_flags |= engine_flags;
                base.game_flags |= game_flags;
                base.is_dynamic = attrs.parse_or("Dynamic", base.is_dynamic)?;
                overlay_payloads(&mut base, element, path)?;
                base.sync_flags();

                for attach in element.children_named("Attach") {
                    let target = Attributes::new(attach, path).string("To")?;
                    let mut added = Vec::new();
                    for child in attach.children_named("Node") {
                        added.push(self.load_node_at(child, path, depth)?);
                    }
                    base.find_descendant_mut(target)
                        .ok_or_else(|| Attributes::new(attach, path).invalid("To", target))?
                        .children
                        .extend(added);
                }
                base
            }
            None => parse_payloads(element, path)?,
        };

        for child in element.children_named("Node") {
            record.children.push(self.load_node_at(child, path, depth)?);
        }
        Ok(record)
    }

    /// Record to `<Node>` element.
    ///
    /// A prefab root keeps its reference plus its flags and payloads. Nodes
    /// the prefab creates are left out; children added below them are
    /// written inside `<Attach To="...">` elements.
    pub fn record_to_element(record: &NodeRecord) -> XmlElement {
        let mut element = XmlElement::new("Node").with_attr("Name", &record.name);
        if let Some(reference) = &record.prefab {
            element.set_attr("Prefab", reference);
        }
        element.set_attr("Engine", record.engine_flags.to_names());
        element.set_attr("Game", record.game_flags.to_names());
        element.set_attr("Dynamic", record.is_dynamic);

        if let Some(transform) = &record.transform {
            element.children.push(transform_element(transform));
        }
        if let Some(mesh) = &record.mesh {
            element.children.push(
                XmlElement::new("Mesh")
                    .with_attr("model", mesh.model)
                    .with_attr("index", mesh.index),
            );
        }
        if let Some(material) = &record.material {
            element.children.push(XmlElement::new("Material").with_attr("id", material.id));
        }
        if let Some(primitive) = &record.primitive {
            element.children.push(XmlElement::new("Primitive").with_attr("id", primitive.id));
        }
        if let Some(light) = &record.light {
            element.children.push(
                XmlElement::new("Light")
                    .with_attr("r", light.color.x)
                    .with_attr("g", light.color.y)
                    .with_attr("b", light.color.z)
                    .with_attr("intensity", light.intensity),
            );
        }
        if let Some(camera) = &record.camera {
            element.children.push(
                XmlElement::new("Camera")
                    .with_attr("aspect", camera.aspect)
                    .with_attr("fov", camera.fov),
            );
        }
        if let Some(collider) = &record.collider {
            element.children.push(collider_element(collider));
        }
        if let Some(mass) = record.rigid_body {
            element.children.push(XmlElement::new("RigidBody").with_attr("mass", mass));
        }
        if record.prefab.is_none() {
            for child in &record.children {
                element.children.push(Self::record_to_element(child));
            }
            return element;
        }

        for child in &record.children {
            if child.inherited {
                push_attachments(child, &mut element);
            } else {
                element.children.push(Self::record_to_element(child));
            }
        }
        element
    }

    /// Capture `entity`'s subtree as a record; `None` if it is not a node
    pub fn capture(world: &World, entity: Entity) -> Option<NodeRecord> {
        let node = world.get_component::<NodeComponent>(entity)?;
        let mut record = NodeRecord {
            name: node.name.clone(),
            engine_flags: node.engine_flags,
            game_flags: node.game_flags,
            is_dynamic: node.is_dynamic,
            transform: world
                .get_component::<TransformComponent>(entity)
                .map(|t| t.local.clone()),
            mesh: world.get_component::<MeshComponent>(entity).copied(),
            material: world.get_component::<MaterialComponent>(entity).copied(),
            primitive: world.get_component::<PrimitiveComponent>(entity).copied(),
            light: world.get_component::<LightComponent>(entity).cloned(),
            camera: world.get_component::<CameraComponent>(entity).copied(),
            collider: world.get_component::<ColliderComponent>(entity).cloned(),
            rigid_body: world.get_component::<RigidBodyComponent>(entity).map(|b| b.mass),
            prefab: world.get_component::<PrefabRef>(entity).map(|p| p.0.clone()),
            inherited: world.has_component::<PrefabPart>(entity),
            children: Vec::new(),
        };
        record.sync_flags();
        record.children = node
            .children
            .iter()
            .filter(|&&child| world.is_alive(child))
            .filter_map(|&child| Self::capture(world, child))
            .collect();
        Some(record)
    }

    /// Capture `entity`'s subtree as a `<Node>` element
    pub fn save_node(world: &World, entity: Entity) -> Option<XmlElement> {
        Self::capture(world, entity).map(|record| Self::record_to_element(&record))
    }

    /// Create entities for a record subtree below `parent` (or as a root).
    ///
    /// Children are linked into `parent`'s node; the caller owns root-list
    /// bookkeeping.
    pub fn instantiate(world: &mut World, record: &NodeRecord, parent: Option<Entity>) -> Entity {
        let entity = world.create_entity();
        let node = match parent {
            Some(parent) => NodeComponent::child(entity, record.name.clone(), parent),
            None => NodeComponent::root(entity, record.name.clone()),
        };
        world.add_component(entity, node);
        if let Some(parent_node) = parent.and_then(|p| world.get_component_mut::<NodeComponent>(p)) {
            parent_node.push_child(entity);
        }

        Self::apply(world, entity, record);

        for child in &record.children {
            Self::instantiate(world, child, Some(entity));
        }
        entity
    }

    /// Attach a record's components to an existing node entity.
    ///
    /// Flags are merged; existing components of the same kind are replaced.
    /// The record's children are not instantiated.
    pub fn apply(world: &mut World, entity: Entity, record: &NodeRecord) {
        if let Some(node) = world.get_component_mut::<NodeComponent>(entity) {
            node.engine_flags |= record.engine_flags;
            node.game_flags |= record.game_flags;
            node.is_dynamic |= record.is_dynamic;
        }

        if let Some(local) = &record.transform {
            let mut transform = TransformComponent::from_transform(local.clone());
            let parent_world = TransformSystem::parent_world(world, entity);
            transform.update_world(parent_world.as_ref());
            world.add_component(entity, transform);
        }
        if let Some(mesh) = record.mesh {
            world.add_component(entity, mesh);
        }
        if let Some(material) = record.material {
            world.add_component(entity, material);
        }
        if let Some(primitive) = record.primitive {
            world.add_component(entity, primitive);
        }
        if let Some(light) = &record.light {
            world.add_component(entity, light.clone());
        }
        if let Some(camera) = record.camera {
            world.add_component(entity, camera);
        }
        if let Some(collider) = &record.collider {
            world.add_component(entity, collider.clone());
        }
        if let Some(mass) = record.rigid_body {
            let mut body = RigidBodyComponent::new(mass);
            if let Some(transform) = world.get_component::<TransformComponent>(entity) {
                body.world_transform = transform.world;
            }
            world.add_component(entity, body);
        }
        if let Some(reference) = &record.prefab {
            world.add_component(entity, PrefabRef(reference.clone()));
        }
        if record.inherited {
            world.add_component(entity, PrefabPart);
        }
        world.refresh(entity);
    }
}

/// Children added below prefab-owned nodes, as `<Attach>` elements
fn push_attachments(record: &NodeRecord, into: &mut XmlElement) {
    let mut attach = XmlElement::new("Attach").with_attr("To", &record.name);
    for child in &record.children {
        if child.inherited {
            push_attachments(child, into);
        } else {
            attach.children.push(NodeSerializer::record_to_element(child));
        }
    }
    if !attach.children.is_empty() {
        into.children.push(attach);
    }
}

fn parse_flags(attrs: &Attributes<'_>) -> Result<(EngineFlags, GameFlags), SceneError> {
    let engine_raw = attrs.element.attr("Engine").unwrap_or_default();
    let game_raw = attrs.element.attr("Game").unwrap_or_default();
    let engine = EngineFlags::from_names(engine_raw).map_err(|_| attrs.invalid("Engine", engine_raw))?;
    let game = GameFlags::from_names(game_raw).map_err(|_| attrs.invalid("Game", game_raw))?;
    Ok((engine, game))
}

fn parse_payloads(element: &XmlElement, path: &Path) -> Result<NodeRecord, SceneError> {
    let attrs = Attributes::new(element, path);
    let (engine_flags, game_flags) = parse_flags(&attrs)?;
    let mut record = NodeRecord {
        name: attrs.string("Name")?.to_string(),
        engine_flags,
        game_flags,
        is_dynamic: attrs.parse_or("Dynamic", false)?,
        ..Default::default()
    };

    if element.child("Transform").is_none() && record.engine_flags.contains(EngineFlags::TRANSFORM) {
        record.transform = Some(Transform::identity());
    }
    overlay_payloads(&mut record, element, path)?;
    record.sync_flags();
    Ok(record)
}

/// Replace the record's payloads with those present on `element`
fn overlay_payloads(record: &mut NodeRecord, element: &XmlElement, path: &Path) -> Result<(), SceneError> {
    if let Some(transform) = element.child("Transform") {
        record.transform = Some(parse_transform(transform, path)?);
    }
    if let Some(mesh) = element.child("Mesh") {
        let attrs = Attributes::new(mesh, path);
        record.mesh = Some(MeshComponent {
            model: attrs.parse("model")?,
            index: attrs.parse_or("index", 0)?,
        });
    }
    if let Some(material) = element.child("Material") {
        record.material = Some(MaterialComponent {
            id: Attributes::new(material, path).parse("id")?,
        });
    }
    if let Some(primitive) = element.child("Primitive") {
        record.primitive = Some(PrimitiveComponent {
            id: Attributes::new(primitive, path).parse("id")?,
        });
    }
    if let Some(light) = element.child("Light") {
        let attrs = Attributes::new(light, path);
        record.light = Some(LightComponent::new(
            Vec3::new(
                attrs.parse_or("r", 1.0)?,
                attrs.parse_or("g", 1.0)?,
                attrs.parse_or("b", 1.0)?,
            ),
            attrs.parse_or("intensity", 1.0)?,
        ));
    }
    if let Some(camera) = element.child("Camera") {
        let attrs = Attributes::new(camera, path);
        let defaults = CameraComponent::default();
        record.camera = Some(CameraComponent {
            aspect: attrs.parse_or("aspect", defaults.aspect)?,
            fov: attrs.parse_or("fov", defaults.fov)?,
        });
    }
    if let Some(collider) = element.child("Collider") {
        record.collider = Some(parse_collider(collider, path)?);
    }
    if let Some(body) = element.child("RigidBody") {
        record.rigid_body = Some(Attributes::new(body, path).parse_or("mass", 1.0)?);
    }
    Ok(())
}

fn parse_vec3(element: &XmlElement, path: &Path, default: f32) -> Result<Vec3, SceneError> {
    let attrs = Attributes::new(element, path);
    Ok(Vec3::new(
        attrs.parse_or("x", default)?,
        attrs.parse_or("y", default)?,
        attrs.parse_or("z", default)?,
    ))
}

fn parse_transform(element: &XmlElement, path: &Path) -> Result<Transform, SceneError> {
    let mut transform = Transform::identity();
    if let Some(position) = element.child("Position") {
        transform.position = parse_vec3(position, path, 0.0)?;
    }
    if let Some(rotation) = element.child("Rotation") {
        let attrs = Attributes::new(rotation, path);
        let raw: Quaternion<f32> = Quaternion::new(
            attrs.parse_or("w", 1.0)?,
            attrs.parse_or("x", 0.0)?,
            attrs.parse_or("y", 0.0)?,
            attrs.parse_or("z", 0.0)?,
        );
        transform.rotation = if (raw.norm() - 1.0).abs() < 1e-6 {
            Quat::new_unchecked(raw)
        } else {
            Quat::try_new(raw, 1e-6).ok_or_else(|| attrs.invalid("w", &raw.w.to_string()))?
        };
    }
    if let Some(scale) = element.child("Scale") {
        transform.scale = parse_vec3(scale, path, 1.0)?;
    }
    Ok(transform)
}

fn parse_collider(element: &XmlElement, path: &Path) -> Result<ColliderComponent, SceneError> {
    let attrs = Attributes::new(element, path);
    let kind = attrs.parse_or("type", "box".to_string())?;
    let shape = match kind.as_str() {
        "box" => ColliderShape::Box(parse_vec3(element, path, 0.5)?),
        "sphere" => ColliderShape::Sphere(attrs.parse_or("radius", 0.5)?),
        "capsule" => ColliderShape::Capsule {
            radius: attrs.parse_or("radius", 0.5)?,
            height: attrs.parse_or("height", 1.0)?,
        },
        other => return Err(attrs.invalid("type", other)),
    };
    let mut collider = ColliderComponent::new(shape, attrs.parse_or("mass", 0.0)?);
    collider.is_trigger = attrs.parse_or("trigger", false)?;
    Ok(collider)
}

fn transform_element(transform: &Transform) -> XmlElement {
    let rotation = transform.rotation.quaternion();
    XmlElement::new("Transform")
        .with_child(
            XmlElement::new("Position")
                .with_attr("x", transform.position.x)
                .with_attr("y", transform.position.y)
                .with_attr("z", transform.position.z),
        )
        .with_child(
            XmlElement::new("Rotation")
                .with_attr("x", rotation.i)
                .with_attr("y", rotation.j)
                .with_attr("z", rotation.k)
                .with_attr("w", rotation.w),
        )
        .with_child(
            XmlElement::new("Scale")
                .with_attr("x", transform.scale.x)
                .with_attr("y", transform.scale.y)
                .with_attr("z", transform.scale.z),
        )
}

fn collider_element(collider: &ColliderComponent) -> XmlElement {
    let mut element = XmlElement::new("Collider").with_attr("type", collider.shape.kind());
    match &collider.shape {
        ColliderShape::Box(half) => {
            element.set_attr("x", half.x);
            element.set_attr("y", half.y);
            element.set_attr("z", half.z);
        }
        ColliderShape::Sphere(radius) => element.set_attr("radius", radius),
        ColliderShape::Capsule { radius, height } => {
            element.set_attr("radius", radius);
            element.set_attr("height", height);
        }
    }
    element.set_attr("mass", collider.mass);
    if collider.is_trigger {
        element.set_attr("trigger", true);
    }
    element
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn scene_path() -> PathBuf {
        PathBuf::from("test.xml")
    }

    #[test]
    fn test_load_node_reads_payloads_and_children() {
        let element = XmlElement::parse(
            r#"<Node Name="Lamp" Engine="headnode" Dynamic="true">
                 <Transform><Position x="1" y="2" z="3"/></Transform>
                 <Light r="1" g="0.5" b="0" intensity="2"/>
                 <Collider type="sphere" radius="0.25" trigger="true"/>
                 <Node Name="Bulb"><Primitive id="-2"/></Node>
               </Node>"#,
        )
        .expect("xml");

        let record = NodeSerializer::new("prefabs")
            .load_node(&element, &scene_path())
            .expect("record");

        assert_eq!(record.name, "Lamp");
        assert!(record.is_dynamic);
        assert!(record
            .engine_flags
            .contains(EngineFlags::HEADNODE | EngineFlags::TRANSFORM | EngineFlags::LIGHT | EngineFlags::COLLIDER));
        assert_relative_eq!(record.transform.as_ref().expect("transform").position, Vec3::new(1.0, 2.0, 3.0));
        assert!(record.collider.as_ref().expect("collider").is_trigger);
        assert_eq!(record.children.len(), 1);
        assert_eq!(record.children[0].primitive, Some(PrimitiveComponent { id: -2 }));
        assert_eq!(record.node_count(), 2);
    }

    #[test]
    fn test_missing_name_is_reported_with_path() {
        let element = XmlElement::parse(r#"<Node Engine="transform"/>"#).expect("xml");
        let err = NodeSerializer::new("prefabs")
            .load_node(&element, &scene_path())
            .unwrap_err();
        assert!(matches!(err, SceneError::MissingAttribute { ref attribute, .. } if attribute == "Name"));
        assert!(err.to_string().contains("test.xml"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let serializer = NodeSerializer::new("prefabs");
        for text in [
            r#"<Node Name="A" Engine="transform|wings"/>"#,
            r#"<Node Name="A"><Material id="stone"/></Node>"#,
            r#"<Node Name="A"><Collider type="torus"/></Node>"#,
            r#"<Node Name="A"><Transform><Rotation x="0" y="0" z="0" w="0"/></Transform></Node>"#,
        ] {
            let element = XmlElement::parse(text).expect("xml");
            assert!(
                matches!(serializer.load_node(&element, &scene_path()), Err(SceneError::InvalidAttribute { .. })),
                "{text} should be rejected"
            );
        }
    }

    #[test]
    fn test_prefab_reference_overlays_name_and_transform() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(
            dir.path().join("Goblin.prefab"),
            r#"<Root><Node Name="Goblin" Engine="mesh"><Mesh model="3"/><Node Name="Club"/></Node></Root>"#,
        )
        .expect("write prefab");

        let element = XmlElement::parse(
            r#"<Node Name="Goblin7" Prefab="Goblin">
                 <Transform><Position x="4" y="0" z="-1"/></Transform>
               </Node>"#,
        )
        .expect("xml");
        let record = NodeSerializer::new(dir.path())
            .load_node(&element, &scene_path())
            .expect("record");

        assert_eq!(record.name, "Goblin7");
        assert_eq!(record.prefab.as_deref(), Some("Goblin"));
        assert_eq!(record.mesh, Some(MeshComponent { model: 3, index: 0 }));
        assert_eq!(record.children[0].name, "Club");
        assert_relative_eq!(record.transform.expect("transform").position, Vec3::new(4.0, 0.0, -1.0));
    }

    #[test]
    fn test_self_referencing_prefab_is_stopped() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join("Loop.prefab"), r#"<Node Name="Loop" Prefab="Loop"/>"#)
            .expect("write prefab");

        let err = NodeSerializer::new(dir.path()).read_prefab("Loop").unwrap_err();
        assert!(matches!(err, SceneError::PrefabDepth { .. }));
    }

    #[test]
    fn test_capture_then_element_then_load_is_identity() {
        let mut world = World::new();
        let mut record = NodeRecord::new("Crate");
        record.is_dynamic = true;
        record.transform = Some(Transform::from_euler_degrees(
            Vec3::new(0.5, -2.25, 8.0),
            Vec3::new(0.0, 45.0, 10.0),
            Vec3::new(1.0, 2.0, 1.0),
        ));
        record.material = Some(MaterialComponent { id: 4 });
        record.collider = Some(ColliderComponent::new(ColliderShape::Box(Vec3::new(1.0, 0.5, 1.0)), 3.0));
        record.rigid_body = Some(3.0);
        record.children.push(NodeRecord::new("Lid"));
        record.sync_flags();

        let entity = NodeSerializer::instantiate(&mut world, &record, None);
        let element = NodeSerializer::save_node(&world, entity).expect("node");
        let text = XmlElement::new("Root").with_child(element).to_xml_string().expect("text");
        let reparsed = XmlElement::parse(&text).expect("parse");
        let loaded = NodeSerializer::new("unused")
            .load_node(reparsed.child("Node").expect("node"), &scene_path())
            .expect("load");

        assert_eq!(loaded.name, record.name);
        assert_eq!(loaded.engine_flags, record.engine_flags);
        assert_eq!(loaded.material, record.material);
        assert_eq!(loaded.collider, record.collider);
        assert_eq!(loaded.rigid_body, record.rigid_body);
        assert_eq!(loaded.children.len(), 1);
        let (a, b) = (loaded.transform.expect("a"), record.transform.expect("b"));
        assert_relative_eq!(a.position, b.position);
        assert_relative_eq!(a.scale, b.scale);
        assert!(a.rotation.angle_to(&b.rotation) < 1e-5);
    }

    #[test]
    fn test_prefab_root_keeps_flags_payloads_and_added_children() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(
            dir.path().join("Knight.prefab"),
            r#"<Root><Node Name="Knight" Engine="transform|mesh"><Mesh model="1"/>
                 <Node Name="Arm"><Node Name="Hand"/></Node>
               </Node></Root>"#,
        )
        .expect("write prefab");
        std::fs::write(dir.path().join("Sword.prefab"), r#"<Node Name="Sword"><Material id="4"/></Node>"#)
            .expect("write prefab");
        let serializer = NodeSerializer::new(dir.path());

        let mut world = World::new();
        let knight = NodeSerializer::instantiate(&mut world, &serializer.read_prefab("Knight").expect("knight"), None);
        let arm = world.get_component::<NodeComponent>(knight).expect("node").children[0];
        let hand = world.get_component::<NodeComponent>(arm).expect("arm").children[0];
        let sword = NodeSerializer::instantiate(&mut world, &serializer.read_prefab("Sword").expect("sword"), Some(hand));
        let shield = NodeSerializer::instantiate(&mut world, &NodeRecord::new("Shield"), Some(knight));
        world.add_component(sword, TransformComponent::from_transform(Transform::from_position(Vec3::new(0.0, 0.0, -2.0))));
        world.add_component(shield, TransformComponent::default());
        world.add_component(knight, ColliderComponent::new(ColliderShape::Sphere(0.5), 1.0));
        if let Some(node) = world.get_component_mut::<NodeComponent>(knight) {
            node.engine_flags |= EngineFlags::HEADNODE | EngineFlags::COLLIDER;
            node.game_flags |= GameFlags::CONTROLLER;
        }

        let before = NodeSerializer::capture(&world, knight).expect("capture");
        let element = NodeSerializer::record_to_element(&before);
        assert_eq!(element.children_named("Attach").count(), 1);
        assert_eq!(element.children_named("Node").count(), 1);

        let text = XmlElement::new("Root").with_child(element).to_xml_string().expect("text");
        let reparsed = XmlElement::parse(&text).expect("parse");
        let after = serializer
            .load_node(reparsed.child("Node").expect("node"), &scene_path())
            .expect("load");

        assert_eq!(after.engine_flags, before.engine_flags);
        assert_eq!(after.game_flags, before.game_flags);
        assert_eq!(after.collider, before.collider);
        assert_eq!(after.node_count(), before.node_count());
        assert_eq!(after.children[1].name, "Shield");
        assert!(!after.children[1].inherited);
        let hand = &after.children[0].children[0];
        assert_eq!(hand.name, "Hand");
        assert!(hand.inherited);
        assert_eq!(hand.children[0].prefab.as_deref(), Some("Sword"));
        assert_relative_eq!(
            hand.children[0].transform.as_ref().expect("transform").position,
            Vec3::new(0.0, 0.0, -2.0)
        );
    }

    #[test]
    fn test_attach_to_unknown_node_is_rejected() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join("Crate.prefab"), r#"<Node Name="Crate"/>"#).expect("write prefab");
        let element = XmlElement::parse(
            r#"<Node Name="Crate1" Prefab="Crate"><Attach To="Lid"><Node Name="Coin"/></Attach></Node>"#,
        )
        .expect("xml");

        let err = NodeSerializer::new(dir.path())
            .load_node(&element, &scene_path())
            .unwrap_err();
        assert!(matches!(err, SceneError::InvalidAttribute { ref attribute, .. } if attribute == "To"));
    }

    #[test]
    fn test_instantiate_links_children_and_world_transforms() {
        let mut world = World::new();
        let mut root = NodeRecord::new("Root");
        root.transform = Some(Transform::from_position(Vec3::new(3.0, 0.0, 0.0)));
        let mut child = NodeRecord::new("Child");
        child.transform = Some(Transform::from_position(Vec3::new(0.0, 1.0, 0.0)));
        root.children.push(child);

        let entity = NodeSerializer::instantiate(&mut world, &root, None);
        let node = world.get_component::<NodeComponent>(entity).expect("node");
        assert_eq!(node.children.len(), 1);
        let child = node.children[0];
        assert_eq!(world.get_component::<NodeComponent>(child).expect("child").parent, Some(entity));
        assert_relative_eq!(
            world.get_component::<TransformComponent>(child).expect("transform").world_position(),
            Vec3::new(3.0, 1.0, 0.0)
        );
    }
}
