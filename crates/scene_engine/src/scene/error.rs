//! Scene error types

use std::path::PathBuf;

use thiserror::Error;

use super::document::DocumentError;
use crate::ecs::Entity;

/// Failure while reading or writing a scene or prefab file
#[derive(Debug, Error)]
pub enum SceneError {
    /// The file could not be read or written
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The file is not well-formed XML
    #[error("malformed document {}: {source}", .path.display())]
    Xml {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: DocumentError,
    },

    /// A required element is absent
    #[error("{}: missing <{element}> element", .path.display())]
    MissingElement {
        /// File involved
        path: PathBuf,
        /// Element name
        element: String,
    },

    /// A required attribute is absent
    #[error("{}: <{element}> is missing attribute `{attribute}`", .path.display())]
    MissingAttribute {
        /// File involved
        path: PathBuf,
        /// Element name
        element: String,
        /// Attribute name
        attribute: String,
    },

    /// An attribute value could not be interpreted
    #[error("{}: <{element} {attribute}=\"{value}\"> is not valid", .path.display())]
    InvalidAttribute {
        /// File involved
        path: PathBuf,
        /// Element name
        element: String,
        /// Attribute name
        attribute: String,
        /// Offending value
        value: String,
    },

    /// The document root is not the expected element
    #[error("{}: expected root <{expected}>, found <{found}>", .path.display())]
    UnexpectedRoot {
        /// File involved
        path: PathBuf,
        /// Expected element
        expected: String,
        /// Element found
        found: String,
    },

    /// Prefab references nest deeper than the loader allows (usually a cycle)
    #[error("{}: prefab references nest too deeply", .path.display())]
    PrefabDepth {
        /// Prefab at which loading stopped
        path: PathBuf,
    },

    /// `save_scene` was called before any scene was loaded or named
    #[error("no active scene to save")]
    NoActiveScene,
}

/// Violation of the scene-graph structure
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    /// The entity carries no `NodeComponent`
    #[error("entity {0:?} is not a scene node")]
    NotANode(Entity),

    /// The requested parent lies inside the child's own subtree
    #[error("cannot attach {child:?} below its own descendant {parent:?}")]
    Cycle {
        /// Node being moved
        child: Entity,
        /// Requested parent
        parent: Entity,
    },

    /// The node is already queued for deletion
    #[error("node {0:?} is being deleted")]
    Deleted(Entity),

    /// A node is reachable more than once
    #[error("node {0:?} is reachable more than once")]
    Aliased(Entity),

    /// A root in the root list has no live entity
    #[error("root {0:?} is not alive")]
    DeadRoot(Entity),

    /// A root in the root list has a parent link
    #[error("root {0:?} has a parent link")]
    RootHasParent(Entity),

    /// A child's parent link disagrees with the list it was found in
    #[error("node {child:?} is listed under {listed_under:?} but links to {parent:?}")]
    BrokenLink {
        /// Child node
        child: Entity,
        /// Node whose child list contains it
        listed_under: Entity,
        /// The child's own parent link
        parent: Option<Entity>,
    },

    /// A live node is not reachable from the root list
    #[error("node {0:?} is not reachable from any root")]
    Orphan(Entity),
}
