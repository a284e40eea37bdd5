//! Scene management
//!
//! The scene graph is a forest of `NodeComponent`s living in the ECS world.
//! This module reads and writes it:
//!
//! ```text
//! scene file / prefab ──(document)──> XmlElement ──(serializer)──> NodeRecord
//!                                                                    │
//! SceneRegistry <──────────────────────(instantiate)─────────────────┘
//! ```
//!
//! `SceneRegistry` is the single owner of the world and the root list; all
//! structural changes go through it.

pub mod document;
mod error;
pub mod registry;
pub mod serializer;

pub use document::{DocumentError, XmlElement};
pub use error::{HierarchyError, SceneError};
pub use registry::{SceneDocument, SceneRegistry};
pub use serializer::{read_document, write_document, Attributes, NodeRecord, NodeSerializer, PrefabPart, PrefabRef};
