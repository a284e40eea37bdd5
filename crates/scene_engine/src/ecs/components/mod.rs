//! ECS Components module
//!
//! Engine components attached to scene nodes.

pub mod character;
pub mod collision;
pub mod flags;
pub mod lighting;
pub mod node;
pub mod renderable;
pub mod transform;

pub use character::{CharacterComponent, GuiComponent};
pub use collision::{ColliderComponent, ColliderShape, CollisionStateComponent, RigidBodyComponent};
pub use flags::{EngineFlags, GameFlags};
pub use lighting::LightComponent;
pub use node::NodeComponent;
pub use renderable::{CameraComponent, MaterialComponent, MeshComponent, PrimitiveComponent};
pub use transform::TransformComponent;
