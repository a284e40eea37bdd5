//! Entity-Component-System implementation
//!
//! A small single-threaded ECS: generational entities, one storage per
//! component type, deferred deletion and refresh notifications.

pub mod component;
pub mod components;
pub mod entity;
pub mod storage;
pub mod system;
pub mod systems;
pub mod world;

pub use component::Component;
pub use entity::Entity;
pub use system::System;
pub use world::World;
