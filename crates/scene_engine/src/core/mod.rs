//! # Core Engine Module
//!
//! Shared configuration types for the engine and the scene layer.

pub mod config;

pub use config::{EngineConfig, SceneConfig, Config, ConfigError};
