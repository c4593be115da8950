//! Configuration Management
//!
//! Unified configuration system with hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/actor-inspector/config.toml)
//! 3. Project config (.actor-inspector/config.toml)
//! 4. Environment variables (ACTOR_INSPECTOR_*)
//! 5. CLI arguments and the input document (highest priority)

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
