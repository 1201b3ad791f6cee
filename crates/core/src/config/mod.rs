//! Configuration loading and management.
//!
//! This module loads `.dispatch-kit/config.toml`, parses agent package
//! manifests and persists installed packages back to disk.

pub mod error;
pub mod loader;
pub mod models;
pub mod store;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, load_manifest};
pub use models::AppConfig;
