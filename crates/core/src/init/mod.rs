//! Initialization module for creating .dispatch-kit directory structures.
//!
//! This module provides functionality to initialize a new dispatch-kit project
//! by generating a `.dispatch-kit/` directory with pre-configured templates for:
//! - Global configuration (`config.toml`)
//! - Agent packages (`agents/<id>/agent.md` or `agent.json`)
//!
//! # Example
//!
//! ```no_run
//! use dk_core::init::{InitOptions, generate_dispatch_kit_structure};
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = InitOptions {
//!     target_dir: PathBuf::from("."),
//!     force: false,
//!     minimal: false,
//! };
//!
//! generate_dispatch_kit_structure(options).await?;
//! println!("dispatch-kit initialized successfully!");
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod generator;
pub mod templates;

// Re-export commonly used types for convenience
pub use error::{InitError, InitResult};
pub use generator::{generate_dispatch_kit_structure, scaffold_agent, InitOptions};
pub use templates::{get_template, list_templates};
