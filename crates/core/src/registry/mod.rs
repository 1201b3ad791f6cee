//! Agent registry.
//!
//! Discovers agent packages, validates their manifests, instantiates agents
//! through the [`AgentFactory`](crate::agents::AgentFactory) and tracks which
//! of them are enabled for routing.

pub mod admin;
pub mod error;
pub mod package;
pub mod store;
pub mod validation;

pub use admin::handle_op;
pub use error::{PackageError, RegistryError, RegistryResult};
pub use package::AgentPackage;
pub use store::{AgentRegistry, DiscoveryFailure, DiscoveryReport, InstallOutcome, RegistryEntry};
pub use validation::{is_valid_agent_id, validate_fields, validate_manifest};
