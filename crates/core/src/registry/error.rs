//! Error types for registry operations.

use crate::config::ConfigError;
use thiserror::Error;

/// Why a manifest was rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PackageError {
    #[error("required field '{0}' is empty")]
    MissingField(&'static str),

    #[error("agent_id '{0}' must be a lowercase slug (a-z, 0-9, '-', '_')")]
    InvalidId(String),

    #[error("version '{0}' is not MAJOR.MINOR.PATCH")]
    InvalidVersion(String),

    #[error("{field} is out of range: {reason}")]
    OutOfRange { field: &'static str, reason: String },

    #[error("entry point '{entry_point}' is not registered (known: {known})")]
    UnknownEntryPoint { entry_point: String, known: String },

    #[error("model '{0}' is not served by the backend")]
    UnsupportedModel(String),

    #[error("api '{0}' is not available")]
    UnsupportedApi(String),

    #[error("depends on agent '{0}', which is not installed")]
    MissingAgent(String),
}

/// Errors surfaced synchronously by registry mutations.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The package was rejected before touching the registry.
    #[error("Invalid package '{agent_id}': {source}")]
    Validation {
        agent_id: String,
        #[source]
        source: PackageError,
    },

    /// A different implementation is already registered under this id.
    #[error("Agent '{agent_id}' {existing_version} is already installed (new: {new_version}); use force to replace it")]
    Conflict {
        agent_id: String,
        existing_version: String,
        new_version: String,
    },

    #[error("Agent '{0}' not found")]
    NotFound(String),

    /// The agent is the routing fallback and must stay installed and enabled.
    #[error("Agent '{0}' is the default agent and cannot be disabled or uninstalled")]
    Pinned(String),

    /// The package could not be read.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RegistryError {
    pub(crate) fn validation(agent_id: &str, source: PackageError) -> Self {
        RegistryError::Validation {
            agent_id: agent_id.to_string(),
            source,
        }
    }
}

/// Type alias for Result with RegistryError.
pub type RegistryResult<T> = Result<T, RegistryError>;
