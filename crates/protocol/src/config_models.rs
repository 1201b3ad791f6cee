//! Global configuration models for `.dispatch-kit/config.toml`.
//!
//! This module defines the project-wide settings that shape routing and
//! the model backend.

use serde::Deserialize;
use serde::Serialize;
use ts_rs::TS;

/// Default minimum score an agent needs to be selected.
pub const DEFAULT_THRESHOLD: f64 = 0.3;

/// Default fallback agent.
pub const DEFAULT_AGENT: &str = "general";

/// Represents global settings from `.dispatch-kit/config.toml`.
///
/// # Example
///
/// ```toml
/// # .dispatch-kit/config.toml
/// threshold = 0.3
/// max_agents = 3
/// default_agent = "general"
/// disabled_agents = ["writing"]
/// available_apis = ["openai"]
/// log_level = "info"
///
/// [backend]
/// command = "ollama"
/// args = ["run", "{model}"]
/// models = ["llama3", "gpt-4o-mini"]
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct DispatchConfig {
    /// Minimum relevance score for selection.
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Upper bound on agents invoked per request. Unbounded when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_agents: Option<usize>,

    /// Agent that runs when nothing reaches the threshold.
    #[serde(default = "default_agent")]
    pub default_agent: String,

    /// Installed but not eligible for routing.
    #[serde(default)]
    pub disabled_agents: Vec<String>,

    /// External APIs reachable from this deployment.
    #[serde(default)]
    pub available_apis: Vec<String>,

    #[serde(default)]
    pub backend: BackendConfig,

    /// Default tracing filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            max_agents: None,
            default_agent: default_agent(),
            disabled_agents: Vec::new(),
            available_apis: Vec::new(),
            backend: BackendConfig::default(),
            log_level: default_log_level(),
        }
    }
}

/// How to reach the language-model backend.
///
/// When `command` is absent an offline echo backend is used.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, TS)]
pub struct BackendConfig {
    /// Executable that reads a prompt on stdin and prints the answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Arguments. `{model}` is replaced with the agent's model.
    #[serde(default)]
    pub args: Vec<String>,

    /// Models the backend serves. Empty means any.
    #[serde(default)]
    pub models: Vec<String>,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_agent() -> String {
    DEFAULT_AGENT.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}
