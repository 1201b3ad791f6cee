//! Installable agent package manifests.
//!
//! A package is a directory holding either `agent.json` or `agent.md`
//! (YAML front matter plus a Markdown body used as the system prompt).

use serde::{Deserialize, Serialize};
use std::time::Duration;
use ts_rs::TS;

use crate::agent_models::AgentConfig;

/// Declared runtime dependencies of a package.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, TS)]
pub struct ManifestDependencies {
    /// External APIs, e.g. `openai`.
    #[serde(default)]
    pub apis: Vec<String>,

    /// Backend model identifiers.
    #[serde(default)]
    pub models: Vec<String>,

    /// Other agents that must already be installed.
    #[serde(default)]
    pub agents: Vec<String>,
}

/// Default configuration overrides shipped with a package.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, TS)]
pub struct ManifestConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,

    #[serde(default)]
    pub triggers: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_style: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_score: Option<f64>,
}

/// Structured description of an installable agent package.
///
/// # Example
///
/// ```json
/// {
///   "agent_id": "research",
///   "name": "Research Agent",
///   "description": "Finds and summarises sources",
///   "version": "1.2.0",
///   "author": "Dispatch Kit Contributors",
///   "main_module": "prompt",
///   "tags": ["research"],
///   "dependencies": { "models": ["gpt-4o-mini"] },
///   "config": { "temperature": 0.3, "triggers": ["research", "sources"] }
/// }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct AgentManifest {
    pub agent_id: String,
    pub name: String,
    pub description: String,
    pub version: String,
    pub author: String,

    /// Factory entry point that builds the agent (e.g. `prompt`, `coding`).
    pub main_module: String,

    /// Informational class name, kept for package compatibility.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_class: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub dependencies: ManifestDependencies,

    #[serde(default)]
    pub config: ManifestConfig,

    /// Markdown body of an `agent.md` manifest. Never read from JSON.
    #[serde(skip)]
    pub system_prompt: Option<String>,
}

impl AgentManifest {
    /// Resolve the manifest into a full agent configuration, filling every
    /// field the package leaves out with its default.
    pub fn to_agent_config(&self) -> AgentConfig {
        let mut config = AgentConfig::new(&self.agent_id, &self.name, &self.description)
            .with_version(&self.version)
            .with_tags(self.tags.iter().cloned())
            .with_triggers(self.config.triggers.iter().cloned());

        config.author = self.author.clone();
        config.system_prompt = self.system_prompt.clone();
        config.required_apis = self.dependencies.apis.clone();
        config.required_models = self.dependencies.models.clone();

        if let Some(model) = &self.config.model {
            config.model = model.clone();
        }
        if let Some(temperature) = self.config.temperature {
            config.temperature = temperature;
        }
        if let Some(max_tokens) = self.config.max_tokens {
            config.max_tokens = max_tokens;
        }
        if let Some(secs) = self.config.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(retry_count) = self.config.retry_count {
            config.retry_count = retry_count;
        }
        if let Some(style) = &self.config.thinking_style {
            config.thinking_style = style.clone();
        }
        if let Some(base_score) = self.config.base_score {
            config.base_score = base_score;
        }
        config
    }
}
