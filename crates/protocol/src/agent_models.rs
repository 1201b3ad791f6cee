//! Agent configuration models.
//!
//! An `AgentConfig` is the static identity and policy of one agent. It is
//! produced from an installable package manifest (see [`crate::manifest_models`])
//! or supplied directly by compiled-in agents.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use ts_rs::TS;

/// Default backend model for agents that do not name one.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Default generation budget.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Default per-attempt deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default number of retries after an `Error` response.
pub const DEFAULT_RETRY_COUNT: u32 = 3;

/// Static identity and behaviour of one agent.
///
/// # Example
///
/// ```json
/// {
///   "agent_id": "coding",
///   "name": "Coding Agent",
///   "description": "Software development and debugging",
///   "version": "2.0.0",
///   "model": "claude-3-5-sonnet",
///   "temperature": 0.2,
///   "max_tokens": 6000,
///   "triggers": ["code", "python", "function"],
///   "tags": ["programming"],
///   "timeout_ms": 90000,
///   "retry_count": 2
/// }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct AgentConfig {
    /// Unique lowercase slug. Registry key.
    pub agent_id: String,

    /// Human-readable display name.
    pub name: String,

    /// What the agent is good at.
    pub description: String,

    /// Semantic version of the implementation.
    pub version: String,

    #[serde(default)]
    pub author: String,

    /// Backend model identifier passed to the model client.
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Persona text injected into every prompt.
    #[serde(default)]
    pub thinking_style: String,

    /// Full prompt preamble replacing the generated persona, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Keywords that make this agent relevant.
    #[serde(default)]
    pub triggers: Vec<String>,

    /// Classification labels. Weaker relevance signal than triggers.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Score reported when no keyword matches.
    #[serde(default)]
    pub base_score: f64,

    /// Deadline for a single attempt.
    #[serde(rename = "timeout_ms", with = "duration_ms", default = "default_timeout")]
    #[ts(type = "number")]
    pub timeout: Duration,

    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// External APIs the agent needs (checked by `health`).
    #[serde(default)]
    pub required_apis: Vec<String>,

    /// Backend models the agent needs (checked by `health`).
    #[serde(default)]
    pub required_models: Vec<String>,
}

impl AgentConfig {
    /// Create a configuration with defaults for everything but identity.
    pub fn new(agent_id: &str, name: &str, description: &str) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            version: "1.0.0".to_string(),
            author: String::new(),
            model: default_model(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            thinking_style: String::new(),
            system_prompt: None,
            triggers: Vec::new(),
            tags: Vec::new(),
            base_score: 0.0,
            timeout: DEFAULT_TIMEOUT,
            retry_count: DEFAULT_RETRY_COUNT,
            required_apis: Vec::new(),
            required_models: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_triggers<I, S>(mut self, triggers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.triggers = triggers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_base_score(mut self, base_score: f64) -> Self {
        self.base_score = base_score;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn with_thinking_style(mut self, thinking_style: &str) -> Self {
        self.thinking_style = thinking_style.to_string();
        self
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_retry_count() -> u32 {
    DEFAULT_RETRY_COUNT
}

/// Serialize a `Duration` as whole milliseconds.
pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Result of an agent's cheap self-diagnostic.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct HealthReport {
    pub agent_id: String,
    pub healthy: bool,
    /// Named checks, e.g. `model:gpt-4o` or `api:openai`.
    pub checks: std::collections::BTreeMap<String, bool>,
}

impl HealthReport {
    /// Build a report whose `healthy` flag is the conjunction of all checks.
    pub fn from_checks(agent_id: &str, checks: std::collections::BTreeMap<String, bool>) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            healthy: checks.values().all(|ok| *ok),
            checks,
        }
    }
}

/// Static self-description used for discovery and admin listings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct Capabilities {
    pub agent_id: String,
    pub name: String,
    pub description: String,
    pub version: String,
    pub model: String,
    pub specializations: Vec<String>,
    pub triggers: Vec<String>,
    /// Implementation-specific details (supported languages and so on).
    #[serde(default)]
    pub extra: std::collections::BTreeMap<String, serde_json::Value>,
}

impl Capabilities {
    /// Describe an agent from its configuration alone.
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            agent_id: config.agent_id.clone(),
            name: config.name.clone(),
            description: config.description.clone(),
            version: config.version.clone(),
            model: config.model.clone(),
            specializations: config.tags.clone(),
            triggers: config.triggers.clone(),
            extra: Default::default(),
        }
    }
}
