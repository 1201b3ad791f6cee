//! Request context, routing scores and dispatch results.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use ts_rs::TS;
use uuid::Uuid;

use crate::agent_models::{duration_ms, AgentConfig};
use crate::response_models::AgentResponse;

/// One earlier exchange in the conversation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct HistoryTurn {
    pub user: String,
    pub assistant: String,
}

/// Caller-supplied context that travels with a request.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, TS)]
pub struct RequestContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,

    /// Oldest first.
    #[serde(default)]
    pub history: Vec<HistoryTurn>,

    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_conversation_id(mut self, id: &str) -> Self {
        self.conversation_id = Some(id.to_string());
        self
    }

    pub fn with_turn(mut self, user: &str, assistant: &str) -> Self {
        self.history.push(HistoryTurn {
            user: user.to_string(),
            assistant: assistant.to_string(),
        });
        self
    }

    pub fn with_metadata(mut self, key: &str, value: serde_json::Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

/// Lifecycle of a single dispatch.
///
/// `Pending -> Dispatched -> Aggregating -> Completed`, or `Failed` from
/// `Dispatched` / `Aggregating`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchState {
    Pending,
    Dispatched,
    Aggregating,
    Completed,
    Failed,
}

impl DispatchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DispatchState::Completed | DispatchState::Failed)
    }
}

/// Relevance score computed for one enabled agent.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct AgentScore {
    pub agent_id: String,
    pub score: f64,
}

/// Final outcome of `route_and_dispatch`.
#[derive(Serialize, Deserialize, Debug, Clone, TS)]
pub struct DispatchResult {
    #[ts(type = "string")]
    pub dispatch_id: Uuid,

    /// Always `Completed` or `Failed`.
    pub state: DispatchState,

    /// Merged answer. Empty when the dispatch failed.
    pub content: String,

    /// Attributed traces of the successful agents, in selection order.
    pub thinking_trace: String,

    /// Selected agents in selection order.
    pub agents_used: Vec<String>,

    /// One response per selected agent, in selection order.
    pub per_agent_results: Vec<AgentResponse>,

    /// Every enabled agent's score, sorted the way the router ranked them.
    #[serde(default)]
    pub scores: Vec<AgentScore>,

    /// True when no agent reached the threshold and the default agent ran.
    #[serde(default)]
    pub fallback_used: bool,

    /// Synthetic summary response when `state == Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<AgentResponse>,

    #[serde(rename = "total_time_ms", with = "duration_ms")]
    #[ts(type = "number")]
    pub total_time: Duration,
}

impl DispatchResult {
    pub fn is_success(&self) -> bool {
        self.state == DispatchState::Completed
    }

    /// Sum of reported tokens across all agents.
    pub fn total_tokens(&self) -> u32 {
        self.per_agent_results
            .iter()
            .filter_map(|r| r.tokens_used())
            .sum()
    }
}

/// Where a registry entry came from.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AgentSource {
    /// Compiled into the binary and registered in code.
    Builtin,
    /// Installed from a package directory.
    Package { path: PathBuf },
}

impl std::fmt::Display for AgentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentSource::Builtin => f.write_str("builtin"),
            AgentSource::Package { path } => write!(f, "{}", path.display()),
        }
    }
}

/// One row of `AgentRegistry::list`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct AgentListing {
    pub agent_id: String,
    pub config: AgentConfig,
    pub enabled: bool,
    pub source: AgentSource,
}

/// Aggregate counters over the registry.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, TS)]
pub struct RegistryStatistics {
    pub total_agents: usize,
    pub enabled_agents: usize,
    pub disabled_agents: usize,
    pub builtin_agents: usize,
    pub package_agents: usize,
    /// Agent count per tag.
    pub tags: BTreeMap<String, usize>,
}
