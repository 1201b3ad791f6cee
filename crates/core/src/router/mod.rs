//! Capability-based routing.
//!
//! The router scores every enabled agent and picks the ones that should
//! answer. Selection depends only on `(message, context, snapshot)`.

use crate::agents::clamp_score;
use crate::registry::RegistryEntry;
use dk_protocol::{AgentScore, DispatchConfig, RequestContext, DEFAULT_AGENT, DEFAULT_THRESHOLD};
use std::cmp::Ordering;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Snapshots at least this large are scored across scoped threads.
const PARALLEL_SCORING_MIN: usize = 16;

/// Routing failures. Both mean the deployment is misconfigured.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("No agents are enabled")]
    NoEnabledAgents,

    #[error("No agent reached the threshold and default agent '{0}' is not enabled")]
    NoDefaultAgent(String),
}

/// Selection parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingPolicy {
    /// Minimum score, inclusive.
    pub threshold: f64,
    /// Cap on selected agents. `None` means no cap beyond the registry size.
    pub max_agents: Option<usize>,
    /// Agent used when nothing reaches the threshold.
    pub default_agent: String,
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            max_agents: None,
            default_agent: DEFAULT_AGENT.to_string(),
        }
    }
}

impl From<&DispatchConfig> for RoutingPolicy {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            threshold: config.threshold,
            max_agents: config.max_agents,
            default_agent: config.default_agent.clone(),
        }
    }
}

/// One agent chosen to answer.
#[derive(Debug, Clone)]
pub struct SelectedAgent {
    pub entry: Arc<RegistryEntry>,
    pub score: f64,
}

impl SelectedAgent {
    pub fn agent_id(&self) -> &str {
        self.entry.agent_id()
    }
}

/// Output of [`CapabilityRouter::select`].
#[derive(Debug, Clone)]
pub struct RoutingDecision {
    /// Never empty. In selection order.
    pub selected: Vec<SelectedAgent>,
    /// Every scored agent, best first, ties broken by `agent_id`.
    pub scores: Vec<AgentScore>,
    /// No agent reached the threshold; the default agent was used.
    pub fallback_used: bool,
}

impl RoutingDecision {
    pub fn agent_ids(&self) -> Vec<String> {
        self.selected
            .iter()
            .map(|s| s.agent_id().to_string())
            .collect()
    }
}

/// Scores enabled agents and selects the subset to invoke.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRouter {
    policy: RoutingPolicy,
}

impl CapabilityRouter {
    pub fn new(policy: RoutingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RoutingPolicy {
        &self.policy
    }

    /// Select the agents that should answer `message`.
    ///
    /// 1. Score every agent in `snapshot`, clamped to `[0, 1]`.
    /// 2. Keep agents scoring at least the threshold.
    /// 3. If none qualify, fall back to the default agent.
    /// 4. Cap at `max_agents`.
    ///
    /// Ordering is by score, descending, then `agent_id`, ascending.
    ///
    /// # Errors
    ///
    /// * `NoEnabledAgents` - `snapshot` is empty
    /// * `NoDefaultAgent` - Fallback was needed but the default agent is not in `snapshot`
    pub fn select(
        &self,
        message: &str,
        context: &RequestContext,
        snapshot: &[Arc<RegistryEntry>],
    ) -> Result<RoutingDecision, RouteError> {
        if snapshot.is_empty() {
            return Err(RouteError::NoEnabledAgents);
        }

        let raw = score_all(message, context, snapshot);
        let mut ranked: Vec<SelectedAgent> = snapshot
            .iter()
            .zip(raw)
            .map(|(entry, score)| SelectedAgent {
                entry: Arc::clone(entry),
                score,
            })
            .collect();
        ranked.sort_by(|a, b| rank(a, b));

        let scores = ranked
            .iter()
            .map(|s| AgentScore {
                agent_id: s.agent_id().to_string(),
                score: s.score,
            })
            .collect();

        let mut selected: Vec<SelectedAgent> = ranked
            .iter()
            .filter(|s| s.score >= self.policy.threshold)
            .cloned()
            .collect();

        let fallback_used = selected.is_empty();
        if fallback_used {
            let default = ranked
                .iter()
                .find(|s| s.agent_id() == self.policy.default_agent)
                .cloned()
                .ok_or_else(|| RouteError::NoDefaultAgent(self.policy.default_agent.clone()))?;
            selected.push(default);
        }

        let cap = self.policy.max_agents.unwrap_or(usize::MAX).max(1);
        selected.truncate(cap);

        debug!(
            selected = ?selected.iter().map(SelectedAgent::agent_id).collect::<Vec<_>>(),
            fallback_used,
            "routing decision"
        );

        Ok(RoutingDecision {
            selected,
            scores,
            fallback_used,
        })
    }
}

fn rank(a: &SelectedAgent, b: &SelectedAgent) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.agent_id().cmp(b.agent_id()))
}

/// Scores in snapshot order.
fn score_all(message: &str, context: &RequestContext, snapshot: &[Arc<RegistryEntry>]) -> Vec<f64> {
    if snapshot.len() < PARALLEL_SCORING_MIN {
        return snapshot
            .iter()
            .map(|entry| safe_score(entry, message, context))
            .collect();
    }

    let workers = std::thread::available_parallelism()
        .map(usize::from)
        .unwrap_or(4)
        .min(snapshot.len());
    let chunk_size = snapshot.len().div_ceil(workers);

    std::thread::scope(|scope| {
        let handles: Vec<_> = snapshot
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move || {
                    chunk
                        .iter()
                        .map(|entry| safe_score(entry, message, context))
                        .collect::<Vec<f64>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .zip(snapshot.chunks(chunk_size))
            .flat_map(|(handle, chunk)| handle.join().unwrap_or_else(|_| vec![0.0; chunk.len()]))
            .collect()
    })
}

/// A panicking scorer counts as zero relevance.
fn safe_score(entry: &RegistryEntry, message: &str, context: &RequestContext) -> f64 {
    match catch_unwind(AssertUnwindSafe(|| entry.agent.score(message, context))) {
        Ok(score) => clamp_score(score),
        Err(_) => {
            warn!(agent_id = %entry.agent_id(), "score panicked; treating as 0");
            0.0
        }
    }
}
