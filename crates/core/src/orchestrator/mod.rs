//! Concurrent dispatch and aggregation.
//!
//! The Orchestrator is the runtime's single entry point for answering a
//! request. It asks the router which agents should answer, invokes them
//! concurrently (one tokio task per agent), and merges whatever succeeded
//! into a single [`DispatchResult`].

pub mod invoke;
pub mod merge;
pub mod sink;
pub mod state;

pub use invoke::invoke_agent;
pub use merge::{merge, Merged, RankedResponse, SECTION_SEPARATOR};
pub use sink::{JsonlSink, PersistenceSink, SinkError};

use crate::agents::{AgentHook, HookList};
use crate::registry::AgentRegistry;
use crate::router::{CapabilityRouter, RouteError, RoutingDecision, RoutingPolicy};
use dk_protocol::{AgentResponse, DispatchResult, DispatchState, ErrorCode, Event, RequestContext};
use futures::future::join_all;
use serde_json::json;
use state::{create_dispatch, emit, fail_dispatch, transition, Dispatch};
use std::sync::Arc;
use tokio::sync::mpsc::Sender;
use tracing::{info, warn};

/// Agent id used on responses the orchestrator synthesizes itself.
pub const ORCHESTRATOR_ID: &str = "orchestrator";

/// Routes requests to agents and merges their answers.
///
/// # Example
///
/// ```rust,no_run
/// use dk_core::model::EchoModelClient;
/// use dk_core::orchestrator::Orchestrator;
/// use dk_core::registry::AgentRegistry;
/// use dk_core::router::RoutingPolicy;
/// use dk_protocol::RequestContext;
/// use std::sync::Arc;
///
/// # async fn example() {
/// let registry = Arc::new(AgentRegistry::with_builtins(Arc::new(EchoModelClient::new())));
/// let orchestrator = Orchestrator::new(registry, RoutingPolicy::default());
/// let result = orchestrator
///     .route_and_dispatch("write a function to add two numbers", &RequestContext::new())
///     .await;
/// println!("{}", result.content);
/// # }
/// ```
pub struct Orchestrator {
    registry: Arc<AgentRegistry>,
    router: CapabilityRouter,
    hooks: HookList,
    events_tx: Option<Sender<Event>>,
    sink: Option<Arc<dyn PersistenceSink>>,
}

impl Orchestrator {
    pub fn new(registry: Arc<AgentRegistry>, policy: RoutingPolicy) -> Self {
        Self {
            registry,
            router: CapabilityRouter::new(policy),
            hooks: HookList::new(),
            events_tx: None,
            sink: None,
        }
    }

    /// Append a hook. Hooks run in registration order.
    pub fn with_hook(mut self, hook: Arc<dyn AgentHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Send dispatch progress to `events_tx`.
    pub fn with_events(mut self, events_tx: Sender<Event>) -> Self {
        self.events_tx = Some(events_tx);
        self
    }

    /// Record every finished dispatch in `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn PersistenceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn router(&self) -> &CapabilityRouter {
        &self.router
    }

    /// Routing decision for `message` without invoking anything.
    pub fn route(&self, message: &str, context: &RequestContext) -> Result<RoutingDecision, RouteError> {
        self.router
            .select(message, context, &self.registry.enabled_snapshot())
    }

    /// Answer `message`.
    ///
    /// This never fails: per-agent failures are recorded in
    /// `per_agent_results`, and when nothing succeeds the result is `Failed`
    /// with a synthetic `ALL_AGENTS_FAILED` (or `NO_AGENT_AVAILABLE`)
    /// response in `failure`.
    ///
    /// Content and trace follow the router's selection order regardless of
    /// which agent finishes first.
    pub async fn route_and_dispatch(&self, message: &str, context: &RequestContext) -> DispatchResult {
        let mut dispatch = create_dispatch();
        let events_tx = self.events_tx.as_ref();
        info!(dispatch_id = %dispatch.id, message_chars = message.chars().count(), "dispatch started");

        emit(
            events_tx,
            Event::DispatchStarted {
                dispatch_id: dispatch.id,
                message: message.to_string(),
            },
        )
        .await;

        let decision = match self.route(message, context) {
            Ok(decision) => decision,
            Err(e) => {
                warn!(dispatch_id = %dispatch.id, error = %e, "no agent available");
                let failure = AgentResponse::error(ORCHESTRATOR_ID, ErrorCode::NoAgentAvailable, e.to_string());
                fail_dispatch(&mut dispatch, events_tx, e.to_string()).await;
                let result = failed_result(&dispatch, Vec::new(), Vec::new(), None, failure);
                self.persist(message, &result);
                return result;
            }
        };

        emit(
            events_tx,
            Event::AgentsSelected {
                dispatch_id: dispatch.id,
                agents: decision.agent_ids(),
                scores: decision.scores.clone(),
                fallback_used: decision.fallback_used,
            },
        )
        .await;
        transition(&mut dispatch, DispatchState::Dispatched);

        let mut results = self.dispatch_all(&dispatch, &decision, message, context).await;

        transition(&mut dispatch, DispatchState::Aggregating);
        merge::annotate(&mut results);
        let merged = merge(&results);
        let agents_used = decision.agent_ids();

        let result = match merged {
            Some(merged) => {
                transition(&mut dispatch, DispatchState::Completed);
                let total_time = dispatch.started.elapsed();
                emit(
                    events_tx,
                    Event::DispatchCompleted {
                        dispatch_id: dispatch.id,
                        agents_used: agents_used.clone(),
                        total_time_ms: total_time.as_millis() as u64,
                    },
                )
                .await;
                info!(
                    dispatch_id = %dispatch.id,
                    agents = ?agents_used,
                    total_time_ms = total_time.as_millis() as u64,
                    "dispatch completed"
                );
                DispatchResult {
                    dispatch_id: dispatch.id,
                    state: dispatch.state,
                    content: merged.content,
                    thinking_trace: merged.thinking_trace,
                    agents_used,
                    per_agent_results: results.into_iter().map(|r| r.response).collect(),
                    scores: decision.scores,
                    fallback_used: decision.fallback_used,
                    failure: None,
                    total_time,
                }
            }
            None => {
                let failure = merge::all_failed(&results);
                let error = failure.error_message().unwrap_or_default().to_string();
                warn!(dispatch_id = %dispatch.id, error = %error, "all agents failed");
                fail_dispatch(&mut dispatch, events_tx, error).await;
                failed_result(
                    &dispatch,
                    agents_used,
                    results.into_iter().map(|r| r.response).collect(),
                    Some(&decision),
                    failure,
                )
            }
        };

        self.persist(message, &result);
        result
    }

    /// Run every selected agent on its own task and collect the responses
    /// in selection order.
    async fn dispatch_all(
        &self,
        dispatch: &Dispatch,
        decision: &RoutingDecision,
        message: &str,
        context: &RequestContext,
    ) -> Vec<RankedResponse> {
        let message: Arc<str> = Arc::from(message);
        let context = Arc::new(context.clone());

        let handles: Vec<_> = decision
            .selected
            .iter()
            .map(|selected| {
                let agent = Arc::clone(&selected.entry.agent);
                let message = Arc::clone(&message);
                let context = Arc::clone(&context);
                let hooks = self.hooks.clone();
                let events_tx = self.events_tx.clone();
                let dispatch_id = dispatch.id;
                tokio::spawn(async move {
                    let response = invoke_agent(agent, message, context, hooks).await;
                    emit(events_tx.as_ref(), finished_event(dispatch_id, &response)).await;
                    response
                })
            })
            .collect();

        let joined = join_all(handles).await;

        let mut results = Vec::with_capacity(joined.len());
        for (selected, outcome) in decision.selected.iter().zip(joined) {
            let config = &selected.entry.config;
            let response = match outcome {
                Ok(response) => response,
                Err(e) => {
                    let code = if e.is_panic() {
                        ErrorCode::AgentPanicked
                    } else {
                        ErrorCode::ExecutionError
                    };
                    warn!(dispatch_id = %dispatch.id, agent_id = %config.agent_id, error = %e, "agent task aborted");
                    let response = AgentResponse::error(&config.agent_id, code, format!("Agent task aborted: {e}"))
                        .with_model_used(&config.model)
                        .with_metadata("attempts", json!(1));
                    self.hooks.fire_finish(&response);
                    emit(self.events_tx.as_ref(), finished_event(dispatch.id, &response)).await;
                    response
                }
            };
            results.push(RankedResponse {
                name: config.name.clone(),
                response,
            });
        }
        results
    }

    /// Hand `result` to the sink without waiting for it.
    fn persist(&self, message: &str, result: &DispatchResult) {
        let Some(sink) = self.sink.clone() else {
            return;
        };
        let message = message.to_string();
        let result = result.clone();
        tokio::spawn(async move {
            if let Err(e) = sink.record(&message, &result).await {
                warn!(dispatch_id = %result.dispatch_id, error = %e, "failed to persist dispatch");
            }
        });
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("registry", &self.registry)
            .field("policy", self.router.policy())
            .field("hooks", &self.hooks.len())
            .field("events", &self.events_tx.is_some())
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

fn finished_event(dispatch_id: uuid::Uuid, response: &AgentResponse) -> Event {
    Event::AgentFinished {
        dispatch_id,
        agent_id: response.agent_id().to_string(),
        status: response.status(),
        error_code: response.error_code(),
        execution_time_ms: response.execution_time().as_millis() as u64,
    }
}

fn failed_result(
    dispatch: &Dispatch,
    agents_used: Vec<String>,
    per_agent_results: Vec<AgentResponse>,
    decision: Option<&RoutingDecision>,
    failure: AgentResponse,
) -> DispatchResult {
    DispatchResult {
        dispatch_id: dispatch.id,
        state: dispatch.state,
        content: String::new(),
        thinking_trace: String::new(),
        agents_used,
        per_agent_results,
        scores: decision.map(|d| d.scores.clone()).unwrap_or_default(),
        fallback_used: decision.is_some_and(|d| d.fallback_used),
        failure: Some(failure),
        total_time: dispatch.started.elapsed(),
    }
}
