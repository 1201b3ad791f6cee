//! Mock agent implementation for testing and offline demos.

use crate::agents::base::Agent;
use crate::agents::scoring::{clamp_score, KeywordScorer, Scorer};
use async_trait::async_trait;
use dk_protocol::{AgentConfig, AgentResponse, ErrorCode, HealthReport, RequestContext};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// What a [`MockAgent`] does when processed.
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Complete with this content.
    Respond(String),
    /// Return an `Error` response.
    Fail(ErrorCode, String),
    /// Panic inside `process`.
    Panic,
}

/// Scripted agent.
///
/// Scores with its configured keywords unless a fixed score is set, and
/// can be delayed, made flaky (fail the first N calls) or reported
/// unhealthy.
pub struct MockAgent {
    config: AgentConfig,
    behavior: MockBehavior,
    delay: Option<Duration>,
    fixed_score: Option<f64>,
    trace: Option<String>,
    healthy: bool,
    failures_before_success: AtomicU32,
    calls: AtomicUsize,
}

impl MockAgent {
    pub fn new(config: AgentConfig) -> Self {
        let content = format!("Mock response from {}", config.agent_id);
        Self {
            config,
            behavior: MockBehavior::Respond(content),
            delay: None,
            fixed_score: None,
            trace: None,
            healthy: true,
            failures_before_success: AtomicU32::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    /// An agent that always completes.
    pub fn success(agent_id: &str) -> Self {
        Self::new(mock_config(agent_id))
    }

    /// An agent that always fails with `EXECUTION_ERROR`.
    pub fn failing(agent_id: &str) -> Self {
        Self::success(agent_id).with_failure(ErrorCode::ExecutionError, "Mock failure")
    }

    /// An agent that completes but reports itself unhealthy.
    pub fn unavailable(agent_id: &str) -> Self {
        let mut agent = Self::success(agent_id);
        agent.healthy = false;
        agent
    }

    /// An agent whose `process` panics.
    pub fn panicking(agent_id: &str) -> Self {
        let mut agent = Self::success(agent_id);
        agent.behavior = MockBehavior::Panic;
        agent
    }

    pub fn with_response(mut self, content: &str) -> Self {
        self.behavior = MockBehavior::Respond(content.to_string());
        self
    }

    pub fn with_failure(mut self, code: ErrorCode, message: &str) -> Self {
        self.behavior = MockBehavior::Fail(code, message.to_string());
        self
    }

    /// Sleep this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Ignore keywords and always report `score`.
    pub fn with_score(mut self, score: f64) -> Self {
        self.fixed_score = Some(score);
        self
    }

    pub fn with_trace(mut self, trace: &str) -> Self {
        self.trace = Some(trace.to_string());
        self
    }

    /// Fail with `MODEL_TRANSIENT` on the first `failures` calls.
    pub fn with_flaky_failures(self, failures: u32) -> Self {
        self.failures_before_success.store(failures, Ordering::SeqCst);
        self
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn mock_config(agent_id: &str) -> AgentConfig {
    AgentConfig::new(agent_id, &format!("Mock {agent_id}"), "Mock agent for testing").with_model("mock-model")
}

#[async_trait]
impl Agent for MockAgent {
    fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn score(&self, message: &str, context: &RequestContext) -> f64 {
        match self.fixed_score {
            Some(score) => clamp_score(score),
            None => KeywordScorer::from_config(&self.config).score(message, context),
        }
    }

    async fn process(&self, _message: &str, _context: &RequestContext) -> AgentResponse {
        let started = Instant::now();
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let flaky = self
            .failures_before_success
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        let response = if flaky {
            AgentResponse::error(&self.config.agent_id, ErrorCode::ModelTransient, "Mock transient failure")
        } else {
            match &self.behavior {
                MockBehavior::Respond(content) => {
                    let response = AgentResponse::completed(&self.config.agent_id, content.clone(), &self.config.model);
                    match &self.trace {
                        Some(trace) => response.with_thinking_trace(trace.clone()),
                        None => response,
                    }
                }
                MockBehavior::Fail(code, message) => AgentResponse::error(&self.config.agent_id, *code, message.clone()),
                MockBehavior::Panic => panic!("mock agent '{}' panicked", self.config.agent_id),
            }
        };

        response.with_execution_time(started.elapsed())
    }

    async fn health(&self) -> HealthReport {
        let mut checks = BTreeMap::new();
        checks.insert("mock".to_string(), self.healthy);
        HealthReport::from_checks(&self.config.agent_id, checks)
    }
}
