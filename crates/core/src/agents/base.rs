//! Base Agent trait and supporting types.

use crate::model::ModelError;
use async_trait::async_trait;
use dk_protocol::{AgentConfig, AgentResponse, Capabilities, ErrorCode, HealthReport, RequestContext};
use std::time::Instant;
use thiserror::Error;

/// Longest message an agent accepts, in characters.
pub const MAX_INPUT_CHARS: usize = 10_000;

/// Failures inside an agent's own processing.
///
/// These never leave an agent as errors: [`respond`] turns them into an
/// `AgentResponse` with `status = Error`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("Model returned an empty response")]
    EmptyResponse,
    #[error("Execution failed: {0}")]
    ExecutionError(String),
}

impl AgentError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AgentError::InvalidInput(_) => ErrorCode::InvalidInput,
            AgentError::Model(e) => e.code(),
            AgentError::EmptyResponse => ErrorCode::EmptyResponse,
            AgentError::ExecutionError(_) => ErrorCode::ExecutionError,
        }
    }
}

/// Capability contract every agent implements.
///
/// `score`, `health` and `capabilities` are cheap and side-effect free.
/// `process` does the real work and reports every failure inside the
/// returned response instead of panicking. Implementations are shared
/// across concurrent dispatches, so `process` must be safe to call from
/// many tasks at once.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Static identity and policy.
    fn config(&self) -> &AgentConfig;

    fn agent_id(&self) -> &str {
        &self.config().agent_id
    }

    /// Relevance of `message` to this agent, in `[0, 1]`. Must not do I/O.
    fn score(&self, message: &str, context: &RequestContext) -> f64;

    /// Handle the request.
    async fn process(&self, message: &str, context: &RequestContext) -> AgentResponse;

    /// Self-diagnostic. Never calls `process`.
    async fn health(&self) -> HealthReport;

    /// Static self-description for discovery and admin listings.
    fn capabilities(&self) -> Capabilities {
        Capabilities::from_config(self.config())
    }
}

/// Reject empty or oversized messages before any backend call.
pub fn validate_input(message: &str) -> Result<(), AgentError> {
    if message.trim().is_empty() {
        return Err(AgentError::InvalidInput("Message cannot be empty".to_string()));
    }
    let chars = message.chars().count();
    if chars > MAX_INPUT_CHARS {
        return Err(AgentError::InvalidInput(format!(
            "Message too long ({chars} characters, limit {MAX_INPUT_CHARS})"
        )));
    }
    Ok(())
}

/// Finish an invocation: map an error into a response and stamp the
/// elapsed time since `started`.
pub fn respond(config: &AgentConfig, started: Instant, result: Result<AgentResponse, AgentError>) -> AgentResponse {
    let response = match result {
        Ok(response) => response,
        Err(e) => AgentResponse::error(&config.agent_id, e.code(), e.to_string()).with_model_used(&config.model),
    };
    response.with_execution_time(started.elapsed())
}
