//! Agent invocation results.
//!
//! An `AgentResponse` is the only thing an agent ever hands back to the
//! orchestrator. Failures are values, not panics or errors, so every
//! response carries a status and, when the status is not `Completed`, a
//! machine-readable error code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use ts_rs::TS;

use crate::agent_models::duration_ms;

/// Terminal status of one agent invocation.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentStatus {
    /// The agent produced content.
    Completed,

    /// The agent failed. `error_code` says why.
    Error,

    /// The per-attempt deadline elapsed before the agent answered.
    Timeout,
}

/// Stable error codes carried by non-completed responses.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The request was rejected before any backend call.
    InvalidInput,
    /// Generic processing failure inside the agent.
    ExecutionError,
    /// The model backend failed in a way that may succeed on retry.
    ModelTransient,
    /// The model backend rejected the credentials.
    ModelAuth,
    /// Deadline exceeded.
    Timeout,
    /// The backend answered with nothing.
    EmptyResponse,
    /// The agent task panicked.
    AgentPanicked,
    /// Aggregation found zero successful responses.
    AllAgentsFailed,
    /// The router had nothing to select.
    NoAgentAvailable,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::ExecutionError => "EXECUTION_ERROR",
            ErrorCode::ModelTransient => "MODEL_TRANSIENT",
            ErrorCode::ModelAuth => "MODEL_AUTH",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::EmptyResponse => "EMPTY_RESPONSE",
            ErrorCode::AgentPanicked => "AGENT_PANICKED",
            ErrorCode::AllAgentsFailed => "ALL_AGENTS_FAILED",
            ErrorCode::NoAgentAvailable => "NO_AGENT_AVAILABLE",
        }
    }

    /// Whether a response with this code is worth another attempt.
    ///
    /// Every error is retried up to `retry_count` except `INVALID_INPUT` and
    /// `MODEL_AUTH`, which a repeat cannot change, and `TIMEOUT`, which is final.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ErrorCode::InvalidInput | ErrorCode::ModelAuth | ErrorCode::Timeout
        )
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed output attached to a response (code block, analysis, file).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct Artifact {
    #[serde(rename = "type")]
    pub artifact_type: String,

    /// Opaque payload.
    pub data: serde_json::Value,

    #[serde(default)]
    pub description: String,

    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    pub fn new(artifact_type: &str, data: serde_json::Value, description: &str) -> Self {
        Self {
            artifact_type: artifact_type.to_string(),
            data,
            description: description.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Result of one agent invocation.
///
/// Fields are private so the status invariant holds: a `Completed`
/// response has content and no error fields, any other status has an
/// error code and message and empty content. Build one through
/// [`AgentResponse::completed`], [`AgentResponse::error`] or
/// [`AgentResponse::timeout`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct AgentResponse {
    agent_id: String,
    content: String,
    status: AgentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thinking_trace: Option<String>,
    #[serde(rename = "execution_time_ms", with = "duration_ms")]
    #[ts(type = "number")]
    execution_time: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tokens_used: Option<u32>,
    #[serde(default)]
    model_used: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_code: Option<ErrorCode>,
    #[serde(default)]
    metadata: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    artifacts: Vec<Artifact>,
    #[ts(type = "string")]
    timestamp: DateTime<Utc>,
}

impl AgentResponse {
    /// A successful response.
    pub fn completed(agent_id: &str, content: impl Into<String>, model_used: &str) -> Self {
        Self::base(agent_id, AgentStatus::Completed, content.into(), model_used)
    }

    /// A failed response with a stable code and a human-readable message.
    pub fn error(agent_id: &str, code: ErrorCode, message: impl Into<String>) -> Self {
        let mut response = Self::base(agent_id, AgentStatus::Error, String::new(), "");
        response.error_code = Some(code);
        response.error_message = Some(message.into());
        response
    }

    /// A response recording that the deadline `after` elapsed.
    pub fn timeout(agent_id: &str, after: Duration) -> Self {
        let mut response = Self::base(agent_id, AgentStatus::Timeout, String::new(), "");
        response.error_code = Some(ErrorCode::Timeout);
        response.error_message = Some(format!("agent did not answer within {}ms", after.as_millis()));
        response.execution_time = after;
        response
    }

    fn base(agent_id: &str, status: AgentStatus, content: String, model_used: &str) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            content,
            status,
            thinking_trace: None,
            execution_time: Duration::ZERO,
            tokens_used: None,
            model_used: model_used.to_string(),
            error_message: None,
            error_code: None,
            metadata: BTreeMap::new(),
            artifacts: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_thinking_trace(mut self, trace: impl Into<String>) -> Self {
        let trace = trace.into();
        self.thinking_trace = if trace.is_empty() { None } else { Some(trace) };
        self
    }

    pub fn with_tokens_used(mut self, tokens: Option<u32>) -> Self {
        self.tokens_used = tokens;
        self
    }

    pub fn with_model_used(mut self, model: &str) -> Self {
        self.model_used = model.to_string();
        self
    }

    pub fn with_execution_time(mut self, elapsed: Duration) -> Self {
        self.execution_time = elapsed;
        self
    }

    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    pub fn with_metadata(mut self, key: &str, value: serde_json::Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    /// Overwrite the measured execution time.
    pub fn set_execution_time(&mut self, elapsed: Duration) {
        self.execution_time = elapsed;
    }

    pub fn insert_metadata(&mut self, key: &str, value: serde_json::Value) {
        self.metadata.insert(key.to_string(), value);
    }

    pub fn is_success(&self) -> bool {
        self.status == AgentStatus::Completed
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn status(&self) -> AgentStatus {
        self.status
    }

    pub fn thinking_trace(&self) -> Option<&str> {
        self.thinking_trace.as_deref()
    }

    pub fn execution_time(&self) -> Duration {
        self.execution_time
    }

    pub fn tokens_used(&self) -> Option<u32> {
        self.tokens_used
    }

    pub fn model_used(&self) -> &str {
        &self.model_used
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error_code
    }

    pub fn metadata(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.metadata
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
