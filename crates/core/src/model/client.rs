//! The `ModelClient` trait and its request/response types.

use async_trait::async_trait;
use dk_protocol::{AgentConfig, ErrorCode};
use std::time::Duration;
use thiserror::Error;

/// One generation request, resolved from an agent's configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub prompt: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl GenerateRequest {
    /// Build a request that uses the agent's model settings.
    pub fn from_config(prompt: String, config: &AgentConfig) -> Self {
        Self {
            prompt,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: config.timeout,
        }
    }
}

/// Text produced by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub content: String,
    /// Model that actually answered.
    pub model: String,
    pub tokens_used: Option<u32>,
}

impl Generation {
    pub fn new(content: impl Into<String>, model: &str) -> Self {
        Self {
            content: content.into(),
            model: model.to_string(),
            tokens_used: None,
        }
    }

    pub fn with_tokens(mut self, tokens: u32) -> Self {
        self.tokens_used = Some(tokens);
        self
    }
}

/// Backend failures an agent has to map into a response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// May succeed on a later attempt (network, rate limit, crash).
    #[error("Model backend failed: {0}")]
    Transient(String),

    /// Credentials were rejected. Retrying will not help.
    #[error("Model backend rejected credentials: {0}")]
    Auth(String),
}

impl ModelError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ModelError::Transient(_) => ErrorCode::ModelTransient,
            ModelError::Auth(_) => ErrorCode::ModelAuth,
        }
    }
}

/// Sends prompts to a language-model backend.
///
/// Implementations must be safe to call concurrently: the orchestrator
/// invokes many agents at once and they all share one client.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Short identifier used in logs and health output.
    fn name(&self) -> &str;

    /// Generate text for `request`.
    async fn generate(&self, request: GenerateRequest) -> Result<Generation, ModelError>;

    /// Whether the backend can serve `model`. Must not touch the network.
    fn supports_model(&self, _model: &str) -> bool {
        true
    }

    /// Whether the external `api` is reachable from this deployment.
    fn supports_api(&self, _api: &str) -> bool {
        false
    }
}
