//! Generic persona agent.
//!
//! Builds a prompt from the agent's persona, recent conversation history and
//! the user message, then asks the model backend for an answer.

use crate::agents::base::{respond, validate_input, Agent, AgentError};
use crate::agents::scoring::{KeywordScorer, Scorer};
use crate::model::{GenerateRequest, ModelClient};
use async_trait::async_trait;
use dk_protocol::{AgentConfig, AgentResponse, HealthReport, RequestContext};
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// How many earlier turns are replayed into the prompt.
pub const HISTORY_TURNS: usize = 10;

/// Agent whose behaviour is entirely defined by its configuration.
pub struct PromptAgent {
    config: AgentConfig,
    client: Arc<dyn ModelClient>,
    scorer: Box<dyn Scorer>,
}

impl PromptAgent {
    /// Create a prompt agent that scores with its own triggers and tags.
    pub fn new(config: AgentConfig, client: Arc<dyn ModelClient>) -> Self {
        let scorer = Box::new(KeywordScorer::from_config(&config));
        Self { config, client, scorer }
    }

    /// Replace the relevance strategy.
    pub fn with_scorer(mut self, scorer: impl Scorer + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    /// Render the full prompt sent to the backend.
    ///
    /// A configured `system_prompt` replaces the generated persona. History
    /// is limited to the last [`HISTORY_TURNS`] turns, oldest first, and the
    /// user message is always the final line.
    pub fn build_prompt(&self, message: &str, context: &RequestContext) -> String {
        let mut prompt = persona(&self.config);
        append_history(&mut prompt, context);
        let _ = write!(prompt, "\n\nUser: {}", message.trim());
        prompt
    }

    async fn answer(&self, message: &str, context: &RequestContext) -> Result<AgentResponse, AgentError> {
        validate_input(message)?;

        let prompt = self.build_prompt(message, context);
        let request = GenerateRequest::from_config(prompt, &self.config);
        debug!(agent_id = %self.config.agent_id, model = %request.model, "calling model backend");

        let generation = self.client.generate(request).await?;
        if generation.content.trim().is_empty() {
            return Err(AgentError::EmptyResponse);
        }

        let trace = format!(
            "[{}] Answering as {} with {} earlier turn(s) in context",
            self.config.name,
            self.config.description.to_lowercase(),
            context.history.len().min(HISTORY_TURNS),
        );

        Ok(AgentResponse::completed(&self.config.agent_id, generation.content, &generation.model)
            .with_thinking_trace(trace)
            .with_tokens_used(generation.tokens_used))
    }
}

/// Persona preamble for an agent.
pub(crate) fn persona(config: &AgentConfig) -> String {
    if let Some(system) = config.system_prompt.as_deref().map(str::trim) {
        if !system.is_empty() {
            return system.to_string();
        }
    }

    let mut text = format!(
        "You are {}, a specialized AI assistant.\n\nYour role is to help with: {}",
        config.name, config.description
    );
    if !config.thinking_style.is_empty() {
        let _ = write!(text, "\n\nYour thinking style: {}", config.thinking_style);
    }
    text
}

/// Append the most recent history turns to `prompt`.
pub(crate) fn append_history(prompt: &mut String, context: &RequestContext) {
    let skip = context.history.len().saturating_sub(HISTORY_TURNS);
    let recent = &context.history[skip..];
    if recent.is_empty() {
        return;
    }
    prompt.push_str("\n\nConversation so far:");
    for turn in recent {
        let _ = write!(prompt, "\nUser: {}\nAssistant: {}", turn.user, turn.assistant);
    }
}

#[async_trait]
impl Agent for PromptAgent {
    fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn score(&self, message: &str, context: &RequestContext) -> f64 {
        self.scorer.score(message, context)
    }

    async fn process(&self, message: &str, context: &RequestContext) -> AgentResponse {
        let started = Instant::now();
        let result = self.answer(message, context).await;
        respond(&self.config, started, result)
    }

    async fn health(&self) -> HealthReport {
        super::dependency_health(&self.config, self.client.as_ref())
    }
}
