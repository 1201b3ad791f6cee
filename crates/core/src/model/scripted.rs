//! Scripted backend for tests.

use crate::model::client::{GenerateRequest, Generation, ModelClient, ModelError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Backend that replays queued results in order.
///
/// Once the queue is empty every call returns the fallback result
/// (a `Transient` error unless [`ScriptedModelClient::with_fallback`] set one).
pub struct ScriptedModelClient {
    script: Mutex<VecDeque<Result<Generation, ModelError>>>,
    fallback: Result<Generation, ModelError>,
    latency: Option<Duration>,
    models: Vec<String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModelClient {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Err(ModelError::Transient("script exhausted".to_string())),
            latency: None,
            models: Vec::new(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A client that always answers `content`.
    pub fn always(content: &str) -> Self {
        Self::new().with_fallback(Ok(Generation::new(content, "scripted")))
    }

    pub fn then(self, result: Result<Generation, ModelError>) -> Self {
        self.script.lock().push_back(result);
        self
    }

    pub fn then_content(self, content: &str) -> Self {
        self.then(Ok(Generation::new(content, "scripted")))
    }

    pub fn with_fallback(mut self, result: Result<Generation, ModelError>) -> Self {
        self.fallback = result;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Models reported as supported. Empty means any.
    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every prompt received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

impl Default for ScriptedModelClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelClient for ScriptedModelClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: GenerateRequest) -> Result<Generation, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(request.prompt);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }

    fn supports_model(&self, model: &str) -> bool {
        self.models.is_empty() || self.models.iter().any(|m| m == model)
    }

    fn supports_api(&self, _api: &str) -> bool {
        true
    }
}
