//! Offline backend used when no backend command is configured.

use crate::model::client::{GenerateRequest, Generation, ModelClient, ModelError};
use async_trait::async_trait;

/// Deterministic backend that answers with the request line of the prompt.
///
/// Useful for demos, `dispatch ask` without a configured backend, and
/// tests that need real agents but no network.
#[derive(Debug, Clone, Default)]
pub struct EchoModelClient {
    apis: Vec<String>,
}

impl EchoModelClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_apis(mut self, apis: Vec<String>) -> Self {
        self.apis = apis;
        self
    }
}

#[async_trait]
impl ModelClient for EchoModelClient {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, request: GenerateRequest) -> Result<Generation, ModelError> {
        let request_line = request
            .prompt
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default();

        let content = format!("[{}] {}", request.model, request_line);
        let tokens = u32::try_from(request.prompt.split_whitespace().count()).unwrap_or(u32::MAX);

        Ok(Generation::new(content, &request.model).with_tokens(tokens))
    }

    fn supports_api(&self, api: &str) -> bool {
        self.apis.iter().any(|a| a == api)
    }
}
