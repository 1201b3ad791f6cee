//! Subprocess-backed model client.
//!
//! Runs a configured command (for example `ollama run {model}`), writes the
//! prompt to its stdin and reads the answer from stdout. Output may be plain
//! text or JSON Lines where each line is `{"content": "...", "tokens_used": n}`.

use crate::model::client::{GenerateRequest, Generation, ModelClient, ModelError};
use async_trait::async_trait;
use dk_protocol::BackendConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

static AUTH_FAILURE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?i)(unauthori[sz]ed|invalid api[ _-]?key|authentication failed|permission denied|\b401\b|\b403\b)").ok()
});

/// One JSON Lines record emitted by a streaming backend.
#[derive(Debug, Deserialize)]
struct OutputChunk {
    content: String,
    #[serde(default)]
    tokens_used: Option<u32>,
    #[serde(default)]
    model: Option<String>,
}

/// Model client that shells out to a local backend command.
#[derive(Debug, Clone)]
pub struct CommandModelClient {
    command: String,
    args: Vec<String>,
    models: Vec<String>,
    apis: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl CommandModelClient {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            models: Vec::new(),
            apis: Vec::new(),
            working_dir: None,
        }
    }

    /// Build a client from the `[backend]` config table.
    ///
    /// # Returns
    ///
    /// `None` when no command is configured.
    pub fn from_config(backend: &BackendConfig, available_apis: &[String]) -> Option<Self> {
        let command = backend.command.as_ref()?;
        Some(
            Self::new(command.clone())
                .with_args(backend.args.clone())
                .with_models(backend.models.clone())
                .with_apis(available_apis.to_vec()),
        )
    }

    /// Arguments. `{model}`, `{temperature}` and `{max_tokens}` are substituted per request.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Restrict the models this backend claims to serve. Empty means any.
    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }

    pub fn with_apis(mut self, apis: Vec<String>) -> Self {
        self.apis = apis;
        self
    }

    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }

    /// Whether the backend executable can be found on `PATH`.
    pub fn is_available(&self) -> bool {
        which::which(&self.command).is_ok()
    }

    fn resolved_args(&self, request: &GenerateRequest) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{model}", &request.model)
                    .replace("{temperature}", &request.temperature.to_string())
                    .replace("{max_tokens}", &request.max_tokens.to_string())
            })
            .collect()
    }
}

#[async_trait]
impl ModelClient for CommandModelClient {
    fn name(&self) -> &str {
        &self.command
    }

    async fn generate(&self, request: GenerateRequest) -> Result<Generation, ModelError> {
        let args = self.resolved_args(&request);
        debug!(command = %self.command, model = %request.model, "spawning model backend");

        let mut cmd = Command::new(&self.command);
        cmd.args(&args);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            ModelError::Transient(format!("Failed to spawn command '{}': {}", self.command, e))
        })?;

        // Feed stdin while draining stdout: a backend that echoes as it reads
        // blocks on a full stdout pipe otherwise.
        let stdin = child.stdin.take();
        let prompt = request.prompt.as_bytes();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                // A backend that ignores stdin closes the pipe early; that is not an error.
                if let Err(e) = stdin.write_all(prompt).await {
                    debug!(error = %e, "backend closed stdin before reading the prompt");
                }
            }
        };
        let run = async {
            let ((), output) = tokio::join!(feed, child.wait_with_output());
            output
        };

        let output = tokio::time::timeout(request.timeout, run)
            .await
            .map_err(|_| {
                ModelError::Transient(format!(
                    "'{}' did not finish within {}ms",
                    self.command,
                    request.timeout.as_millis()
                ))
            })?
            .map_err(|e| ModelError::Transient(format!("Failed to read backend output: {e}")))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            let detail = stderr.trim().to_string();
            if looks_like_auth_failure(&detail) {
                return Err(ModelError::Auth(detail));
            }
            return Err(ModelError::Transient(format!(
                "'{}' exited with {}: {}",
                self.command, output.status, detail
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_output(&stdout, &request.model))
    }

    fn supports_model(&self, model: &str) -> bool {
        self.models.is_empty() || self.models.iter().any(|m| m == model)
    }

    fn supports_api(&self, api: &str) -> bool {
        self.apis.iter().any(|a| a == api)
    }
}

fn looks_like_auth_failure(stderr: &str) -> bool {
    AUTH_FAILURE
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(stderr))
}

/// Decode backend stdout. JSON Lines chunks are concatenated; anything else
/// is taken as raw text.
fn parse_output(stdout: &str, requested_model: &str) -> Generation {
    let mut content = String::new();
    let mut tokens_used = None;
    let mut model = requested_model.to_string();
    let mut raw_lines = Vec::new();
    let mut saw_chunk = false;

    for line in stdout.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('{') {
            if let Ok(chunk) = serde_json::from_str::<OutputChunk>(trimmed) {
                content.push_str(&chunk.content);
                tokens_used = chunk.tokens_used.or(tokens_used);
                if let Some(m) = chunk.model {
                    model = m;
                }
                saw_chunk = true;
                continue;
            }
        }
        raw_lines.push(line);
    }

    if !saw_chunk {
        content = raw_lines.join("\n").trim().to_string();
    }

    Generation {
        content,
        model,
        tokens_used,
    }
}
