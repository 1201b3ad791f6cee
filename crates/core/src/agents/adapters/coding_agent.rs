//! Software development specialist.
//!
//! Adds code-shaped heuristics on top of keyword scoring, analyses the
//! task before prompting, and attaches the analysis and any fenced code
//! blocks in the answer as artifacts.

use crate::agents::adapters::prompt_agent::{append_history, persona};
use crate::agents::base::{respond, validate_input, Agent, AgentError};
use crate::agents::scoring::{KeywordScorer, PatternScorer, ScoreChain, Scorer};
use crate::model::{GenerateRequest, ModelClient};
use async_trait::async_trait;
use dk_protocol::{AgentConfig, AgentResponse, Artifact, Capabilities, HealthReport, RequestContext};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "python", "javascript", "typescript", "java", "c++", "c#", "go", "rust", "ruby", "php", "swift",
    "kotlin", "scala", "sql",
];

const DEFAULT_LANGUAGE: &str = "python";

/// Code-shaped text that raises the score even without keyword hits.
const CODE_PATTERNS: &[(&str, f64)] = &[
    (r"```", 0.25),
    (r"\b(def|fn|func|function|class|impl)\s+\w+", 0.2),
    (r"\w+\([^)]*\)\s*[{:;]", 0.15),
    (r"\b(traceback|stack trace|exception|segfault|panicked at)\b", 0.15),
];

static CODE_BLOCK: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?s)```([\w+#-]*)\n(.*?)```").ok());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Debug,
    Implement,
    Optimize,
    Review,
    Test,
    Explain,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Medium,
    Complex,
}

/// What the coding agent inferred about a request before prompting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskAnalysis {
    pub task_type: TaskType,
    pub language: String,
    pub complexity: Complexity,
    pub requires_tests: bool,
    pub has_existing_code: bool,
}

fn words(message: &str) -> HashSet<String> {
    message
        .split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Classify a coding request. Pure and cheap.
pub fn analyze_task(message: &str) -> TaskAnalysis {
    let words = words(message);
    let any = |keywords: &[&str]| keywords.iter().any(|k| words.contains(*k));

    let task_types: [(TaskType, &[&str]); 6] = [
        (TaskType::Debug, &["debug", "fix", "error", "bug", "issue", "broken"]),
        (TaskType::Implement, &["implement", "create", "build", "write", "develop", "generate"]),
        (TaskType::Optimize, &["optimize", "improve", "refactor", "performance"]),
        (TaskType::Review, &["review", "check", "analyze", "evaluate"]),
        (TaskType::Test, &["test", "tests", "testing", "pytest"]),
        (TaskType::Explain, &["explain", "understand", "documentation"]),
    ];
    let task_type = task_types
        .iter()
        .find(|(_, keywords)| any(*keywords))
        .map_or(TaskType::General, |(task_type, _)| *task_type);

    let language = SUPPORTED_LANGUAGES
        .iter()
        .find(|lang| words.contains(**lang))
        .copied()
        .unwrap_or(DEFAULT_LANGUAGE)
        .to_string();

    // Later levels win, so "a simple system" is complex.
    let mut complexity = Complexity::Medium;
    if any(&["simple", "basic", "easy", "quick", "small"]) {
        complexity = Complexity::Simple;
    }
    if any(&["function", "class", "module", "script"]) {
        complexity = Complexity::Medium;
    }
    if any(&["system", "application", "framework", "architecture", "complex", "advanced"]) {
        complexity = Complexity::Complex;
    }

    TaskAnalysis {
        task_type,
        language,
        complexity,
        requires_tests: any(&["test", "tests", "testing"]),
        has_existing_code: message.contains("```") || message.contains("def ") || message.contains("fn "),
    }
}

/// Extract fenced code blocks as `(language, code)` pairs.
pub fn extract_code_blocks(content: &str) -> Vec<(String, String)> {
    let Some(pattern) = CODE_BLOCK.as_ref() else {
        return Vec::new();
    };
    pattern
        .captures_iter(content)
        .map(|caps| {
            let language = caps.get(1).map_or("", |m| m.as_str()).to_string();
            let code = caps.get(2).map_or("", |m| m.as_str()).to_string();
            (language, code)
        })
        .collect()
}

fn code_heuristics() -> PatternScorer {
    CODE_PATTERNS.iter().fold(PatternScorer::new(), |scorer, (pattern, weight)| {
        match scorer.clone().with_pattern(pattern, *weight) {
            Ok(extended) => extended,
            Err(e) => {
                warn!(pattern, error = %e, "skipping invalid code heuristic");
                scorer
            }
        }
    })
}

/// Agent specialised in writing, fixing and reviewing code.
pub struct CodingAgent {
    config: AgentConfig,
    client: Arc<dyn ModelClient>,
    scorer: ScoreChain,
}

impl CodingAgent {
    pub fn new(config: AgentConfig, client: Arc<dyn ModelClient>) -> Self {
        let scorer = ScoreChain::new()
            .with(KeywordScorer::from_config(&config))
            .with(code_heuristics());
        Self { config, client, scorer }
    }

    /// Render the prompt for an analysed task.
    pub fn build_prompt(&self, message: &str, analysis: &TaskAnalysis, context: &RequestContext) -> String {
        let mut prompt = persona(&self.config);
        let _ = write!(
            prompt,
            "\n\nYou are working as an expert {} developer.\nTask type: {:?}\nComplexity: {:?}",
            analysis.language, analysis.task_type, analysis.complexity
        );
        prompt.push_str(match analysis.task_type {
            TaskType::Debug => "\nIdentify the root cause before proposing a fix.",
            TaskType::Optimize => "\nExplain the bottleneck and measure the improvement.",
            TaskType::Review => "\nCheck correctness, security and readability.",
            TaskType::Explain => "\nExplain step by step with small examples.",
            _ => "\nRespond with complete, runnable code in fenced blocks and a short explanation.",
        });
        if analysis.requires_tests {
            prompt.push_str("\nInclude tests.");
        }
        append_history(&mut prompt, context);
        let _ = write!(prompt, "\n\nUser: {}", message.trim());
        prompt
    }

    fn trace(&self, message: &str, analysis: &TaskAnalysis) -> String {
        let preview: String = message.chars().take(100).collect();
        let mut lines = vec![
            format!("Analyzing coding request: '{preview}'"),
            format!("Task type: {:?}", analysis.task_type),
            format!("Language: {}", analysis.language),
            format!("Complexity: {:?}", analysis.complexity),
        ];
        if analysis.has_existing_code {
            lines.push("Existing code detected".to_string());
        }
        if analysis.requires_tests {
            lines.push("Including test cases".to_string());
        }
        format!("[{}] {}", self.config.name, lines.join("\n"))
    }

    async fn answer(&self, message: &str, context: &RequestContext) -> Result<AgentResponse, AgentError> {
        validate_input(message)?;

        let analysis = analyze_task(message);
        debug!(agent_id = %self.config.agent_id, ?analysis, "analysed coding task");

        let prompt = self.build_prompt(message, &analysis, context);
        let generation = self
            .client
            .generate(GenerateRequest::from_config(prompt, &self.config))
            .await?;
        if generation.content.trim().is_empty() {
            return Err(AgentError::EmptyResponse);
        }

        let analysis_json = serde_json::to_value(&analysis)
            .map_err(|e| AgentError::ExecutionError(format!("Failed to encode task analysis: {e}")))?;

        let mut response = AgentResponse::completed(&self.config.agent_id, generation.content.clone(), &generation.model)
            .with_thinking_trace(self.trace(message, &analysis))
            .with_tokens_used(generation.tokens_used)
            .with_artifact(Artifact::new("task_analysis", analysis_json, "Coding task analysis"));

        for (language, code) in extract_code_blocks(&generation.content) {
            response = response.with_artifact(Artifact::new(
                "code",
                serde_json::json!({ "language": language, "code": code }),
                "Generated code block",
            ));
        }
        Ok(response)
    }
}

#[async_trait]
impl Agent for CodingAgent {
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

    fn capabilities(&self) -> Capabilities {
        let mut capabilities = Capabilities::from_config(&self.config);
        capabilities
            .extra
            .insert("supported_languages".to_string(), serde_json::json!(SUPPORTED_LANGUAGES));
        capabilities
    }
}
