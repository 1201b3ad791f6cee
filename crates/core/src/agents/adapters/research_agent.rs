//! Research and fact-finding specialist.
//!
//! Reads depth, verification needs, time focus and subject areas out of the
//! request, shapes the prompt around them, then splits the answer into
//! findings and estimates how confident the answer sounds.

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

/// Research-shaped text that raises the score even without keyword hits.
const RESEARCH_PATTERNS: &[(&str, f64)] = &[
    (r"\b(look up|find (information|out)|fact[- ]check|tell me about|background on)\b", 0.2),
    (r"\b(statistics|survey|report|evidence|sources?|citations?)\b", 0.15),
    (r"^\s*(what|why|how|when|where|who|which)\b", 0.1),
    (r"\?\s*$", 0.05),
];

/// Checked in order; the first match names the time focus.
static TIME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\b(?:in|since|from|during)\s+(\d{4})\b",
        r"\b(?:last|past)\s+(\d+\s+(?:years?|months?|days?))\b",
        r"\b(recent|current|latest|modern|historical)\b",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

const FOCUS_KEYWORDS: [(FocusArea, &[&str]); 5] = [
    (FocusArea::Technical, &["technical", "technology", "programming", "software", "hardware"]),
    (FocusArea::Scientific, &["scientific", "research", "study", "experiment", "data"]),
    (FocusArea::Business, &["business", "market", "industry", "company", "economic"]),
    (FocusArea::Academic, &["academic", "educational", "university", "journal", "paper"]),
    (FocusArea::News, &["news", "current", "events", "recent", "breaking"]),
];

/// Words that mark an answer as hedged.
const HEDGES: &[&str] = &["likely", "probably", "appears", "seems", "may", "might", "possibly"];

const BASE_CONFIDENCE: f64 = 0.7;
const MIN_CONFIDENCE: f64 = 0.1;
const HEDGE_PENALTY: f64 = 0.05;
const MAX_HEDGE_PENALTY: f64 = 0.3;

/// Below this the answer gets a limitations note in the trace.
pub const LOW_CONFIDENCE: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchDepth {
    Shallow,
    Standard,
    Deep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusArea {
    Technical,
    Scientific,
    Business,
    Academic,
    News,
}

/// What the research agent read out of a request before prompting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResearchParameters {
    pub depth: ResearchDepth,
    pub verification_required: bool,
    pub time_period: Option<String>,
    pub focus_areas: Vec<FocusArea>,
}

/// One paragraph of the answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub id: usize,
    pub content: String,
}

fn words(message: &str) -> HashSet<String> {
    message
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Classify a research request. Pure and cheap.
pub fn extract_research_parameters(message: &str) -> ResearchParameters {
    let words = words(message);
    let any = |keywords: &[&str]| keywords.iter().any(|k| words.contains(*k));

    let depth = if any(&["comprehensive", "detailed", "thorough", "deep"]) {
        ResearchDepth::Deep
    } else if any(&["quick", "brief", "summary", "overview"]) {
        ResearchDepth::Shallow
    } else {
        ResearchDepth::Standard
    };

    let lower = message.to_lowercase();
    let time_period = TIME_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(&lower))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());

    let focus_areas = FOCUS_KEYWORDS
        .iter()
        .filter(|(_, keywords)| any(*keywords))
        .map(|(area, _)| *area)
        .collect();

    ResearchParameters {
        depth,
        verification_required: any(&["verify", "check", "accurate", "fact", "facts", "truth"]),
        time_period,
        focus_areas,
    }
}

/// Split an answer into paragraph findings, numbered from 1.
pub fn extract_findings(content: &str) -> Vec<Finding> {
    content
        .split("\n\n")
        .map(str::trim)
        .filter(|section| !section.is_empty())
        .enumerate()
        .map(|(i, section)| Finding {
            id: i + 1,
            content: section.to_string(),
        })
        .collect()
}

/// Estimate confidence in `[0.1, 1.0]` from the requested depth, the
/// verification flag and how hedged the answer reads.
pub fn calculate_confidence(content: &str, params: &ResearchParameters) -> f64 {
    let mut confidence = BASE_CONFIDENCE;
    match params.depth {
        ResearchDepth::Deep => confidence += 0.15,
        ResearchDepth::Shallow => confidence -= 0.1,
        ResearchDepth::Standard => {}
    }
    if params.verification_required {
        confidence += 0.1;
    }

    let words = words(content);
    let hedges = HEDGES.iter().filter(|hedge| words.contains(**hedge)).count();
    confidence -= (hedges as f64 * HEDGE_PENALTY).min(MAX_HEDGE_PENALTY);

    confidence.clamp(MIN_CONFIDENCE, 1.0)
}

fn research_heuristics() -> PatternScorer {
    RESEARCH_PATTERNS.iter().fold(PatternScorer::new(), |scorer, (pattern, weight)| {
        match scorer.clone().with_pattern(pattern, *weight) {
            Ok(extended) => extended,
            Err(e) => {
                warn!(pattern, error = %e, "skipping invalid research heuristic");
                scorer
            }
        }
    })
}

/// Agent specialised in research and fact-finding.
pub struct ResearchAgent {
    config: AgentConfig,
    client: Arc<dyn ModelClient>,
    scorer: ScoreChain,
}

impl ResearchAgent {
    pub fn new(config: AgentConfig, client: Arc<dyn ModelClient>) -> Self {
        let scorer = ScoreChain::new()
            .with(KeywordScorer::from_config(&config))
            .with(research_heuristics());
        Self { config, client, scorer }
    }

    pub fn build_prompt(&self, message: &str, params: &ResearchParameters, context: &RequestContext) -> String {
        let mut prompt = persona(&self.config);
        let _ = write!(prompt, "\n\nResearch depth: {:?}", params.depth);
        prompt.push_str(match params.depth {
            ResearchDepth::Deep => "\nCover background, competing views and open questions in detail.",
            ResearchDepth::Shallow => "\nKeep it to a brief overview of the key facts.",
            ResearchDepth::Standard => "\nGive the key findings with supporting evidence.",
        });
        if params.verification_required {
            prompt.push_str("\nThis needs fact-checking: state how confident you are in each claim.");
        }
        if !params.focus_areas.is_empty() {
            let areas: Vec<_> = params.focus_areas.iter().map(|a| format!("{a:?}").to_lowercase()).collect();
            let _ = write!(prompt, "\nFocus on: {}", areas.join(", "));
        }
        if let Some(period) = &params.time_period {
            let _ = write!(prompt, "\nTime focus: {period}");
        }
        prompt.push_str("\nSeparate findings with blank lines.");
        append_history(&mut prompt, context);
        let _ = write!(prompt, "\n\nUser: {}", message.trim());
        prompt
    }

    fn trace(&self, message: &str, params: &ResearchParameters, findings: usize, confidence: f64) -> String {
        let preview: String = message.chars().take(100).collect();
        let focus = if params.focus_areas.is_empty() {
            "general".to_string()
        } else {
            params
                .focus_areas
                .iter()
                .map(|a| format!("{a:?}").to_lowercase())
                .collect::<Vec<_>>()
                .join(", ")
        };
        let mut lines = vec![
            format!("Analyzing research request: '{preview}'"),
            format!("Research depth: {:?}", params.depth),
            format!("Focus areas: {focus}"),
            format!("Verification required: {}", if params.verification_required { "yes" } else { "no" }),
        ];
        if let Some(period) = &params.time_period {
            lines.push(format!("Time focus: {period}"));
        }
        lines.push(format!("Findings: {findings}, confidence {confidence:.2}"));
        if confidence < LOW_CONFIDENCE {
            lines.push("Moderate confidence; verify findings with additional sources".to_string());
        }
        format!("[{}] {}", self.config.name, lines.join("\n"))
    }

    async fn answer(&self, message: &str, context: &RequestContext) -> Result<AgentResponse, AgentError> {
        validate_input(message)?;

        let params = extract_research_parameters(message);
        debug!(agent_id = %self.config.agent_id, ?params, "extracted research parameters");

        let prompt = self.build_prompt(message, &params, context);
        let generation = self
            .client
            .generate(GenerateRequest::from_config(prompt, &self.config))
            .await?;
        if generation.content.trim().is_empty() {
            return Err(AgentError::EmptyResponse);
        }

        let findings = extract_findings(&generation.content);
        let finding_count = findings.len();
        let confidence = calculate_confidence(&generation.content, &params);

        let params_json = serde_json::to_value(&params)
            .map_err(|e| AgentError::ExecutionError(format!("Failed to encode research parameters: {e}")))?;
        let findings_json = serde_json::json!({
            "findings": findings,
            "confidence": confidence,
            "context_used": !context.history.is_empty(),
        });

        Ok(
            AgentResponse::completed(&self.config.agent_id, generation.content.clone(), &generation.model)
                .with_thinking_trace(self.trace(message, &params, finding_count, confidence))
                .with_tokens_used(generation.tokens_used)
                .with_artifact(Artifact::new("research_parameters", params_json, "Extracted research parameters"))
                .with_artifact(Artifact::new("research_findings", findings_json, "Findings and confidence")),
        )
    }
}

#[async_trait]
impl Agent for ResearchAgent {
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
        capabilities.extra.insert(
            "research_depths".to_string(),
            serde_json::json!([ResearchDepth::Shallow, ResearchDepth::Standard, ResearchDepth::Deep]),
        );
        let areas: Vec<_> = FOCUS_KEYWORDS.iter().map(|(area, _)| *area).collect();
        capabilities
            .extra
            .insert("focus_areas".to_string(), serde_json::json!(areas));
        capabilities
    }
}
