//! Aggregation of per-agent responses.
//!
//! Merge policy:
//! - one success: its content is the answer, verbatim
//! - several: one `## {name} ({agent_id})` section per success, in
//!   selection order, separated by a horizontal rule
//!
//! Traces are attributed as `[{agent_id}] {trace}` and joined by a blank
//! line. Failed responses contribute nothing to content or trace.

use super::ORCHESTRATOR_ID;
use dk_protocol::{AgentResponse, ErrorCode};
use serde_json::json;

/// Separator between sections of a multi-agent answer.
pub const SECTION_SEPARATOR: &str = "\n\n---\n\n";

/// One response together with the display name of its agent.
#[derive(Debug, Clone)]
pub struct RankedResponse {
    pub name: String,
    pub response: AgentResponse,
}

/// Merged content and trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merged {
    pub content: String,
    pub thinking_trace: String,
}

/// Stamp `agent_name` and `selection_rank` (1-based) on every successful
/// response.
pub fn annotate(results: &mut [RankedResponse]) {
    for (index, ranked) in results.iter_mut().enumerate() {
        if ranked.response.is_success() {
            ranked.response.insert_metadata("agent_name", json!(ranked.name));
            ranked.response.insert_metadata("selection_rank", json!(index + 1));
        }
    }
}

/// Merge the successful responses in `results`, keeping their order.
///
/// # Returns
///
/// `None` if nothing succeeded.
pub fn merge(results: &[RankedResponse]) -> Option<Merged> {
    let successes: Vec<&RankedResponse> = results.iter().filter(|r| r.response.is_success()).collect();

    let content = match successes.as_slice() {
        [] => return None,
        [only] => only.response.content().to_string(),
        many => many
            .iter()
            .map(|r| format!("## {} ({})\n\n{}", r.name, r.response.agent_id(), r.response.content()))
            .collect::<Vec<_>>()
            .join(SECTION_SEPARATOR),
    };

    let thinking_trace = successes
        .iter()
        .filter_map(|r| {
            r.response
                .thinking_trace()
                .map(|trace| format!("[{}] {}", r.response.agent_id(), trace))
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    Some(Merged { content, thinking_trace })
}

/// Synthetic response returned when every selected agent failed.
pub fn all_failed(results: &[RankedResponse]) -> AgentResponse {
    let details = results
        .iter()
        .map(|r| {
            let code = r
                .response
                .error_code()
                .map_or("UNKNOWN", |c| c.as_str());
            let message = r.response.error_message().unwrap_or_default();
            format!("{} ({code}): {message}", r.response.agent_id())
        })
        .collect::<Vec<_>>()
        .join("; ");
    AgentResponse::error(
        ORCHESTRATOR_ID,
        ErrorCode::AllAgentsFailed,
        format!("All {} selected agent(s) failed: {details}", results.len()),
    )
    .with_metadata(
        "failed_agents",
        json!(results.iter().map(|r| r.response.agent_id()).collect::<Vec<_>>()),
    )
}
