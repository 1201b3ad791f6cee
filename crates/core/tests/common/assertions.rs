//! Custom assertion helpers for dispatch tests.

use super::fixtures::event_tag;
use dk_protocol::{AgentStatus, DispatchResult, DispatchState, ErrorCode, Event};

/// Assert that `result` completed and used exactly `agents`, in order.
#[allow(dead_code)]
pub fn assert_completed(result: &DispatchResult, agents: &[&str]) {
    assert_eq!(
        result.state,
        DispatchState::Completed,
        "dispatch should complete, failure: {:?}",
        result.failure
    );
    assert!(result.failure.is_none(), "completed dispatch carries no failure");
    assert_eq!(result.agents_used, agents, "agents_used mismatch");
    assert_eq!(
        result.per_agent_results.len(),
        agents.len(),
        "one response per selected agent"
    );
}

/// Assert that `result` failed with a synthetic response carrying `code`.
#[allow(dead_code)]
pub fn assert_failed_with(result: &DispatchResult, code: ErrorCode) {
    assert_eq!(result.state, DispatchState::Failed, "dispatch should fail");
    assert!(result.content.is_empty(), "failed dispatch has no content");
    let failure = result.failure.as_ref().expect("failed dispatch carries a failure");
    assert_eq!(failure.status(), AgentStatus::Error);
    assert_eq!(failure.error_code(), Some(code));
}

/// Assert the orchestrator events for a single dispatch.
///
/// Checks that:
/// 1. `started` comes first and `selected` second
/// 2. One `finished` event per agent in `agents`, in any order
/// 3. `completed` or `failed` comes last
#[allow(dead_code)]
pub fn assert_event_sequence(events: &[Event], agents: &[&str], terminal: &str) {
    let tags: Vec<String> = events.iter().map(event_tag).collect();
    assert!(tags.len() >= 3, "too few events: {tags:?}");
    assert_eq!(tags[0], "started", "first event: {tags:?}");
    assert_eq!(tags[1], "selected", "second event: {tags:?}");
    assert_eq!(tags.last().map(String::as_str), Some(terminal), "last event: {tags:?}");

    let mut finished: Vec<&str> = tags[2..tags.len() - 1]
        .iter()
        .filter_map(|t| t.strip_prefix("finished:"))
        .collect();
    finished.sort_unstable();
    let mut expected = agents.to_vec();
    expected.sort_unstable();
    assert_eq!(finished, expected, "finished events: {tags:?}");
}
