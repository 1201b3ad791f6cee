//! End-to-end dispatch tests: routing, concurrent invocation and merging
//! through `Orchestrator::route_and_dispatch`.

mod common;

use common::*;
use dk_core::agents::{Agent, MockAgent};
use dk_core::model::ScriptedModelClient;
use dk_core::orchestrator::{JsonlSink, Orchestrator, SECTION_SEPARATOR};
use dk_core::router::RoutingPolicy;
use dk_protocol::{AgentConfig, AgentSource, AgentStatus, ErrorCode, RequestContext};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tokio::sync::mpsc;

fn orchestrator(registry: Arc<dk_core::registry::AgentRegistry>) -> Orchestrator {
    Orchestrator::new(registry, RoutingPolicy::default())
}

/// RED: A message no specialist claims falls back to the default agent.
#[tokio::test]
async fn test_unmatched_message_uses_default_agent() {
    let orchestrator = orchestrator(echo_registry());

    let result = orchestrator.route_and_dispatch("zzzz", &RequestContext::new()).await;

    assert_completed(&result, &["general"]);
    assert!(result.fallback_used, "no agent reached the threshold");
    assert!(
        result.content.ends_with("User: zzzz"),
        "echo backend answers with the request line, got: {}",
        result.content
    );
}

/// A coding request goes to the coding specialist only.
#[tokio::test]
async fn test_coding_request_routes_to_specialist() {
    let orchestrator = orchestrator(echo_registry());

    let result = orchestrator
        .route_and_dispatch("write a function to add two numbers", &RequestContext::new())
        .await;

    assert_completed(&result, &["coding"]);
    assert!(!result.fallback_used);

    assert_eq!(result.scores.len(), 2);
    assert_eq!(result.scores[0].agent_id, "coding");
    assert!(result.scores[0].score >= 0.7, "coding score: {}", result.scores[0].score);
    assert_eq!(result.scores[1].agent_id, "general");
    assert_eq!(result.scores[1].score, 0.2);

    let response = &result.per_agent_results[0];
    assert_eq!(response.metadata().get("selection_rank"), Some(&serde_json::json!(1)));
    assert!(
        response.artifacts().iter().any(|a| a.artifact_type == "task_analysis"),
        "coding agent attaches its task analysis"
    );
}

/// Disabled agents are never routed to.
#[tokio::test]
async fn test_disabled_specialist_is_skipped() {
    let registry = echo_registry();
    registry.toggle("coding", false).unwrap();
    let orchestrator = orchestrator(registry);

    let result = orchestrator
        .route_and_dispatch("write a function to add two numbers", &RequestContext::new())
        .await;

    assert_completed(&result, &["general"]);
    assert!(result.fallback_used);
    assert_eq!(result.scores.len(), 1, "only enabled agents are scored");
}

/// A timed-out agent does not stop the others from answering.
#[tokio::test]
async fn test_timeout_is_isolated() {
    let slow_config = AgentConfig::new("slow", "Slow Agent", "Always too late").with_timeout(Duration::from_millis(1));
    let registry = mock_registry(vec![
        MockAgent::success("fast").with_score(0.9),
        MockAgent::success("slow")
            .with_config(slow_config)
            .with_score(0.8)
            .with_delay(Duration::from_millis(100)),
    ]);
    let orchestrator = orchestrator(registry);

    let result = orchestrator.route_and_dispatch("hello", &RequestContext::new()).await;

    assert_completed(&result, &["fast", "slow"]);
    assert_eq!(result.content, "Mock response from fast", "a single success is returned verbatim");
    let slow = &result.per_agent_results[1];
    assert_eq!(slow.status(), AgentStatus::Timeout);
    assert_eq!(slow.error_code(), Some(ErrorCode::Timeout));
    assert_eq!(slow.metadata().get("attempts"), Some(&serde_json::json!(1)), "timeouts are not retried");
}

/// When every selected agent fails the dispatch fails with a summary.
#[tokio::test]
async fn test_all_agents_failed() {
    let registry = mock_registry(vec![
        MockAgent::failing("one").with_score(0.9),
        MockAgent::success("two")
            .with_score(0.8)
            .with_failure(ErrorCode::InvalidInput, "bad request"),
    ]);
    let (tx, mut rx) = mpsc::channel(64);
    let orchestrator = orchestrator(registry).with_events(tx);

    let result = orchestrator.route_and_dispatch("hello", &RequestContext::new()).await;

    assert_failed_with(&result, ErrorCode::AllAgentsFailed);
    assert_eq!(result.agents_used, vec!["one", "two"]);
    let message = result.failure.as_ref().and_then(|f| f.error_message()).unwrap();
    assert!(message.starts_with("All 2 selected agent(s) failed"), "got: {message}");
    assert!(message.contains("two (INVALID_INPUT): bad request"), "got: {message}");

    assert_eq!(
        result.per_agent_results[1].metadata().get("attempts"),
        Some(&serde_json::json!(1)),
        "non-retryable codes are not retried"
    );

    assert_event_sequence(&drain_events(&mut rx), &["one", "two"], "failed");
}

/// An empty registry fails fast without invoking anything.
#[tokio::test]
async fn test_empty_registry_reports_no_agent() {
    let orchestrator = orchestrator(mock_registry(Vec::new()));

    let result = orchestrator.route_and_dispatch("hello", &RequestContext::new()).await;

    assert_failed_with(&result, ErrorCode::NoAgentAvailable);
    assert!(result.agents_used.is_empty());
    assert!(result.per_agent_results.is_empty());
}

/// Content follows selection order no matter which agent finishes first.
#[tokio::test]
async fn test_merge_order_is_deterministic() {
    let registry = mock_registry(vec![
        MockAgent::success("alpha")
            .with_score(0.9)
            .with_response("A")
            .with_trace("thinking a")
            .with_delay(Duration::from_millis(30)),
        MockAgent::success("beta")
            .with_score(0.8)
            .with_response("B")
            .with_trace("thinking b"),
    ]);
    let orchestrator = orchestrator(registry);
    let expected = format!("## Mock alpha (alpha)\n\nA{SECTION_SEPARATOR}## Mock beta (beta)\n\nB");

    for _ in 0..5 {
        let result = orchestrator.route_and_dispatch("hello", &RequestContext::new()).await;
        assert_completed(&result, &["alpha", "beta"]);
        assert_eq!(result.content, expected);
        assert_eq!(result.thinking_trace, "[alpha] thinking a\n\n[beta] thinking b");
    }
}

/// Equal scores are ranked by agent id, and `max_agents` caps the selection.
#[tokio::test]
async fn test_ties_and_max_agents() {
    let registry = mock_registry(vec![
        MockAgent::success("charlie").with_score(0.5),
        MockAgent::success("bravo").with_score(0.5),
        MockAgent::success("alpha").with_score(0.5),
    ]);
    let policy = RoutingPolicy {
        max_agents: Some(2),
        ..RoutingPolicy::default()
    };
    let orchestrator = Orchestrator::new(registry, policy);

    let result = orchestrator.route_and_dispatch("hello", &RequestContext::new()).await;

    assert_completed(&result, &["alpha", "bravo"]);
    let ranked: Vec<_> = result.scores.iter().map(|s| s.agent_id.as_str()).collect();
    assert_eq!(ranked, vec!["alpha", "bravo", "charlie"]);
}

/// Transient failures are retried up to `retry_count` times.
#[tokio::test]
async fn test_transient_failures_are_retried() {
    let flaky = Arc::new(MockAgent::success("flaky").with_score(0.9).with_flaky_failures(2));
    let registry = mock_registry(Vec::new());
    registry
        .register(Arc::clone(&flaky) as Arc<dyn Agent>, AgentSource::Builtin, false)
        .unwrap();
    let orchestrator = orchestrator(registry);

    let result = orchestrator.route_and_dispatch("hello", &RequestContext::new()).await;

    assert_completed(&result, &["flaky"]);
    assert_eq!(flaky.call_count(), 3);
    assert_eq!(
        result.per_agent_results[0].metadata().get("attempts"),
        Some(&serde_json::json!(3))
    );
}

/// A panicking agent is reported as a failure and the others still answer.
#[tokio::test]
async fn test_panicking_agent_is_isolated() {
    let registry = mock_registry(vec![
        MockAgent::panicking("boom").with_score(0.9),
        MockAgent::success("steady").with_score(0.8),
    ]);
    let hook = Arc::new(RecordingHook::default());
    let orchestrator = orchestrator(registry).with_hook(hook.clone());

    let result = orchestrator.route_and_dispatch("hello", &RequestContext::new()).await;

    assert_completed(&result, &["boom", "steady"]);
    assert_eq!(result.content, "Mock response from steady");
    assert_eq!(result.per_agent_results[0].error_code(), Some(ErrorCode::AgentPanicked));

    let calls = hook.calls();
    assert!(calls.contains(&"error:boom".to_string()), "calls: {calls:?}");
    assert!(calls.contains(&"complete:steady".to_string()), "calls: {calls:?}");
}

/// Events describe the dispatch from start to completion.
#[tokio::test]
async fn test_events_for_successful_dispatch() {
    let registry = mock_registry(vec![
        MockAgent::success("alpha").with_score(0.9),
        MockAgent::success("beta").with_score(0.8),
    ]);
    let (tx, mut rx) = mpsc::channel(64);
    let orchestrator = orchestrator(registry).with_events(tx);

    let result = orchestrator.route_and_dispatch("hello", &RequestContext::new()).await;

    assert_completed(&result, &["alpha", "beta"]);
    assert_event_sequence(&drain_events(&mut rx), &["alpha", "beta"], "completed");
}

/// Conversation history reaches the model prompt.
#[tokio::test]
async fn test_history_is_forwarded_to_backend() {
    let client = Arc::new(ScriptedModelClient::always("Sure."));
    let orchestrator = orchestrator(seeded_registry(client.clone()));
    let context = RequestContext::new()
        .with_conversation_id("conv-1")
        .with_turn("my name is Ada", "Nice to meet you, Ada.");

    let result = orchestrator.route_and_dispatch("what is my name?", &context).await;

    assert_completed(&result, &["general"]);
    assert_eq!(result.content, "Sure.");
    let prompts = client.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("my name is Ada"), "prompt: {}", prompts[0]);
    assert!(prompts[0].ends_with("User: what is my name?"), "prompt: {}", prompts[0]);
}

/// Finished dispatches are appended to the sink.
#[tokio::test]
async fn test_sink_records_dispatch() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("history/dispatches.jsonl");
    let orchestrator = orchestrator(echo_registry()).with_sink(Arc::new(JsonlSink::new(&path)));

    let result = orchestrator.route_and_dispatch("zzzz", &RequestContext::new()).await;
    assert!(result.is_success());

    let mut contents = String::new();
    for _ in 0..200 {
        contents = std::fs::read_to_string(&path).unwrap_or_default();
        if !contents.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let line = contents.lines().next().expect("sink should write one line");
    let record: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(record["message"], "zzzz");
    assert_eq!(record["result"]["state"], "COMPLETED");
    assert_eq!(record["result"]["dispatch_id"], result.dispatch_id.to_string());
}
