//! One agent invocation with timeout and retry.

use crate::agents::{Agent, HookList};
use dk_protocol::{AgentResponse, AgentStatus, RequestContext};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Run `agent` until it completes, fails for good or times out.
///
/// Each attempt is bounded by the agent's `timeout`. An `Error` response is
/// retried up to `retry_count` times unless its code is not retryable. A
/// timeout is never retried; the abandoned attempt is dropped, which
/// cancels it at its next suspension point.
///
/// The returned response carries the total elapsed time and an `attempts`
/// metadata entry. Hooks see `on_start` once and `on_complete`/`on_error`
/// once.
pub async fn invoke_agent(
    agent: Arc<dyn Agent>,
    message: Arc<str>,
    context: Arc<RequestContext>,
    hooks: HookList,
) -> AgentResponse {
    let config = agent.config();
    let agent_id = config.agent_id.as_str();
    let max_attempts = config.retry_count.saturating_add(1);

    hooks.fire_start(agent_id, &message);
    let started = Instant::now();
    let mut attempt = 0;

    let mut response = loop {
        attempt += 1;
        let result = tokio::time::timeout(config.timeout, agent.process(&message, &context)).await;

        let response = match result {
            Ok(response) => response,
            Err(_) => {
                warn!(agent_id, attempt, timeout_ms = config.timeout.as_millis() as u64, "agent timed out");
                break AgentResponse::timeout(agent_id, config.timeout).with_model_used(&config.model);
            }
        };

        if response.status() != AgentStatus::Error {
            break response;
        }

        let retryable = response.error_code().map_or(true, |code| code.is_retryable());
        if !retryable || attempt >= max_attempts {
            break response;
        }
        debug!(
            agent_id,
            attempt,
            error = response.error_message().unwrap_or_default(),
            "retrying agent"
        );
    };

    response.set_execution_time(started.elapsed());
    response.insert_metadata("attempts", json!(attempt));
    hooks.fire_finish(&response);
    response
}
