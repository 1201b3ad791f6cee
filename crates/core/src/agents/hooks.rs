//! Invocation hooks.
//!
//! Hooks observe agent invocations. They run synchronously, in registration
//! order, on the task that invokes the agent. A panicking hook is logged and
//! skipped so it can never take a dispatch down with it.

use dk_protocol::{AgentResponse, AgentStatus};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Observer of agent invocations.
pub trait AgentHook: Send + Sync {
    /// Called once before the first attempt.
    fn on_start(&self, _agent_id: &str, _message: &str) {}

    /// Called with a `Completed` response.
    fn on_complete(&self, _response: &AgentResponse) {}

    /// Called with an `Error` or `Timeout` response.
    fn on_error(&self, _response: &AgentResponse) {}
}

/// Ordered list of hook registrations.
#[derive(Clone, Default)]
pub struct HookList {
    hooks: Vec<Arc<dyn AgentHook>>,
}

impl HookList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, hook: Arc<dyn AgentHook>) {
        self.hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn fire_start(&self, agent_id: &str, message: &str) {
        self.each("on_start", |hook| hook.on_start(agent_id, message));
    }

    /// Fire `on_complete` or `on_error` depending on the response status.
    pub fn fire_finish(&self, response: &AgentResponse) {
        if response.is_success() {
            self.each("on_complete", |hook| hook.on_complete(response));
        } else {
            self.each("on_error", |hook| hook.on_error(response));
        }
    }

    fn each(&self, stage: &str, call: impl Fn(&dyn AgentHook)) {
        for (index, hook) in self.hooks.iter().enumerate() {
            if catch_unwind(AssertUnwindSafe(|| call(hook.as_ref()))).is_err() {
                warn!(hook_index = index, stage, "agent hook panicked; skipping");
            }
        }
    }
}

/// Hook that writes one structured log line per invocation event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingHook;

impl AgentHook for TracingHook {
    fn on_start(&self, agent_id: &str, message: &str) {
        info!(agent_id, message_chars = message.chars().count(), "agent started");
    }

    fn on_complete(&self, response: &AgentResponse) {
        info!(
            agent_id = response.agent_id(),
            elapsed_ms = response.execution_time().as_millis() as u64,
            tokens = response.tokens_used(),
            model = response.model_used(),
            "agent completed"
        );
    }

    fn on_error(&self, response: &AgentResponse) {
        warn!(
            agent_id = response.agent_id(),
            status = ?response.status(),
            code = ?response.error_code(),
            error = response.error_message().unwrap_or_default(),
            "agent failed"
        );
    }
}

/// Per-agent execution counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentMetrics {
    pub total: u64,
    pub successes: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub total_time: Duration,
}

impl AgentMetrics {
    pub fn average_latency(&self) -> Duration {
        match u32::try_from(self.total) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => self.total_time / n,
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.successes as f64 / self.total as f64
        }
    }
}

/// Hook that aggregates [`AgentMetrics`] per agent.
#[derive(Debug, Default)]
pub struct MetricsHook {
    metrics: Mutex<BTreeMap<String, AgentMetrics>>,
}

impl MetricsHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, agent_id: &str) -> Option<AgentMetrics> {
        self.metrics.lock().get(agent_id).cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<String, AgentMetrics> {
        self.metrics.lock().clone()
    }

    fn record(&self, response: &AgentResponse) {
        let mut metrics = self.metrics.lock();
        let entry = metrics.entry(response.agent_id().to_string()).or_default();
        entry.total += 1;
        entry.total_time += response.execution_time();
        match response.status() {
            AgentStatus::Completed => entry.successes += 1,
            AgentStatus::Error => entry.failures += 1,
            AgentStatus::Timeout => entry.timeouts += 1,
        }
    }
}

impl AgentHook for MetricsHook {
    fn on_complete(&self, response: &AgentResponse) {
        self.record(response);
    }

    fn on_error(&self, response: &AgentResponse) {
        self.record(response);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dk_protocol::ErrorCode;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(AtomicUsize);

    impl AgentHook for Counting {
        fn on_start(&self, _agent_id: &str, _message: &str) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Exploding;

    impl AgentHook for Exploding {
        fn on_start(&self, _agent_id: &str, _message: &str) {
            panic!("hook failure");
        }
    }

    #[test]
    fn test_panicking_hook_is_skipped() {
        let counter = Arc::new(Counting(AtomicUsize::new(0)));
        let mut hooks = HookList::new();
        hooks.push(Arc::new(Exploding));
        hooks.push(counter.clone());

        hooks.fire_start("coding", "hi");

        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_metrics_hook_counts_outcomes() {
        let metrics = MetricsHook::new();
        let mut hooks = HookList::new();
        let metrics = Arc::new(metrics);
        hooks.push(metrics.clone());

        hooks.fire_finish(
            &AgentResponse::completed("coding", "ok", "m").with_execution_time(Duration::from_millis(30)),
        );
        hooks.fire_finish(&AgentResponse::error("coding", ErrorCode::ExecutionError, "boom"));
        hooks.fire_finish(&AgentResponse::timeout("coding", Duration::from_millis(10)));

        let coding = metrics.get("coding").unwrap();
        assert_eq!(coding.total, 3);
        assert_eq!(coding.successes, 1);
        assert_eq!(coding.failures, 1);
        assert_eq!(coding.timeouts, 1);
        assert_eq!(coding.total_time, Duration::from_millis(40));
        assert!(metrics.get("general").is_none());
    }

    #[test]
    fn test_average_latency_of_empty_metrics() {
        assert_eq!(AgentMetrics::default().average_latency(), Duration::ZERO);
        assert_eq!(AgentMetrics::default().success_rate(), 0.0);
    }
}
