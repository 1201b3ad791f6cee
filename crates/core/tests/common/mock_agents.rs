//! Mock agents and hooks for deterministic testing.

use async_trait::async_trait;
use dk_core::agents::{Agent, AgentFactory, AgentHook};
use dk_protocol::{AgentConfig, AgentResponse, HealthReport, RequestContext};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Entry point served by [`gated_factory`].
#[allow(dead_code)]
pub const GATED_ENTRY_POINT: &str = "gated";

/// Shared barrier for [`GatedAgent`] instances.
#[allow(dead_code)]
pub struct Gate {
    permits: Semaphore,
    started: AtomicUsize,
}

#[allow(dead_code)]
impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            permits: Semaphore::new(0),
            started: AtomicUsize::new(0),
        })
    }

    /// Let `n` blocked (or future) calls through.
    pub fn open(&self, n: usize) {
        self.permits.add_permits(n);
    }

    /// Calls that have entered `process`.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` calls are parked at the gate.
    pub async fn wait_started(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.started() < n {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("agents never reached the gate");
    }
}

/// An agent that blocks in `process` until its gate opens.
///
/// Answers with `"{agent_id} v{version}"` so a test can tell which
/// instance handled a request.
#[allow(dead_code)]
pub struct GatedAgent {
    config: AgentConfig,
    gate: Arc<Gate>,
}

#[allow(dead_code)]
impl GatedAgent {
    pub fn new(config: AgentConfig, gate: Arc<Gate>) -> Self {
        Self { config, gate }
    }
}

#[async_trait]
impl Agent for GatedAgent {
    fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn score(&self, _message: &str, _context: &RequestContext) -> f64 {
        self.config.base_score
    }

    async fn process(&self, _message: &str, _context: &RequestContext) -> AgentResponse {
        self.gate.started.fetch_add(1, Ordering::SeqCst);
        if let Ok(permit) = self.gate.permits.acquire().await {
            permit.forget();
        }
        AgentResponse::completed(
            &self.config.agent_id,
            format!("{} v{}", self.config.agent_id, self.config.version),
            &self.config.model,
        )
    }

    async fn health(&self) -> HealthReport {
        HealthReport::from_checks(&self.config.agent_id, BTreeMap::new())
    }
}

/// Built-in entry points plus `gated`, whose instances all share `gate`.
#[allow(dead_code)]
pub fn gated_factory(gate: Arc<Gate>) -> AgentFactory {
    let mut factory = AgentFactory::with_builtins();
    factory.register(GATED_ENTRY_POINT, move |config, _client| {
        Arc::new(GatedAgent::new(config, Arc::clone(&gate))) as Arc<dyn Agent>
    });
    factory
}

/// Hook that records every callback as `"stage:agent_id"`.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingHook {
    calls: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl RecordingHook {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl AgentHook for RecordingHook {
    fn on_start(&self, agent_id: &str, _message: &str) {
        self.calls.lock().push(format!("start:{agent_id}"));
    }

    fn on_complete(&self, response: &AgentResponse) {
        self.calls.lock().push(format!("complete:{}", response.agent_id()));
    }

    fn on_error(&self, response: &AgentResponse) {
        self.calls.lock().push(format!("error:{}", response.agent_id()));
    }
}
