//! Agent factory for creating agent instances from configurations.
//!
//! Packages never carry code. A manifest's `main_module` names an entry
//! point that was compiled into the binary and registered here; the factory
//! turns `(entry point, AgentConfig, model client)` into a live agent.

use crate::agents::adapters::{CodingAgent, PromptAgent, ResearchAgent};
use crate::agents::base::Agent;
use crate::model::ModelClient;
use dk_protocol::AgentConfig;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builder registered under an entry-point name.
pub type AgentBuilder = Arc<dyn Fn(AgentConfig, Arc<dyn ModelClient>) -> Arc<dyn Agent> + Send + Sync>;

/// Generic persona agent entry point.
pub const PROMPT_ENTRY_POINT: &str = "prompt";

/// Coding specialist entry point.
pub const CODING_ENTRY_POINT: &str = "coding";

/// Research specialist entry point.
pub const RESEARCH_ENTRY_POINT: &str = "research";

/// Registry of entry points.
#[derive(Clone, Default)]
pub struct AgentFactory {
    builders: BTreeMap<String, AgentBuilder>,
}

impl AgentFactory {
    /// An empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory with the built-in `prompt`, `coding` and `research` entry points.
    pub fn with_builtins() -> Self {
        let mut factory = Self::new();
        factory.register(PROMPT_ENTRY_POINT, |config, client| {
            Arc::new(PromptAgent::new(config, client)) as Arc<dyn Agent>
        });
        factory.register(CODING_ENTRY_POINT, |config, client| {
            Arc::new(CodingAgent::new(config, client)) as Arc<dyn Agent>
        });
        factory.register(RESEARCH_ENTRY_POINT, |config, client| {
            Arc::new(ResearchAgent::new(config, client)) as Arc<dyn Agent>
        });
        factory
    }

    /// Register (or replace) an entry point.
    ///
    /// # Arguments
    ///
    /// * `entry_point` - Name manifests refer to in `main_module`
    /// * `builder` - Constructs the agent from its resolved configuration
    pub fn register<F>(&mut self, entry_point: &str, builder: F)
    where
        F: Fn(AgentConfig, Arc<dyn ModelClient>) -> Arc<dyn Agent> + Send + Sync + 'static,
    {
        self.builders.insert(entry_point.to_string(), Arc::new(builder));
    }

    pub fn contains(&self, entry_point: &str) -> bool {
        self.builders.contains_key(entry_point)
    }

    /// Registered entry points in lexical order.
    pub fn entry_points(&self) -> Vec<String> {
        self.builders.keys().cloned().collect()
    }

    /// Create an agent.
    ///
    /// # Returns
    ///
    /// `None` if `entry_point` is not registered.
    pub fn create(
        &self,
        entry_point: &str,
        config: AgentConfig,
        client: Arc<dyn ModelClient>,
    ) -> Option<Arc<dyn Agent>> {
        self.builders
            .get(entry_point)
            .map(|builder| builder(config, client))
    }
}

impl std::fmt::Debug for AgentFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentFactory")
            .field("entry_points", &self.entry_points())
            .finish()
    }
}
