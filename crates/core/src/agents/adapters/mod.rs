//! Agent adapter implementations.

pub mod coding_agent;
pub mod mock_agent;
pub mod prompt_agent;
pub mod research_agent;

pub use coding_agent::CodingAgent;
pub use mock_agent::{MockAgent, MockBehavior};
pub use prompt_agent::PromptAgent;
pub use research_agent::ResearchAgent;

use crate::model::ModelClient;
use dk_protocol::{AgentConfig, HealthReport};
use std::collections::BTreeMap;

/// Dependency checks shared by backend-driven adapters: the agent's own
/// model plus every declared model and API.
pub(crate) fn dependency_health(config: &AgentConfig, client: &dyn ModelClient) -> HealthReport {
    let mut checks = BTreeMap::new();
    checks.insert(format!("model:{}", config.model), client.supports_model(&config.model));
    for model in &config.required_models {
        checks.insert(format!("model:{model}"), client.supports_model(model));
    }
    for api in &config.required_apis {
        checks.insert(format!("api:{api}"), client.supports_api(api));
    }
    HealthReport::from_checks(&config.agent_id, checks)
}
