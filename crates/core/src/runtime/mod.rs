//! Process bootstrap.
//!
//! Loads `.dispatch-kit/`, builds the model client, discovers installed
//! packages and makes sure the default agent exists.

use crate::agents::{Agent, AgentFactory, PromptAgent, TracingHook};
use crate::config::{load_config, AppConfig, ConfigResult};
use crate::model::{CommandModelClient, EchoModelClient, ModelClient};
use crate::orchestrator::Orchestrator;
use crate::registry::{AgentRegistry, DiscoveryReport};
use crate::router::RoutingPolicy;
use dk_protocol::{AgentConfig, AgentSource, DispatchConfig};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Base score of the built-in fallback agent.
pub const FALLBACK_BASE_SCORE: f64 = 0.2;

/// A loaded runtime: configuration plus a populated registry.
#[derive(Debug)]
pub struct Runtime {
    pub config: AppConfig,
    pub registry: Arc<AgentRegistry>,
    pub discovery: DiscoveryReport,
}

impl Runtime {
    pub fn policy(&self) -> RoutingPolicy {
        RoutingPolicy::from(&self.config.global)
    }

    /// An orchestrator over this runtime's registry with structured logging.
    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(Arc::clone(&self.registry), self.policy()).with_hook(Arc::new(TracingHook))
    }
}

/// Model client for `config`: the configured backend command, or the
/// offline echo backend when none is set.
pub fn build_client(config: &DispatchConfig) -> Arc<dyn ModelClient> {
    match CommandModelClient::from_config(&config.backend, &config.available_apis) {
        Some(client) => {
            if !client.is_available() {
                warn!(command = %client.name(), "backend command not found on PATH");
            }
            Arc::new(client)
        }
        None => Arc::new(EchoModelClient::new().with_apis(config.available_apis.clone())),
    }
}

/// Load `root/.dispatch-kit` and build a ready runtime.
///
/// # Errors
///
/// Returns `ConfigError` if `config.toml` is unreadable or invalid. Broken
/// packages do not fail bootstrap; they are listed in `discovery.failed`.
pub async fn bootstrap(root: &Path) -> ConfigResult<Runtime> {
    let config = load_config(root).await?;
    let client = build_client(&config.global);
    Ok(bootstrap_with(config, AgentFactory::with_builtins(), client))
}

/// Build a runtime from an already loaded configuration.
pub fn bootstrap_with(config: AppConfig, factory: AgentFactory, client: Arc<dyn ModelClient>) -> Runtime {
    let registry = Arc::new(AgentRegistry::new(factory, Arc::clone(&client)));
    let discovery = registry.discover(&[config.agents_dir()], false);

    let default_agent = &config.global.default_agent;
    if !registry.contains(default_agent) {
        let fallback = AgentConfig::new(
            default_agent,
            "General Assistant",
            "Answers requests no specialist claims",
        )
        .with_base_score(FALLBACK_BASE_SCORE);
        let agent: Arc<dyn Agent> = Arc::new(PromptAgent::new(fallback, client));
        match registry.register(agent, AgentSource::Builtin, false) {
            Ok(_) => info!(agent_id = %default_agent, "registered built-in fallback agent"),
            Err(e) => warn!(agent_id = %default_agent, error = %e, "could not register fallback agent"),
        }
    }

    if let Err(e) = registry.pin(default_agent) {
        warn!(agent_id = %default_agent, error = %e, "default agent is not registered");
    }

    for agent_id in &config.global.disabled_agents {
        if agent_id == default_agent {
            warn!(agent_id = %agent_id, "ignoring disabled_agents entry for the default agent");
            continue;
        }
        if registry.toggle(agent_id, false).is_err() {
            warn!(agent_id = %agent_id, "disabled_agents names an unknown agent");
        }
    }

    info!(
        agents = registry.len(),
        failed_packages = discovery.failed.len(),
        "runtime ready"
    );
    Runtime {
        config,
        registry,
        discovery,
    }
}
