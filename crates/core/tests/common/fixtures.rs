//! Test fixtures for creating registries and packages.

use dk_core::agents::{Agent, MockAgent};
use dk_core::model::{EchoModelClient, ModelClient};
use dk_core::registry::{AgentPackage, AgentRegistry};
use dk_protocol::{AgentManifest, AgentSource, Event, ManifestConfig, ManifestDependencies};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::Receiver;

/// Manifest with the given identity and every optional field left out.
#[allow(dead_code)]
pub fn manifest(agent_id: &str, version: &str, main_module: &str) -> AgentManifest {
    AgentManifest {
        agent_id: agent_id.to_string(),
        name: format!("{agent_id} agent"),
        description: format!("Test agent {agent_id}"),
        version: version.to_string(),
        author: "tests".to_string(),
        main_module: main_module.to_string(),
        main_class: None,
        tags: Vec::new(),
        dependencies: ManifestDependencies::default(),
        config: ManifestConfig::default(),
        system_prompt: None,
    }
}

/// The `general` fallback: prompt entry point, base score 0.2, no triggers.
#[allow(dead_code)]
pub fn general_manifest() -> AgentManifest {
    let mut manifest = manifest("general", "1.0.0", "prompt");
    manifest.tags = vec!["general".to_string()];
    manifest.config.base_score = Some(0.2);
    manifest
}

/// The `coding` specialist with the shipped trigger list.
#[allow(dead_code)]
pub fn coding_manifest() -> AgentManifest {
    let mut manifest = manifest("coding", "1.0.0", "coding");
    manifest.tags = vec!["coding".to_string(), "programming".to_string()];
    manifest.config.triggers = [
        "code",
        "programming",
        "function",
        "debug",
        "bug",
        "python",
        "javascript",
        "rust",
        "refactor",
        "algorithm",
    ]
    .iter()
    .map(|t| t.to_string())
    .collect();
    manifest
}

/// Write `manifest` as `<dir>/<agent_id>/agent.json` and return the package directory.
#[allow(dead_code)]
pub fn write_package(dir: &Path, manifest: &AgentManifest) -> PathBuf {
    let package_dir = dir.join(&manifest.agent_id);
    fs::create_dir_all(&package_dir).expect("Failed to create package dir");
    let json = serde_json::to_string_pretty(manifest).expect("Failed to encode manifest");
    fs::write(package_dir.join("agent.json"), json).expect("Failed to write manifest");
    package_dir
}

/// Registry holding the real `general` and `coding` agents over `client`.
#[allow(dead_code)]
pub fn seeded_registry(client: Arc<dyn ModelClient>) -> Arc<AgentRegistry> {
    let registry = AgentRegistry::with_builtins(client);
    for manifest in [general_manifest(), coding_manifest()] {
        registry
            .install(&AgentPackage::from_manifest(manifest), false)
            .expect("Failed to install seed agent");
    }
    Arc::new(registry)
}

/// [`seeded_registry`] over the offline echo backend.
#[allow(dead_code)]
pub fn echo_registry() -> Arc<AgentRegistry> {
    seeded_registry(Arc::new(EchoModelClient::new()))
}

/// Registry populated with the given mocks as built-in agents.
#[allow(dead_code)]
pub fn mock_registry(agents: Vec<MockAgent>) -> Arc<AgentRegistry> {
    let registry = AgentRegistry::with_builtins(Arc::new(EchoModelClient::new()));
    for agent in agents {
        let agent: Arc<dyn Agent> = Arc::new(agent);
        registry
            .register(agent, AgentSource::Builtin, false)
            .expect("Failed to register mock agent");
    }
    Arc::new(registry)
}

/// Drain every event already sent on `rx`.
#[allow(dead_code)]
pub fn drain_events(rx: &mut Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Short tag per event, e.g. `"started"` or `"finished:coding"`.
#[allow(dead_code)]
pub fn event_tag(event: &Event) -> String {
    match event {
        Event::DispatchStarted { .. } => "started".to_string(),
        Event::AgentsSelected { .. } => "selected".to_string(),
        Event::AgentFinished { agent_id, .. } => format!("finished:{agent_id}"),
        Event::DispatchCompleted { .. } => "completed".to_string(),
        Event::DispatchFailed { .. } => "failed".to_string(),
        Event::AgentInstalled { agent_id, .. } => format!("installed:{agent_id}"),
        Event::AgentUninstalled { agent_id } => format!("uninstalled:{agent_id}"),
        Event::AgentToggled { agent_id, .. } => format!("toggled:{agent_id}"),
        Event::AgentList { .. } => "list".to_string(),
    }
}
