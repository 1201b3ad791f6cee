//! Serves registry `Op`s from an administrative surface.

use crate::registry::error::RegistryResult;
use crate::registry::package::AgentPackage;
use crate::registry::store::AgentRegistry;
use dk_protocol::{Event, Op};

/// Apply `op` to `registry` and describe the result as an `Event`.
///
/// # Errors
///
/// Registry errors are returned unchanged so the caller can render them.
pub fn handle_op(registry: &AgentRegistry, op: Op) -> RegistryResult<Event> {
    match op {
        Op::InstallPackage { path, force } => {
            let package = AgentPackage::load(&path)?;
            let outcome = registry.install(&package, force)?;
            Ok(Event::AgentInstalled {
                agent_id: outcome.agent_id,
                version: outcome.version,
                replaced: outcome.replaced,
            })
        }
        Op::UninstallAgent { agent_id } => {
            registry.uninstall(&agent_id)?;
            Ok(Event::AgentUninstalled { agent_id })
        }
        Op::ToggleAgent { agent_id, enabled } => {
            registry.toggle(&agent_id, enabled)?;
            Ok(Event::AgentToggled { agent_id, enabled })
        }
        Op::ListAgents => Ok(Event::AgentList {
            agents: registry.list(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EchoModelClient;
    use crate::registry::RegistryError;
    use std::fs;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn test_ops_round_trip_through_registry() {
        let dir = tempdir().expect("Failed to create temp dir");
        fs::write(
            dir.path().join("agent.json"),
            r#"{"agent_id":"research","name":"Research","description":"d","version":"1.0.0","author":"a","main_module":"prompt"}"#,
        )
        .expect("Failed to write manifest");
        let registry = AgentRegistry::with_builtins(Arc::new(EchoModelClient::new()));

        let installed = handle_op(
            &registry,
            Op::InstallPackage {
                path: dir.path().to_path_buf(),
                force: false,
            },
        )
        .unwrap();
        assert!(matches!(installed, Event::AgentInstalled { ref agent_id, replaced: false, .. } if agent_id == "research"));

        let toggled = handle_op(
            &registry,
            Op::ToggleAgent {
                agent_id: "research".to_string(),
                enabled: false,
            },
        )
        .unwrap();
        assert!(matches!(toggled, Event::AgentToggled { enabled: false, .. }));

        match handle_op(&registry, Op::ListAgents).unwrap() {
            Event::AgentList { agents } => {
                assert_eq!(agents.len(), 1);
                assert!(!agents[0].enabled);
            }
            other => panic!("Expected AgentList, got {other:?}"),
        }

        handle_op(
            &registry,
            Op::UninstallAgent {
                agent_id: "research".to_string(),
            },
        )
        .unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_missing_package_is_config_error() {
        let dir = tempdir().expect("Failed to create temp dir");
        let registry = AgentRegistry::with_builtins(Arc::new(EchoModelClient::new()));

        let result = handle_op(
            &registry,
            Op::InstallPackage {
                path: dir.path().join("nothing-here"),
                force: false,
            },
        );

        assert!(matches!(result, Err(RegistryError::Config(_))));
    }
}
