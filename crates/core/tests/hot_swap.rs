//! Registry mutations while dispatches are in flight.
//!
//! A dispatch captures the agent instances it selected. Replacing,
//! disabling or removing an agent only affects dispatches that route
//! after the change.

mod common;

use common::*;
use dk_core::model::EchoModelClient;
use dk_core::orchestrator::Orchestrator;
use dk_core::registry::{AgentPackage, AgentRegistry, RegistryError};
use dk_core::router::RoutingPolicy;
use dk_protocol::{AgentManifest, DispatchResult, ErrorCode, RequestContext};
use std::sync::Arc;
use tokio::task::JoinHandle;

const IN_FLIGHT: usize = 10;

fn worker_manifest(version: &str) -> AgentManifest {
    let mut manifest = manifest("worker", version, GATED_ENTRY_POINT);
    manifest.config.base_score = Some(1.0);
    manifest.config.retry_count = Some(0);
    manifest
}

fn gated_setup() -> (Arc<Gate>, Arc<AgentRegistry>, Arc<Orchestrator>) {
    let gate = Gate::new();
    let registry = Arc::new(AgentRegistry::new(
        gated_factory(Arc::clone(&gate)),
        Arc::new(EchoModelClient::new()),
    ));
    registry
        .install(&AgentPackage::from_manifest(worker_manifest("1.0.0")), false)
        .unwrap();
    let orchestrator = Arc::new(Orchestrator::new(Arc::clone(&registry), RoutingPolicy::default()));
    (gate, registry, orchestrator)
}

fn spawn_dispatches(orchestrator: &Arc<Orchestrator>, count: usize) -> Vec<JoinHandle<DispatchResult>> {
    (0..count)
        .map(|i| {
            let orchestrator = Arc::clone(orchestrator);
            tokio::spawn(async move {
                orchestrator
                    .route_and_dispatch(&format!("task {i}"), &RequestContext::new())
                    .await
            })
        })
        .collect()
}

/// RED: In-flight dispatches finish on the old instance; new ones use the new one.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_force_install_during_dispatch() {
    let (gate, registry, orchestrator) = gated_setup();

    let handles = spawn_dispatches(&orchestrator, IN_FLIGHT);
    gate.wait_started(IN_FLIGHT).await;

    let outcome = registry
        .install(&AgentPackage::from_manifest(worker_manifest("2.0.0")), true)
        .unwrap();
    assert!(outcome.replaced);
    assert!(!outcome.unchanged);
    assert_eq!(registry.entry("worker").unwrap().config.version, "2.0.0");

    gate.open(IN_FLIGHT);
    for handle in handles {
        let result = handle.await.unwrap();
        assert_completed(&result, &["worker"]);
        assert_eq!(result.content, "worker v1.0.0");
    }

    gate.open(1);
    let result = orchestrator.route_and_dispatch("after swap", &RequestContext::new()).await;
    assert_completed(&result, &["worker"]);
    assert_eq!(result.content, "worker v2.0.0");
}

/// Without `force` a different version is rejected and nothing changes.
#[tokio::test]
async fn test_install_conflict_keeps_existing() {
    let (gate, registry, orchestrator) = gated_setup();

    let result = registry.install(&AgentPackage::from_manifest(worker_manifest("2.0.0")), false);

    if let Err(RegistryError::Conflict {
        agent_id,
        existing_version,
        new_version,
    }) = result
    {
        assert_eq!(agent_id, "worker");
        assert_eq!(existing_version, "1.0.0");
        assert_eq!(new_version, "2.0.0");
    } else {
        panic!("Expected Conflict error, got: {result:?}");
    }

    gate.open(1);
    let result = orchestrator.route_and_dispatch("hello", &RequestContext::new()).await;
    assert_eq!(result.content, "worker v1.0.0");
}

/// Re-installing the same version is a no-op that keeps the live instance.
#[tokio::test]
async fn test_reinstall_same_version_is_noop() {
    let (_gate, registry, _orchestrator) = gated_setup();
    let before = registry.get("worker").unwrap();

    let outcome = registry
        .install(&AgentPackage::from_manifest(worker_manifest("1.0.0")), false)
        .unwrap();

    assert!(outcome.unchanged);
    assert!(!outcome.replaced);
    assert!(Arc::ptr_eq(&before, &registry.get("worker").unwrap()));
}

/// A hot-swap keeps the enabled flag of the replaced entry.
#[tokio::test]
async fn test_force_install_keeps_disabled_flag() {
    let (_gate, registry, _orchestrator) = gated_setup();
    registry.toggle("worker", false).unwrap();

    registry
        .install(&AgentPackage::from_manifest(worker_manifest("2.0.0")), true)
        .unwrap();

    assert!(!registry.entry("worker").unwrap().enabled);
}

/// Disabling an agent does not cancel dispatches that already selected it.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_disable_during_dispatch() {
    let (gate, registry, orchestrator) = gated_setup();

    let handles = spawn_dispatches(&orchestrator, 3);
    gate.wait_started(3).await;

    assert!(registry.toggle("worker", false).unwrap(), "was enabled");

    gate.open(3);
    for handle in handles {
        assert_completed(&handle.await.unwrap(), &["worker"]);
    }

    let result = orchestrator.route_and_dispatch("after disable", &RequestContext::new()).await;
    assert_failed_with(&result, ErrorCode::NoAgentAvailable);
}

/// Uninstalling an agent lets in-flight dispatches finish.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_uninstall_during_dispatch() {
    let (gate, registry, orchestrator) = gated_setup();

    let handles = spawn_dispatches(&orchestrator, 3);
    gate.wait_started(3).await;

    let removed = registry.uninstall("worker").unwrap();
    assert_eq!(removed.version, "1.0.0");
    assert!(registry.is_empty());

    gate.open(3);
    for handle in handles {
        let result = handle.await.unwrap();
        assert_completed(&result, &["worker"]);
        assert_eq!(result.content, "worker v1.0.0");
    }

    let result = orchestrator.route_and_dispatch("after uninstall", &RequestContext::new()).await;
    assert_failed_with(&result, ErrorCode::NoAgentAvailable);
}

/// Concurrent installs of different agents all land.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_installs() {
    let registry = Arc::new(AgentRegistry::with_builtins(Arc::new(EchoModelClient::new())));

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let registry = Arc::clone(&registry);
            tokio::task::spawn_blocking(move || {
                let package = AgentPackage::from_manifest(manifest(&format!("agent-{i:02}"), "1.0.0", "prompt"));
                registry.install(&package, false)
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let ids: Vec<_> = registry.list().into_iter().map(|l| l.agent_id).collect();
    assert_eq!(ids.len(), 16);
    assert_eq!(ids.first().map(String::as_str), Some("agent-00"));
    assert_eq!(ids.last().map(String::as_str), Some("agent-15"));
}
