//! Inter-process communication protocol.
//!
//! This module defines the message types exchanged between an administrative
//! surface (CLI, admin endpoint) and the core runtime.
//!
//! The protocol follows an Operation/Event pattern:
//! - `Op`: Registry commands sent to the core
//! - `Event`: Dispatch progress and registry changes emitted by the core

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use ts_rs::TS;
use uuid::Uuid;

use crate::dispatch_models::{AgentListing, AgentScore, DispatchState};
use crate::response_models::{AgentStatus, ErrorCode};

/// Registry operations sent from an administrative surface to the core.
///
/// Uses tagged enum serialization for TypeScript compatibility:
/// ```json
/// {
///   "type": "installPackage",
///   "payload": {
///     "path": "/srv/agents/research",
///     "force": false
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Op {
    /// Install (or with `force`, hot-swap) the package at `path`.
    InstallPackage { path: PathBuf, force: bool },

    /// Remove an installed agent.
    UninstallAgent { agent_id: String },

    /// Flip routing eligibility without unloading the agent.
    ToggleAgent { agent_id: String, enabled: bool },

    /// Request the current registry listing.
    ListAgents,
}

/// Events emitted by the core.
///
/// ```json
/// {
///   "type": "agentFinished",
///   "payload": {
///     "dispatch_id": "uuid-here",
///     "agent_id": "coding",
///     "status": "COMPLETED",
///     "error_code": null,
///     "execution_time_ms": 812
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Event {
    /// A request entered the orchestrator.
    DispatchStarted {
        #[ts(type = "string")]
        dispatch_id: Uuid,
        message: String,
    },

    /// The router chose which agents will run.
    AgentsSelected {
        #[ts(type = "string")]
        dispatch_id: Uuid,
        agents: Vec<String>,
        scores: Vec<AgentScore>,
        fallback_used: bool,
    },

    /// One agent task resolved.
    AgentFinished {
        #[ts(type = "string")]
        dispatch_id: Uuid,
        agent_id: String,
        status: AgentStatus,
        error_code: Option<ErrorCode>,
        execution_time_ms: u64,
    },

    /// The dispatch merged at least one successful response.
    DispatchCompleted {
        #[ts(type = "string")]
        dispatch_id: Uuid,
        agents_used: Vec<String>,
        total_time_ms: u64,
    },

    /// The dispatch ended without any successful response.
    DispatchFailed {
        #[ts(type = "string")]
        dispatch_id: Uuid,
        state: DispatchState,
        error: String,
    },

    AgentInstalled {
        agent_id: String,
        version: String,
        replaced: bool,
    },

    AgentUninstalled { agent_id: String },

    AgentToggled { agent_id: String, enabled: bool },

    AgentList { agents: Vec<AgentListing> },
}
