//! # dk-core
//!
//! Agent plugin runtime and capability-based dispatch for dispatch-kit.
//!
//! This crate provides:
//! - The `Agent` contract, pluggable scoring and invocation hooks
//! - Model-backend clients agents generate text through
//! - The `AgentRegistry`: package discovery, validation and hot-swap
//! - The `CapabilityRouter`: deterministic agent selection
//! - The `Orchestrator`: concurrent dispatch, timeout/retry and merging
//! - Configuration loading from the `.dispatch-kit/` directory
//!
//! ## Modules
//!
//! - [`agents`]: Agent trait, scorers, hooks, factory and adapters
//! - [`model`]: `ModelClient` trait and backends
//! - [`registry`]: Agent registry and package management
//! - [`router`]: Capability routing
//! - [`orchestrator`]: Dispatch and aggregation
//! - [`config`]: Configuration loading and persistence
//! - [`init`]: Project scaffolding from embedded templates
//! - [`runtime`]: Bootstrap of a ready-to-use registry

pub mod agents;
pub mod config;
pub mod init;
pub mod model;
pub mod orchestrator;
pub mod registry;
pub mod router;
pub mod runtime;
