//! # dk-protocol
//!
//! Core protocol definitions and data models for dispatch-kit.
//!
//! This crate defines all shared data structures used for:
//! - Agent identity and policy (`AgentConfig`) and package manifests
//! - Invocation results (`AgentResponse`) and dispatch outcomes
//! - Configuration file parsing (`.dispatch-kit/config.toml`)
//! - Communication between an administrative surface and the core
//!
//! ## Modules
//!
//! - [`agent_models`]: Agent configuration, health and capability structures
//! - [`response_models`]: Agent responses, statuses, error codes and artifacts
//! - [`manifest_models`]: Installable package manifests
//! - [`dispatch_models`]: Request context, scores, dispatch results and listings
//! - [`config_models`]: Global configuration from config.toml
//! - [`ipc`]: Operations and Events for admin/core communication
//!
//! ## Design Principles
//!
//! - Minimal dependencies: serde, ts-rs, uuid and chrono
//! - TypeScript generation: All types derive `TS` for client compatibility
//! - Independent compilation: No dependencies on other dispatch-kit crates

pub mod agent_models;
pub mod config_models;
pub mod dispatch_models;
pub mod ipc;
pub mod manifest_models;
pub mod response_models;

// Re-export all public types for convenience
pub use agent_models::*;
pub use config_models::*;
pub use dispatch_models::*;
pub use ipc::*;
pub use manifest_models::*;
pub use response_models::*;
