//! Common test utilities and helpers for integration tests.
//!
//! This module provides shared functionality across all integration tests including:
//! - Test fixtures (registries, packages on disk)
//! - Custom assertions
//! - Mock agents and hooks

pub mod assertions;
pub mod fixtures;
pub mod mock_agents;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use mock_agents::*;
