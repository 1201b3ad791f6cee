//! Agent abstraction.
//!
//! This module provides the `Agent` trait, pluggable relevance scoring,
//! invocation hooks, the entry-point factory and the built-in adapters.

pub mod adapters;
pub mod base;
pub mod factory;
pub mod hooks;
pub mod scoring;

pub use adapters::{CodingAgent, MockAgent, MockBehavior, PromptAgent, ResearchAgent};
pub use base::{validate_input, Agent, AgentError, MAX_INPUT_CHARS};
pub use factory::{AgentBuilder, AgentFactory, CODING_ENTRY_POINT, PROMPT_ENTRY_POINT, RESEARCH_ENTRY_POINT};
pub use hooks::{AgentHook, AgentMetrics, HookList, MetricsHook, TracingHook};
pub use scoring::{clamp_score, KeywordScorer, PatternScorer, ScoreChain, Scorer};
