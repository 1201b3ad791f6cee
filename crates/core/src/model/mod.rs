//! Language-model backend access.
//!
//! Agents never talk to a backend directly. They hold an
//! `Arc<dyn ModelClient>` injected by the factory, which keeps them
//! testable with [`ScriptedModelClient`] and runnable offline with
//! [`EchoModelClient`].

pub mod client;
pub mod command_client;
pub mod echo_client;
pub mod scripted;

pub use client::{GenerateRequest, Generation, ModelClient, ModelError};
pub use command_client::CommandModelClient;
pub use echo_client::EchoModelClient;
pub use scripted::ScriptedModelClient;
