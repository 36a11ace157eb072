//! Client for the local Ollama inference server.
//!
//! Replaces a hosted-provider abstraction with a direct HTTP client because
//! the agent needs to see every tool call the model makes: the loop in
//! [`crate::agent`] drives `/api/chat` itself rather than delegating it.

mod client;
mod error;
mod types;

pub use client::OllamaClient;
pub use error::OllamaError;
pub use types::{ChatOptions, ChatRequest, CreateModelRequest, ToolSpec};
