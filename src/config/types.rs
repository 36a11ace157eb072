//! Struct definitions and serde defaults for hearth configuration.

use serde::{Deserialize, Serialize};

/// Root configuration for hearth, deserialized from `config.toml`.
///
/// Every field has a serde default so hearth runs with no config file at
/// all. Section values are optional; accessors in `resolve.rs` fall back to
/// the constants.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Model the agent chats with (e.g. `"llama3.1:8b-expert"`).
    #[serde(default = "default_model")]
    pub model: String,
    /// Model the Modelfile derives from.
    #[serde(default = "default_base_model")]
    pub base_model: String,
    /// System prompt at the top of every conversation and in the Modelfile.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Ollama server and inference options.
    #[serde(default)]
    pub ollama: OllamaConfig,
    /// Reasoning loop settings.
    #[serde(default)]
    pub agent: AgentConfig,
    /// Document ingestion and retrieval.
    #[serde(default)]
    pub rag: RagConfig,
    /// Web search tool.
    #[serde(default)]
    pub search: SearchConfig,
}

pub(super) fn default_model() -> String {
    crate::constants::DEFAULT_MODEL.to_string()
}

pub(super) fn default_base_model() -> String {
    crate::constants::DEFAULT_BASE_MODEL.to_string()
}

pub(super) fn default_system_prompt() -> String {
    crate::constants::DEFAULT_SYSTEM_PROMPT.to_string()
}

/// Connection and sampling settings for the Ollama server.
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
pub struct OllamaConfig {
    /// Server URL. `HEARTH_OLLAMA_URL` or `OLLAMA_HOST` take precedence.
    pub base_url: Option<String>,
    /// Context window size requested per chat.
    pub num_ctx: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
}

/// Tool-calling loop settings.
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
pub struct AgentConfig {
    /// Model round-trips allowed before tools are withdrawn.
    pub max_iterations: Option<usize>,
    /// Send each draft answer through the reviewer.
    pub reflection: Option<bool>,
}

/// Ingestion and retrieval settings.
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
pub struct RagConfig {
    pub docs_dir: Option<String>,
    pub store_dir: Option<String>,
    pub collection: Option<String>,
    pub embedding_model: Option<String>,
    pub chunk_words: Option<usize>,
    pub top_k: Option<usize>,
}

/// Web search settings.
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
pub struct SearchConfig {
    pub max_results: Option<usize>,
    pub endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_model: default_base_model(),
            system_prompt: default_system_prompt(),
            ollama: OllamaConfig::default(),
            agent: AgentConfig::default(),
            rag: RagConfig::default(),
            search: SearchConfig::default(),
        }
    }
}
