//! Errors raised at the Ollama HTTP boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OllamaError {
    /// The server could not be reached or the connection dropped.
    #[error("could not reach Ollama at {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("Ollama returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The body did not match the expected shape.
    #[error("unexpected response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("embedding count mismatch: sent {sent} inputs, received {received} vectors")]
    EmbeddingCount { sent: usize, received: usize },
}
