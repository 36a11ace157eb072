//! HTTP client for Ollama's chat, embedding, model listing and create endpoints.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::error::OllamaError;
use super::types::{
    ApiErrorBody, ChatRequest, ChatResponse, CreateModelRequest, EmbedRequest, EmbedResponse,
    TagsResponse,
};

/// Client for a single Ollama server.
#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    http: reqwest::Client,
}

impl OllamaClient {
    /// Creates a client for the server at `base_url` (e.g. `http://localhost:11434`).
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends one chat turn and returns the model's reply.
    ///
    /// When the request offers tools the reply may carry `tool_calls`
    /// instead of (or alongside) text content.
    pub async fn chat(&self, request: &ChatRequest<'_>) -> Result<ChatResponse, OllamaError> {
        debug!(
            model = request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "chat request"
        );
        let response: ChatResponse = self.post_json("api/chat", request).await?;
        debug!(
            model = %response.model,
            done = response.done,
            tool_calls = response.message.tool_calls.len(),
            prompt_eval_count = response.prompt_eval_count,
            eval_count = response.eval_count,
            "chat response"
        );
        Ok(response)
    }

    /// Embeds every input with `model`, preserving order.
    pub async fn embed(&self, model: &str, input: &[String]) -> Result<Vec<Vec<f32>>, OllamaError> {
        debug!(model, inputs = input.len(), "embed request");
        let response: EmbedResponse = self
            .post_json("api/embed", &EmbedRequest { model, input })
            .await?;
        if response.embeddings.len() != input.len() {
            return Err(OllamaError::EmbeddingCount {
                sent: input.len(),
                received: response.embeddings.len(),
            });
        }
        Ok(response.embeddings)
    }

    /// Names of the models installed on the server.
    pub async fn list_models(&self) -> Result<Vec<String>, OllamaError> {
        let url = self.url("api/tags");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| OllamaError::Transport {
                url: url.clone(),
                source,
            })?;
        let tags: TagsResponse = Self::decode(&url, response).await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Registers a derived model built from a base model, system prompt and parameters.
    pub async fn create_model(&self, request: &CreateModelRequest) -> Result<(), OllamaError> {
        debug!(model = %request.model, from = %request.from, "create model");
        let _: serde_json::Value = self.post_json("api/create", request).await?;
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, OllamaError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.url(path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| OllamaError::Transport {
                url: url.clone(),
                source,
            })?;
        Self::decode(&url, response).await
    }

    /// Maps non-2xx statuses to [`OllamaError::Api`] and decodes the body otherwise.
    async fn decode<R: DeserializeOwned>(
        url: &str,
        response: reqwest::Response,
    ) -> Result<R, OllamaError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|source| OllamaError::Transport {
                url: url.to_string(),
                source,
            })?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|body| body.error)
                .unwrap_or(text);
            return Err(OllamaError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text).map_err(|source| OllamaError::Decode {
            endpoint: url.to_string(),
            source,
        })
    }
}
