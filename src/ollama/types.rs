//! Request and response bodies for the Ollama REST API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::message::Message;

/// Sampling options sent with every chat request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChatOptions {
    pub num_ctx: u32,
    pub temperature: f32,
}

/// A tool advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments.
    pub parameters: Value,
}

impl ToolSpec {
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            kind: "function".to_string(),
            function: FunctionSpec {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

/// Body of `POST /api/chat`.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    #[serde(skip_serializing_if = "no_tools")]
    pub tools: &'a [ToolSpec],
    pub stream: bool,
    pub options: ChatOptions,
}

fn no_tools(tools: &&[ToolSpec]) -> bool {
    tools.is_empty()
}

impl<'a> ChatRequest<'a> {
    /// Builds a non-streaming request. Pass an empty slice to offer no tools.
    pub fn new(
        model: &'a str,
        messages: &'a [Message],
        tools: &'a [ToolSpec],
        options: ChatOptions,
    ) -> Self {
        Self {
            model,
            messages,
            tools,
            stream: false,
            options,
        }
    }
}

/// Body returned by a non-streaming `POST /api/chat`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub model: String,
    pub message: Message,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub eval_count: Option<u64>,
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
}

#[derive(Debug, Serialize)]
pub(super) struct EmbedRequest<'a> {
    pub model: &'a str,
    pub input: &'a [String],
}

#[derive(Debug, Deserialize)]
pub(super) struct EmbedResponse {
    #[serde(default)]
    pub embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TagsResponse {
    #[serde(default)]
    pub models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ModelTag {
    pub name: String,
}

/// Body of `POST /api/create`: derive a named model from a base model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateModelRequest {
    pub model: String,
    pub from: String,
    pub system: String,
    pub parameters: Map<String, Value>,
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct ApiErrorBody {
    pub error: String,
}
