//! Message types for hearth's conversation history.
//!
//! [`Message`] mirrors the Ollama `/api/chat` wire format directly, so the
//! history the agent keeps is exactly what gets sent to the model and what
//! gets persisted to session files.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub function: FunctionCall,
}

/// Name and raw arguments of a requested tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Usually a JSON object, but some models send a JSON-encoded string.
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            function: FunctionCall {
                name: name.into(),
                arguments,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }

    /// Normalizes the call arguments into a JSON object.
    ///
    /// Objects pass through, JSON strings are decoded, blank strings and any
    /// other shape become an empty object.
    pub fn arguments(&self) -> Result<Value> {
        match &self.function.arguments {
            Value::Object(_) => Ok(self.function.arguments.clone()),
            Value::String(raw) if raw.trim().is_empty() => Ok(Value::Object(Map::new())),
            Value::String(raw) => {
                let parsed: Value = serde_json::from_str(raw)
                    .with_context(|| format!("Invalid JSON arguments for {}", self.name()))?;
                if !parsed.is_object() {
                    bail!("Arguments for {} must be a JSON object", self.name());
                }
                Ok(parsed)
            }
            _ => Ok(Value::Object(Map::new())),
        }
    }
}

/// The role of a message sender in the conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Set on `tool` messages: which tool produced this result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_name: None,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    /// An assistant turn that requested tools instead of answering.
    pub fn assistant_with_tools(text: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::new(Role::Assistant, text)
        }
    }

    /// The result of running `tool_name`, fed back to the model.
    pub fn tool_result(tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_name: Some(tool_name.into()),
            ..Self::new(Role::Tool, content)
        }
    }

    pub fn text(&self) -> &str {
        &self.content
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}
