//! Callable tools offered to the model.
//!
//! Every tool implements [`Tool`]; the [`ToolRegistry`] advertises their
//! definitions to Ollama and dispatches calls by name. Tool failures never
//! abort the agent loop: they come back to the model as a JSON error payload.

pub mod calculator;
pub mod retrieve;
pub mod web_search;

use anyhow::{bail, Result};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::ollama::ToolSpec;

use calculator::CalculatorTool;
use retrieve::RetrieveTool;
use web_search::WebSearchTool;

/// Every tool implements this trait.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model uses to call this tool.
    fn name(&self) -> &str;

    /// Human-readable description sent with the tool definition.
    fn description(&self) -> &str;

    /// JSON Schema describing the tool's input parameters.
    fn schema(&self) -> Value;

    /// Execute the tool with normalized JSON object arguments.
    async fn execute(&self, input: Value) -> Result<Value>;
}

/// Holds all registered tools and dispatches calls by name.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool. Registration order is the order definitions are advertised in.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.tools.push(Arc::new(tool));
    }

    /// Create a registry with the three built-in tools.
    pub fn with_builtins(search: WebSearchTool, retrieve: RetrieveTool) -> Self {
        let mut registry = Self::new();
        registry.register(CalculatorTool);
        registry.register(search);
        registry.register(retrieve);
        registry
    }

    /// Produce definitions for the model (sent in the chat request).
    pub fn definitions(&self) -> Vec<ToolSpec> {
        self.tools
            .iter()
            .map(|t| ToolSpec::function(t.name(), t.description(), t.schema()))
            .collect()
    }

    /// Look up a tool by name and execute it.
    ///
    /// Always yields a string for the conversation: the tool's JSON output on
    /// success, or an `{"error": ...}` object when the tool is unknown or fails.
    pub async fn execute(&self, name: &str, input: Value) -> String {
        let Some(tool) = self.tools.iter().find(|t| t.name() == name) else {
            warn!(tool = name, "model requested an unknown tool");
            return json!({ "error": format!("Unknown tool {name}") }).to_string();
        };

        debug!(tool = name, %input, "executing tool");
        match tool.execute(input).await {
            Ok(output) => output.to_string(),
            Err(e) => {
                warn!(tool = name, error = %e, "tool failed");
                json!({ "error": e.to_string(), "trace": format!("{e:?}") }).to_string()
            }
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads a required string argument.
pub(crate) fn str_arg<'a>(input: &'a Value, key: &str) -> Result<&'a str> {
    match input.get(key) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => bail!("'{key}' must be a string, got {other}"),
        None => bail!("missing required argument '{key}'"),
    }
}

/// Reads an optional count argument, accepting integers, floats (truncated)
/// and numeric strings.
pub(crate) fn count_arg(input: &Value, key: &str, default: usize) -> Result<usize> {
    let value = match input.get(key) {
        None | Some(Value::Null) => return Ok(default),
        Some(v) => v,
    };
    let parsed = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.trunc() as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    match parsed {
        Some(n) => Ok(usize::try_from(n)?),
        None => bail!("'{key}' must be a non-negative integer, got {value}"),
    }
}

#[cfg(test)]
mod tests;
