use super::*;
use crate::rag::embed::Embedder;
use crate::rag::Rag;
use serde_json::json;
use std::time::Duration;

struct NullEmbedder;

#[async_trait::async_trait]
impl Embedder for NullEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![1.0]).collect())
    }
}

struct FailingTool;

#[async_trait::async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "explode"
    }

    fn description(&self) -> &str {
        "Always fails."
    }

    fn schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _input: Value) -> Result<Value> {
        Err(anyhow::anyhow!("boom")).map_err(|e| e.context("while exploding"))
    }
}

fn builtins(store_dir: &std::path::Path) -> ToolRegistry {
    let search = WebSearchTool::new("http://127.0.0.1:9/html/", 5, Duration::from_secs(1)).unwrap();
    let rag = Rag::new(Arc::new(NullEmbedder), store_dir, "docs", 350);
    ToolRegistry::with_builtins(search, RetrieveTool::new(Arc::new(rag), 5))
}

#[tokio::test]
async fn test_registry_with_builtins() {
    let dir = tempfile::tempdir().unwrap();
    let registry = builtins(dir.path());
    assert_eq!(registry.names(), vec!["calculator", "web_search", "retrieve"]);

    let defs = registry.definitions();
    assert_eq!(defs.len(), 3);
    assert!(defs.iter().all(|d| d.kind == "function"));
    assert_eq!(defs[0].function.name, "calculator");
    assert_eq!(defs[0].function.parameters["required"], json!(["expression"]));
    assert_eq!(defs[2].function.parameters["properties"]["k"]["type"], "integer");
    assert_eq!(
        defs[2].function.description,
        "Retrieve top matching snippets from local docs. Returns JSON with source, chunk_index, text, score."
    );
}

#[tokio::test]
async fn test_calculator_through_registry() {
    let dir = tempfile::tempdir().unwrap();
    let registry = builtins(dir.path());
    let out = registry
        .execute("calculator", json!({"expression": "2 ** 10 - 24"}))
        .await;
    assert_eq!(out, r#"{"result":"1000"}"#);
}

#[tokio::test]
async fn test_unknown_tool() {
    let registry = ToolRegistry::new();
    let out = registry.execute("nonexistent_tool", json!({})).await;
    let parsed: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed, json!({"error": "Unknown tool nonexistent_tool"}));
}

#[tokio::test]
async fn test_tool_error_becomes_payload() {
    let mut registry = ToolRegistry::default();
    registry.register(FailingTool);
    let out = registry.execute("explode", json!({})).await;
    let parsed: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["error"], "while exploding");
    assert!(parsed["trace"].as_str().unwrap().contains("boom"));
}

#[tokio::test]
async fn test_calculator_error_becomes_payload() {
    let dir = tempfile::tempdir().unwrap();
    let registry = builtins(dir.path());
    let out = registry
        .execute("calculator", json!({"expression": "__import__('os')"}))
        .await;
    let parsed: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["error"], "Unsafe expression");
}

#[tokio::test]
async fn test_deeply_nested_expression_becomes_payload() {
    let dir = tempfile::tempdir().unwrap();
    let registry = builtins(dir.path());
    let expression = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
    let out = registry
        .execute("calculator", json!({ "expression": expression }))
        .await;
    let parsed: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["error"], "expression too deeply nested");
}

#[tokio::test]
async fn test_retrieve_on_empty_store() {
    let dir = tempfile::tempdir().unwrap();
    let registry = builtins(dir.path());
    let out = registry.execute("retrieve", json!({"query": "x"})).await;
    assert_eq!(out, "[]");
}

#[test]
fn test_count_arg_forms() {
    assert_eq!(count_arg(&json!({}), "k", 5).unwrap(), 5);
    assert_eq!(count_arg(&json!({"k": null}), "k", 5).unwrap(), 5);
    assert_eq!(count_arg(&json!({"k": 3}), "k", 5).unwrap(), 3);
    assert_eq!(count_arg(&json!({"k": 3.9}), "k", 5).unwrap(), 3);
    assert_eq!(count_arg(&json!({"k": " 7 "}), "k", 5).unwrap(), 7);
    assert!(count_arg(&json!({"k": "many"}), "k", 5).is_err());
    assert!(count_arg(&json!({"k": -1}), "k", 5).is_err());
}

#[test]
fn test_str_arg() {
    let input = json!({"query": "rust", "n": 1});
    assert_eq!(str_arg(&input, "query").unwrap(), "rust");
    assert!(str_arg(&input, "n").is_err());
    assert!(str_arg(&input, "missing").is_err());
}
