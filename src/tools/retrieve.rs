//! Retrieve tool: semantic search over the ingested documents.

use anyhow::Result;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{count_arg, str_arg, Tool};
use crate::rag::Rag;

pub struct RetrieveTool {
    rag: Arc<Rag>,
    default_k: usize,
}

impl RetrieveTool {
    pub fn new(rag: Arc<Rag>, default_k: usize) -> Self {
        Self { rag, default_k }
    }
}

#[async_trait::async_trait]
impl Tool for RetrieveTool {
    fn name(&self) -> &str {
        "retrieve"
    }

    fn description(&self) -> &str {
        "Retrieve top matching snippets from local docs. Returns JSON with source, chunk_index, text, score."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" },
                "k": { "type": "integer" }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let query = str_arg(&input, "query")?;
        let k = count_arg(&input, "k", self.default_k)?;
        let chunks = self.rag.retrieve_chunks(query, k).await?;
        Ok(serde_json::to_value(chunks)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::embed::Embedder;
    use crate::rag::store::{ChunkMetadata, ChunkRecord, VectorStore};

    struct ConstantEmbedder;

    #[async_trait::async_trait]
    impl Embedder for ConstantEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    fn seeded_tool(dir: &std::path::Path) -> RetrieveTool {
        let mut store = VectorStore::open(dir, "docs").unwrap();
        let records = (0..3)
            .map(|i| ChunkRecord {
                id: format!("notes.md-{i}-0000000{i}"),
                document: format!("chunk {i}"),
                metadata: ChunkMetadata {
                    source: "docs/notes.md".to_string(),
                    chunk: i,
                },
                embedding: vec![1.0, i as f32],
            })
            .collect();
        store.add(records).unwrap();

        let rag = Rag::new(Arc::new(ConstantEmbedder), dir, "docs", 350);
        RetrieveTool::new(Arc::new(rag), 5)
    }

    #[tokio::test]
    async fn test_retrieve_returns_scored_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let tool = seeded_tool(dir.path());

        let out = tool.execute(json!({"query": "notes", "k": "2"})).await.unwrap();
        let hits = out.as_array().unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0]["source"], "docs/notes.md");
        assert_eq!(hits[0]["chunk_index"], 0);
        assert_eq!(hits[0]["text"], "chunk 0");
        assert!((hits[0]["score"].as_f64().unwrap() - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_retrieve_uses_default_k() {
        let dir = tempfile::tempdir().unwrap();
        let tool = seeded_tool(dir.path());
        let out = tool.execute(json!({"query": "notes"})).await.unwrap();
        assert_eq!(out.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_retrieve_requires_query() {
        let dir = tempfile::tempdir().unwrap();
        let tool = seeded_tool(dir.path());
        assert!(tool.execute(json!({"k": 2})).await.is_err());
    }
}
