//! Retrieval-augmented generation: document ingestion and chunk retrieval.
//!
//! Documents are loaded ([`loader`]), split into paragraph-packed chunks
//! ([`chunker`]), embedded ([`embed`]) and appended to a JSONL-backed
//! collection ([`store`]). Retrieval embeds the query and ranks stored chunks
//! by cosine similarity.

pub mod chunker;
pub mod embed;
pub mod ingest;
pub mod loader;
pub mod store;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::ollama::OllamaClient;
use embed::{Embedder, OllamaEmbedder};
use ingest::{ingest_docs, IngestReport};
use store::VectorStore;

/// A chunk returned by [`Rag::retrieve_chunks`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    pub source: String,
    pub chunk_index: usize,
    pub text: String,
    /// `1 - cosine distance`; higher is closer.
    pub score: f32,
}

/// Ingestion and retrieval against one collection.
pub struct Rag {
    embedder: Arc<dyn Embedder>,
    store_dir: PathBuf,
    collection: String,
    chunk_words: usize,
}

impl Rag {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store_dir: impl Into<PathBuf>,
        collection: impl Into<String>,
        chunk_words: usize,
    ) -> Self {
        Self {
            embedder,
            store_dir: store_dir.into(),
            collection: collection.into(),
            chunk_words,
        }
    }

    pub fn from_config(config: &Config, client: OllamaClient) -> Self {
        let embedder = OllamaEmbedder::new(client, config.embedding_model());
        Self::new(
            Arc::new(embedder),
            config.store_dir(),
            config.collection(),
            config.chunk_words(),
        )
    }

    /// Ingests every supported document under `folder` into the collection.
    pub async fn ingest(&self, folder: &Path) -> Result<IngestReport> {
        let mut store = self.open_store()?;
        ingest_docs(folder, &mut store, self.embedder.as_ref(), self.chunk_words).await
    }

    /// Returns the `k` chunks most similar to `query`, best first.
    ///
    /// The collection is reopened on each call so chunks ingested by another
    /// command are visible without restarting.
    pub async fn retrieve_chunks(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        let store = self.open_store()?;
        if store.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut vectors = self
            .embedder
            .embed(&[query.to_string()])
            .await
            .context("Failed to embed query")?;
        let vector = vectors
            .pop()
            .context("Embedder returned no vector for the query")?;

        let hits = store.query(&vector, k)?;
        debug!(query, k, hits = hits.len(), "retrieved chunks");
        Ok(hits
            .into_iter()
            .map(|hit| RetrievedChunk {
                source: hit.record.metadata.source,
                chunk_index: hit.record.metadata.chunk,
                text: hit.record.document,
                score: 1.0 - hit.distance,
            })
            .collect())
    }

    fn open_store(&self) -> Result<VectorStore> {
        VectorStore::open(&self.store_dir, &self.collection)
    }
}
