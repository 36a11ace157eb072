//! Folder ingestion: load, chunk, embed and store every supported document.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use super::chunker::chunk;
use super::embed::Embedder;
use super::loader::{has_extension, load_text};
use super::store::{ChunkMetadata, ChunkRecord, VectorStore};
use crate::constants::INGEST_EXTENSIONS;

/// Summary of one ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Supported files found under the folder.
    pub files: usize,
    /// Chunks embedded and added to the store.
    pub chunks: usize,
}

/// Ingests every `.txt`, `.md` and `.pdf` file below `folder`.
///
/// The folder is created when missing so a fresh checkout can ingest into an
/// empty store. Files that yield no chunks are counted but add nothing.
pub async fn ingest_docs(
    folder: &Path,
    store: &mut VectorStore,
    embedder: &dyn Embedder,
    chunk_words: usize,
) -> Result<IngestReport> {
    fs::create_dir_all(folder)
        .with_context(|| format!("Failed to create docs folder {:?}", folder))?;

    let files = find_documents(folder)?;
    info!(folder = %folder.display(), files = files.len(), "ingesting documents");

    let mut added = 0;
    for path in &files {
        let text = match load_text(path) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable document");
                continue;
            }
        };
        let chunks = chunk(&text, chunk_words);
        if chunks.is_empty() {
            continue;
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let source = path.to_string_lossy().into_owned();
        let embeddings = embedder
            .embed(&chunks)
            .await
            .with_context(|| format!("Failed to embed {:?}", path))?;
        if embeddings.len() != chunks.len() {
            bail!(
                "Embedder returned {} vectors for {} chunks of {:?}",
                embeddings.len(),
                chunks.len(),
                path
            );
        }

        let records: Vec<ChunkRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (document, embedding))| ChunkRecord {
                id: chunk_id(&file_name, i),
                document,
                metadata: ChunkMetadata {
                    source: source.clone(),
                    chunk: i,
                },
                embedding,
            })
            .collect();

        info!(path = %path.display(), chunks = records.len(), "embedded document");
        added += records.len();
        store.add(records)?;
    }

    Ok(IngestReport {
        files: files.len(),
        chunks: added,
    })
}

/// Supported files below `folder`, sorted for a stable ingestion order.
fn find_documents(folder: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/**/*",
        glob::Pattern::escape(&folder.to_string_lossy())
    );
    let mut files: Vec<PathBuf> = glob::glob(&pattern)
        .with_context(|| format!("Invalid docs folder {:?}", folder))?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .filter(|path| INGEST_EXTENSIONS.iter().any(|ext| has_extension(path, ext)))
        .collect();
    files.sort();
    Ok(files)
}

fn chunk_id(file_name: &str, index: usize) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{file_name}-{index}-{}", &suffix[..8])
}
