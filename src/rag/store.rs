//! Local vector store.
//!
//! Each collection is an append-only JSONL file under the store directory,
//! one [`ChunkRecord`] per line. Queries load the collection and rank every
//! record by cosine distance; collections here are small enough that a
//! linear scan beats maintaining an index.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Where a chunk came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub chunk: usize,
}

/// A stored chunk together with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: String,
    pub document: String,
    pub metadata: ChunkMetadata,
    pub embedding: Vec<f32>,
}

/// A query result: the record and its cosine distance to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryHit {
    pub record: ChunkRecord,
    pub distance: f32,
}

/// One collection of embedded chunks, persisted as JSONL.
pub struct VectorStore {
    path: PathBuf,
    records: Vec<ChunkRecord>,
}

impl VectorStore {
    /// Opens `collection` under `dir`. A missing collection is empty.
    pub fn open(dir: &Path, collection: &str) -> Result<Self> {
        let path = dir.join(format!("{collection}.jsonl"));
        let mut records = Vec::new();

        if path.exists() {
            let file = fs::File::open(&path)
                .with_context(|| format!("Failed to open collection {:?}", path))?;
            for (line_no, line) in BufReader::new(file).lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let record: ChunkRecord = serde_json::from_str(&line).with_context(|| {
                    format!("Corrupt record on line {} of {:?}", line_no + 1, path)
                })?;
                records.push(record);
            }
        }

        debug!(path = %path.display(), records = records.len(), "opened collection");
        Ok(Self { path, records })
    }

    /// Appends records to the collection and flushes them to disk.
    pub fn add(&mut self, records: Vec<ChunkRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        // The first record of a fresh collection fixes its dimension.
        let dims = self
            .dimensions()
            .unwrap_or_else(|| records[0].embedding.len());
        if dims == 0 {
            bail!("Embedding for {} is empty", records[0].id);
        }
        if let Some(bad) = records.iter().find(|r| r.embedding.len() != dims) {
            bail!(
                "Embedding for {} has {} dimensions, collection uses {}",
                bad.id,
                bad.embedding.len(),
                dims
            );
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create store directory {:?}", parent))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open collection {:?}", self.path))?;
        let mut writer = BufWriter::new(file);
        for record in &records {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;

        self.records.extend(records);
        Ok(())
    }

    /// Returns up to `n` records nearest to `vector`, closest first.
    pub fn query(&self, vector: &[f32], n: usize) -> Result<Vec<QueryHit>> {
        if let Some(dims) = self.dimensions() {
            if dims != vector.len() {
                bail!(
                    "Query has {} dimensions, collection uses {}",
                    vector.len(),
                    dims
                );
            }
        }

        let mut ranked: Vec<(f32, usize)> = self
            .records
            .iter()
            .enumerate()
            .map(|(i, record)| (cosine_distance(&record.embedding, vector), i))
            .collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        Ok(ranked
            .into_iter()
            .take(n)
            .map(|(distance, i)| QueryHit {
                record: self.records[i].clone(),
                distance,
            })
            .collect())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn dimensions(&self) -> Option<usize> {
        self.records.first().map(|r| r.embedding.len())
    }
}

/// `1 - cos(a, b)`; a zero vector is treated as orthogonal to everything.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}
