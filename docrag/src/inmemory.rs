//! In-memory vector index using cosine similarity.
//!
//! This module provides [`InMemoryVectorIndex`], a zero-dependency vector
//! index backed by a `HashMap` protected by a `tokio::sync::RwLock`. It is
//! suitable for development, testing, and single-process use.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::{EmbeddedChunk, ScoredChunk};
use crate::error::{RagError, Result};
use crate::vectorstore::{SchemaStatus, VectorIndex};

const BACKEND: &str = "in-memory";

#[derive(Debug)]
struct IndexData {
    dimension: usize,
    entries: Vec<EmbeddedChunk>,
}

/// An append-only in-memory vector index.
///
/// Every index remembers the dimension it was created with and rejects
/// vectors of any other length. Upserting never replaces existing entries,
/// so ingesting the same content twice stores it twice.
#[derive(Debug, Default)]
pub struct InMemoryVectorIndex {
    indexes: RwLock<HashMap<String, IndexData>>,
}

impl InMemoryVectorIndex {
    /// Create a new empty in-memory vector index.
    pub fn new() -> Self {
        Self::default()
    }
}

fn missing_index(name: &str) -> RagError {
    RagError::Index { backend: BACKEND.to_string(), message: format!("index '{name}' does not exist") }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn ensure_schema(&self, name: &str, dimension: usize) -> Result<SchemaStatus> {
        let mut indexes = self.indexes.write().await;
        if let Some(existing) = indexes.get(name) {
            if existing.dimension != dimension {
                return Err(RagError::Index {
                    backend: BACKEND.to_string(),
                    message: format!(
                        "index '{name}' exists with dimension {}, requested {dimension}",
                        existing.dimension
                    ),
                });
            }
            return Ok(SchemaStatus::AlreadyExists);
        }
        indexes.insert(name.to_string(), IndexData { dimension, entries: Vec::new() });
        debug!(index = name, dimension, "created in-memory index");
        Ok(SchemaStatus::Created)
    }

    async fn upsert(&self, name: &str, chunks: Vec<EmbeddedChunk>) -> Result<()> {
        let mut indexes = self.indexes.write().await;
        let index = indexes.get_mut(name).ok_or_else(|| missing_index(name))?;

        if let Some(bad) = chunks.iter().find(|c| c.vector.len() != index.dimension) {
            return Err(RagError::Index {
                backend: BACKEND.to_string(),
                message: format!(
                    "chunk '{}' has dimension {}, index '{name}' expects {}",
                    bad.id,
                    bad.vector.len(),
                    index.dimension
                ),
            });
        }

        debug!(index = name, count = chunks.len(), "appended chunks");
        index.entries.extend(chunks);
        Ok(())
    }

    async fn query(&self, name: &str, vector: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        let indexes = self.indexes.read().await;
        let index = indexes.get(name).ok_or_else(|| missing_index(name))?;

        let mut scored: Vec<ScoredChunk> = index
            .entries
            .iter()
            .map(|entry| ScoredChunk {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(&entry.vector, vector),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn count(&self, name: &str) -> Result<usize> {
        let indexes = self.indexes.read().await;
        let index = indexes.get(name).ok_or_else(|| missing_index(name))?;
        Ok(index.entries.len())
    }

    fn backend(&self) -> &str {
        BACKEND
    }
}
