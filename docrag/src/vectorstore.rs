//! Vector index trait for storing and searching vector embeddings.

use async_trait::async_trait;

use crate::document::{EmbeddedChunk, ScoredChunk};
use crate::error::Result;

/// Result of [`VectorIndex::ensure_schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaStatus {
    /// The index did not exist and was created.
    Created,
    /// The index already existed; nothing was changed.
    AlreadyExists,
}

/// A storage backend for vector embeddings with similarity search.
///
/// Implementations manage named indexes of [`EmbeddedChunk`]s. The core only
/// ever appends (ingestion) and reads (query); there is no update or delete
/// path, so no locking beyond the backend's own is required.
///
/// # Example
///
/// ```rust,ignore
/// use docrag::{InMemoryVectorIndex, VectorIndex};
///
/// let index = InMemoryVectorIndex::new();
/// index.ensure_schema("docs", 384).await?;
/// index.upsert("docs", chunks).await?;
/// let matches = index.query("docs", &query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create a named index for vectors of `dimension` floats.
    ///
    /// Creating an index that already exists is not an error: it returns
    /// [`SchemaStatus::AlreadyExists`].
    async fn ensure_schema(&self, name: &str, dimension: usize) -> Result<SchemaStatus>;

    /// Write chunks into an index. Ownership of the chunks passes to the index.
    async fn upsert(&self, name: &str, chunks: Vec<EmbeddedChunk>) -> Result<()>;

    /// Return the `top_k` most similar chunks to `vector`, by descending score.
    async fn query(&self, name: &str, vector: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>>;

    /// Number of chunks stored in an index.
    async fn count(&self, name: &str) -> Result<usize>;

    /// A short backend name used in logs and error messages.
    fn backend(&self) -> &str;
}
