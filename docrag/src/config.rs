//! Configuration for the ingestion and query pipelines.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Configuration parameters shared by the ingestion and query pipelines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Name of the target index (collection) in the vector store.
    pub index_name: String,
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of chunks embedded and written per batch.
    pub batch_size: usize,
    /// Number of nearest chunks retrieved per query.
    pub top_k: usize,
    /// Whether ingestion walks subdirectories.
    pub recursive: bool,
    /// Maximum number of files extracted at the same time.
    pub extract_concurrency: usize,
    /// Maximum number of batches being embedded/written at the same time.
    pub max_in_flight_batches: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            index_name: "Documents".to_string(),
            chunk_size: 500,
            chunk_overlap: 50,
            batch_size: 10,
            top_k: 100,
            recursive: false,
            extract_concurrency: 1,
            max_in_flight_batches: 1,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Check that the parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ChunkConfig`] if `chunk_size == 0` or
    /// `chunk_overlap >= chunk_size`, and [`RagError::Config`] if
    /// `index_name` is empty or `batch_size`, `extract_concurrency` or
    /// `max_in_flight_batches` is zero.
    pub fn validate(&self) -> Result<()> {
        validate_chunking(self.chunk_size, self.chunk_overlap)?;
        if self.index_name.trim().is_empty() {
            return Err(RagError::Config("index_name must not be empty".to_string()));
        }
        if self.batch_size == 0 {
            return Err(RagError::Config("batch_size must be greater than zero".to_string()));
        }
        if self.extract_concurrency == 0 {
            return Err(RagError::Config(
                "extract_concurrency must be greater than zero".to_string(),
            ));
        }
        if self.max_in_flight_batches == 0 {
            return Err(RagError::Config(
                "max_in_flight_batches must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Reject chunk parameters that cannot produce a forward-moving window.
pub(crate) fn validate_chunking(chunk_size: usize, chunk_overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(RagError::ChunkConfig("chunk_size must be greater than zero".to_string()));
    }
    if chunk_overlap >= chunk_size {
        return Err(RagError::ChunkConfig(format!(
            "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the target index name.
    pub fn index_name(mut self, name: impl Into<String>) -> Self {
        self.config.index_name = name.into();
        self
    }

    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of chunks per embedding/upsert batch.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    /// Set the number of nearest chunks retrieved per query.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Walk subdirectories during ingestion.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.config.recursive = recursive;
        self
    }

    /// Set how many files may be extracted at once.
    pub fn extract_concurrency(mut self, limit: usize) -> Self {
        self.config.extract_concurrency = limit;
        self
    }

    /// Set how many batches may be in flight at once.
    pub fn max_in_flight_batches(mut self, limit: usize) -> Self {
        self.config.max_in_flight_batches = limit;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = RagConfig::builder().build().unwrap();
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.chunk_overlap, 50);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.top_k, 100);
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        let err = RagConfig::builder().chunk_size(100).chunk_overlap(100).build().unwrap_err();
        assert!(matches!(err, RagError::ChunkConfig(_)));
    }

    #[test]
    fn rejects_zero_batch_size() {
        let err = RagConfig::builder().batch_size(0).build().unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
    }

    #[test]
    fn allows_zero_top_k() {
        assert_eq!(RagConfig::builder().top_k(0).build().unwrap().top_k, 0);
    }

    #[test]
    fn deserializes_partial_config() {
        let config: RagConfig =
            serde_json::from_str(r#"{"index_name":"Products","batch_size":25}"#).unwrap();
        assert_eq!(config.index_name, "Products");
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.chunk_size, 500);
    }
}
