//! Error types for the `docrag` crate.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// The stage of a query at which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStage {
    /// Embedding the question text.
    Embed,
    /// Fetching the nearest chunks from the vector index.
    Retrieve,
    /// Generating the answer with the language model.
    Generate,
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Embed => "embed",
            Self::Retrieve => "retrieve",
            Self::Generate => "generate",
        };
        f.write_str(name)
    }
}

/// Errors that can occur in ingestion and query operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// Text could not be extracted from a single file.
    #[error("Extraction error ({}): {message}", path.display())]
    Extraction {
        /// The file that failed.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },

    /// The chunk size / overlap combination is invalid.
    #[error("Chunk configuration error: {0}")]
    ChunkConfig(String),

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector index backend.
    #[error("Index error ({backend}): {message}")]
    Index {
        /// The vector index backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The language model call failed (rate limit, timeout, content policy, ...).
    #[error("LLM error ({provider}): {message}")]
    Llm {
        /// The language model provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A query failed at a specific stage.
    #[error("Query failed at {stage} stage: {source}")]
    Query {
        /// The stage that failed.
        stage: QueryStage,
        /// The underlying error.
        #[source]
        source: Box<RagError>,
    },

    /// A filesystem error outside of a single file's extraction.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RagError {
    /// Shorthand for building an [`RagError::Extraction`].
    pub fn extraction(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Extraction { path: path.into(), message: message.into() }
    }

    /// Wrap an error as the failure of one query stage.
    pub fn at_stage(self, stage: QueryStage) -> Self {
        Self::Query { stage, source: Box::new(self) }
    }

    /// The failed query stage, if this is a query error.
    pub fn stage(&self) -> Option<QueryStage> {
        match self {
            Self::Query { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Whether an ingestion run may record this error and keep going.
    ///
    /// Extraction, embedding and index failures are scoped to one file or
    /// one batch; everything else aborts the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Extraction { .. } | Self::Embedding { .. } | Self::Index { .. })
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_error_names_stage() {
        let err = RagError::Llm { provider: "mock".into(), message: "rate limited".into() }
            .at_stage(QueryStage::Generate);
        assert_eq!(err.stage(), Some(QueryStage::Generate));
        assert_eq!(
            err.to_string(),
            "Query failed at generate stage: LLM error (mock): rate limited"
        );
    }

    #[test]
    fn recoverable_errors() {
        assert!(RagError::extraction("a.pdf", "bad xref").is_recoverable());
        assert!(RagError::Embedding { provider: "p".into(), message: "m".into() }.is_recoverable());
        assert!(!RagError::ChunkConfig("overlap".into()).is_recoverable());
        assert!(!RagError::Config("batch".into()).is_recoverable());
    }
}
