//! Document ingestion and retrieval-augmented question answering.
//!
//! This crate provides:
//! - Text extraction from PDF, DOCX, plain text and CSV files, with a
//!   best-effort fallback for everything else
//! - Recursive, overlap-aware text chunking
//! - Batched embedding and upload into a [`VectorIndex`]
//! - Top-K retrieval and answer generation through a [`LanguageModel`]
//!
//! Backends sit behind traits: [`EmbeddingProvider`], [`VectorIndex`] and
//! [`LanguageModel`]. An in-memory index is always available; OpenAI and
//! Weaviate adapters are behind the `openai` and `weaviate` features.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docrag::{IngestionPipeline, InMemoryVectorIndex, QueryPipeline, RagConfig};
//!
//! let index = Arc::new(InMemoryVectorIndex::new());
//! let ingest = IngestionPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(embedder.clone())
//!     .vector_index(index.clone())
//!     .build()?;
//! let report = ingest.ingest("./docs".as_ref()).await?;
//!
//! let query = QueryPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(embedder)
//!     .vector_index(index)
//!     .language_model(model)
//!     .build()?;
//! let result = query.ask("What is total cost of product 'Many Season'?").await?;
//! println!("{}", result.answer);
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod inmemory;
pub mod llm;
pub mod prompt;
pub mod query;
pub mod vectorstore;

#[cfg(feature = "openai")]
pub mod openai;
#[cfg(feature = "weaviate")]
pub mod weaviate;

pub use chunking::{Chunker, RecursiveChunker, split};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, DocumentFormat, EmbeddedChunk, QueryResult, ScoredChunk};
pub use embedding::EmbeddingProvider;
pub use error::{QueryStage, RagError, Result};
pub use extract::{Extractor, ExtractorRegistry};
pub use ingest::{FileOutcome, FileReport, IngestionPipeline, IngestionPipelineBuilder, IngestionReport};
pub use inmemory::InMemoryVectorIndex;
pub use llm::LanguageModel;
pub use prompt::PromptTemplate;
pub use query::{QueryPipeline, QueryPipelineBuilder};
pub use vectorstore::{SchemaStatus, VectorIndex};
