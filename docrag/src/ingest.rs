//! Directory ingestion: extract → chunk → batch → embed → index.
//!
//! The [`IngestionPipeline`] walks a directory, runs every file through the
//! [`ExtractorRegistry`] and the [`Chunker`], accumulates all chunks into one
//! sequence, and writes that sequence to the [`VectorIndex`] in batches of
//! `batch_size`. Batch boundaries do not follow document boundaries.
//!
//! Failures are scoped: a file that cannot be extracted, or a batch that
//! cannot be embedded or written, is recorded in the [`IngestionReport`] and
//! the run continues. Only configuration problems, an unreadable directory,
//! and schema creation failures abort a run.
//!
//! Ingestion never de-duplicates: running it twice over the same directory
//! stores every chunk twice.
//!
//! # Example
//!
//! ```rust,ignore
//! use docrag::{IngestionPipeline, RagConfig, InMemoryVectorIndex};
//!
//! let pipeline = IngestionPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_index(Arc::new(InMemoryVectorIndex::new()))
//!     .build()?;
//!
//! let report = pipeline.ingest(Path::new("./docs")).await?;
//! println!("{} chunks in {} batches", report.chunks_embedded, report.batches_written);
//! ```

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;
use walkdir::{DirEntry, WalkDir};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::document::{Chunk, DocumentFormat, EmbeddedChunk};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::extract::ExtractorRegistry;
use crate::vectorstore::{SchemaStatus, VectorIndex};

/// What happened to one file during ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum FileOutcome {
    /// All of the file's chunks were embedded and written.
    Indexed,
    /// Text could not be extracted; the file produced no chunks.
    ExtractionFailed(String),
    /// A batch holding some of the file's chunks failed to embed.
    EmbeddingFailed(String),
    /// A batch holding some of the file's chunks failed to write.
    IndexFailed(String),
    /// The run was cancelled before the file was fully processed.
    Skipped,
}

/// Per-file entry of an [`IngestionReport`].
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    /// The file's path.
    pub path: PathBuf,
    /// The detected format.
    pub format: DocumentFormat,
    /// Final outcome.
    pub outcome: FileOutcome,
    /// Chunks produced from the file.
    pub chunks: usize,
    /// Chunks that reached the index.
    pub chunks_indexed: usize,
}

/// Summary of one ingestion run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestionReport {
    /// One entry per file found, in directory order.
    pub files: Vec<FileReport>,
    /// Total chunks embedded and written.
    pub chunks_embedded: usize,
    /// Batches written successfully.
    pub batches_written: usize,
    /// Batches that failed to embed or write.
    pub batches_failed: usize,
    /// Whether the run stopped early because of cancellation.
    pub cancelled: bool,
}

impl IngestionReport {
    /// Files whose chunks were all indexed.
    pub fn succeeded(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| f.outcome == FileOutcome::Indexed)
    }

    /// Files that failed at extraction, embedding or indexing.
    pub fn failures(&self) -> impl Iterator<Item = &FileReport> {
        self.files
            .iter()
            .filter(|f| !matches!(f.outcome, FileOutcome::Indexed | FileOutcome::Skipped))
    }

    /// True when the run was not cancelled and nothing failed.
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.failures().next().is_none()
    }
}

/// A chunk waiting to be embedded, tagged with the file it came from.
struct PendingChunk {
    file: usize,
    format: DocumentFormat,
    chunk: Chunk,
}

enum BatchOutcome {
    Written,
    Failed(RagError),
    Skipped,
}

/// The ingestion pipeline. Construct one via [`IngestionPipeline::builder()`].
pub struct IngestionPipeline {
    config: RagConfig,
    registry: Arc<ExtractorRegistry>,
    chunker: Arc<dyn Chunker>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_index: Arc<dyn VectorIndex>,
}

impl IngestionPipeline {
    /// Create a new [`IngestionPipelineBuilder`].
    pub fn builder() -> IngestionPipelineBuilder {
        IngestionPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Ingest every file in `directory`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the directory cannot be read or the index
    /// schema cannot be ensured. Per-file and per-batch failures are
    /// reported in the returned [`IngestionReport`].
    pub async fn ingest(&self, directory: &Path) -> Result<IngestionReport> {
        self.ingest_with_cancel(directory, &CancellationToken::new()).await
    }

    /// Ingest every file in `directory`, stopping early once `cancel` fires.
    ///
    /// Cancellation is checked before each file and before each batch; work
    /// already started is finished. The partial report has `cancelled` set
    /// and lists unreached files as [`FileOutcome::Skipped`].
    ///
    /// # Errors
    ///
    /// See [`IngestionPipeline::ingest`].
    pub async fn ingest_with_cancel(
        &self,
        directory: &Path,
        cancel: &CancellationToken,
    ) -> Result<IngestionReport> {
        let files = list_files(directory, self.config.recursive)?;

        let index_name = self.config.index_name.as_str();
        let dimension = self.embedding_provider.dimensions();
        match self.vector_index.ensure_schema(index_name, dimension).await? {
            SchemaStatus::Created => info!(index = index_name, dimension, "created index schema"),
            SchemaStatus::AlreadyExists => {
                info!(index = index_name, "index schema already exists, skipping creation")
            }
        }

        info!(directory = %directory.display(), files = files.len(), "starting ingestion");

        let mut report = IngestionReport::default();
        let pending = self.extract_all(files, cancel, &mut report).await;
        self.write_all(pending, cancel, &mut report).await;

        if report.cancelled {
            for file in &mut report.files {
                if file.outcome == FileOutcome::Indexed && file.chunks_indexed < file.chunks {
                    file.outcome = FileOutcome::Skipped;
                }
            }
        }

        info!(
            files = report.files.len(),
            succeeded = report.succeeded().count(),
            failed = report.failures().count(),
            chunks = report.chunks_embedded,
            batches = report.batches_written,
            cancelled = report.cancelled,
            "ingestion finished"
        );
        Ok(report)
    }

    /// Extract and chunk every file, in directory order.
    async fn extract_all(
        &self,
        files: Vec<PathBuf>,
        cancel: &CancellationToken,
        report: &mut IngestionReport,
    ) -> Vec<PendingChunk> {
        let mut extractions = stream::iter(files)
            .map(|path| {
                let registry = Arc::clone(&self.registry);
                let cancel = cancel.clone();
                async move {
                    if cancel.is_cancelled() {
                        return (path, None);
                    }
                    let blocking_path = path.clone();
                    let result = tokio::task::spawn_blocking(move || registry.extract(&blocking_path))
                        .await
                        .unwrap_or_else(|e| {
                            Err(RagError::extraction(&path, format!("extraction task failed: {e}")))
                        });
                    (path, Some(result))
                }
            })
            .buffered(self.config.extract_concurrency);

        let mut pending = Vec::new();
        while let Some((path, result)) = extractions.next().await {
            let format = DocumentFormat::from_path(&path);
            let file = report.files.len();

            let (outcome, chunks) = match result {
                None => {
                    report.cancelled = true;
                    (FileOutcome::Skipped, 0)
                }
                Some(Ok(document)) => {
                    let chunks = self.chunker.chunk(&document);
                    let count = chunks.len();
                    info!(path = %path.display(), %format, chunks = count, "processed file");
                    pending.extend(chunks.into_iter().map(|chunk| PendingChunk { file, format, chunk }));
                    (FileOutcome::Indexed, count)
                }
                Some(Err(e)) => {
                    warn!(path = %path.display(), error = %e, "skipping file");
                    (FileOutcome::ExtractionFailed(e.to_string()), 0)
                }
            };

            report.files.push(FileReport { path, format, outcome, chunks, chunks_indexed: 0 });
        }

        pending
    }

    /// Write all pending chunks in batches of `batch_size`.
    async fn write_all(
        &self,
        pending: Vec<PendingChunk>,
        cancel: &CancellationToken,
        report: &mut IngestionReport,
    ) {
        let batch_size = self.config.batch_size;
        let total = pending.len().div_ceil(batch_size);

        let mut batches = Vec::with_capacity(total);
        let mut iter = pending.into_iter().peekable();
        while iter.peek().is_some() {
            batches.push(iter.by_ref().take(batch_size).collect::<Vec<_>>());
        }

        let mut results = stream::iter(batches.into_iter().enumerate())
            .map(|(i, batch)| {
                let owners: Vec<usize> = batch.iter().map(|p| p.file).collect();
                async move {
                    if cancel.is_cancelled() {
                        return (owners, BatchOutcome::Skipped);
                    }
                    let outcome = match self.write_batch(batch).await {
                        Ok(()) => {
                            info!(batch = i + 1, of = total, "processed batch");
                            BatchOutcome::Written
                        }
                        Err(e) => {
                            warn!(batch = i + 1, of = total, error = %e, "batch failed");
                            BatchOutcome::Failed(e)
                        }
                    };
                    (owners, outcome)
                }
            })
            .buffered(self.config.max_in_flight_batches);

        while let Some((owners, outcome)) = results.next().await {
            match outcome {
                BatchOutcome::Written => {
                    report.batches_written += 1;
                    report.chunks_embedded += owners.len();
                    for file in owners {
                        report.files[file].chunks_indexed += 1;
                    }
                }
                BatchOutcome::Failed(e) => {
                    report.batches_failed += 1;
                    let outcome = match &e {
                        RagError::Index { .. } => FileOutcome::IndexFailed(e.to_string()),
                        _ => FileOutcome::EmbeddingFailed(e.to_string()),
                    };
                    for file in owners.into_iter().collect::<BTreeSet<_>>() {
                        let entry = &mut report.files[file];
                        if entry.outcome == FileOutcome::Indexed {
                            entry.outcome = outcome.clone();
                        }
                    }
                }
                BatchOutcome::Skipped => report.cancelled = true,
            }
        }
    }

    /// Embed one batch and append it to the index.
    async fn write_batch(&self, batch: Vec<PendingChunk>) -> Result<()> {
        let provider = self.embedding_provider.name().to_string();
        let embedding_error =
            |message: String| RagError::Embedding { provider: provider.clone(), message };

        let texts: Vec<&str> = batch.iter().map(|p| p.chunk.text.as_str()).collect();
        let vectors = self.embedding_provider.embed_batch(&texts).await.map_err(|e| match e {
            RagError::Embedding { .. } => e,
            other => embedding_error(other.to_string()),
        })?;

        if vectors.len() != batch.len() {
            return Err(embedding_error(format!(
                "expected {} embeddings, got {}",
                batch.len(),
                vectors.len()
            )));
        }
        let dimension = self.embedding_provider.dimensions();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(embedding_error(format!(
                "expected {dimension}-dimensional embeddings, got {}",
                bad.len()
            )));
        }

        let embedded: Vec<EmbeddedChunk> = batch
            .into_iter()
            .zip(vectors)
            .map(|(pending, vector)| EmbeddedChunk {
                id: Uuid::new_v4().to_string(),
                metadata: chunk_metadata(&pending.chunk, pending.format),
                chunk: pending.chunk,
                vector,
            })
            .collect();

        let backend = self.vector_index.backend().to_string();
        self.vector_index.upsert(&self.config.index_name, embedded).await.map_err(|e| match e {
            RagError::Index { .. } => e,
            other => RagError::Index { backend, message: other.to_string() },
        })
    }
}

/// Payload stored next to every vector.
fn chunk_metadata(chunk: &Chunk, format: DocumentFormat) -> HashMap<String, String> {
    HashMap::from([
        ("source_path".to_string(), chunk.source_path.display().to_string()),
        ("chunk_index".to_string(), chunk.chunk_index.to_string()),
        ("overlap_with_previous".to_string(), chunk.overlap_with_previous.to_string()),
        ("format".to_string(), format.as_str().to_string()),
    ])
}

/// Dot-files and dot-directories below the root. The root itself is never hidden.
fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_str().is_some_and(|name| name.starts_with('.'))
}

/// Regular, non-hidden files under `directory`, sorted by path.
fn list_files(directory: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if !std::fs::metadata(directory)?.is_dir() {
        return Err(RagError::Config(format!("'{}' is not a directory", directory.display())));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files = WalkDir::new(directory)
        .min_depth(1)
        .max_depth(max_depth)
        .into_iter()
        .filter_entry(|entry| !is_hidden(entry))
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(DirEntry::into_path)
        .collect::<Vec<_>>();

    files.sort();
    Ok(files)
}

/// Builder for constructing an [`IngestionPipeline`].
///
/// `config`, `embedding_provider` and `vector_index` are required. The
/// registry defaults to [`ExtractorRegistry::with_defaults`] and the chunker
/// to a [`RecursiveChunker`] built from the config.
#[derive(Default)]
pub struct IngestionPipelineBuilder {
    config: Option<RagConfig>,
    registry: Option<Arc<ExtractorRegistry>>,
    chunker: Option<Arc<dyn Chunker>>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_index: Option<Arc<dyn VectorIndex>>,
}

impl IngestionPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the extractor registry.
    pub fn registry(mut self, registry: Arc<ExtractorRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector index the chunks are written to.
    pub fn vector_index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.vector_index = Some(index);
        self
    }

    /// Build the [`IngestionPipeline`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a required field is missing or the
    /// config is invalid, and [`RagError::ChunkConfig`] for an invalid
    /// chunk size / overlap pair. Both are raised before any I/O.
    pub fn build(self) -> Result<IngestionPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::Config("config is required".to_string()))?;
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let vector_index = self
            .vector_index
            .ok_or_else(|| RagError::Config("vector_index is required".to_string()))?;
        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap)?),
        };
        let registry = self.registry.unwrap_or_else(|| Arc::new(ExtractorRegistry::with_defaults()));

        Ok(IngestionPipeline { config, registry, chunker, embedding_provider, vector_index })
    }
}
