//! Data types for documents, chunks, and query results.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The source format of a document, detected from its file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    /// Portable Document Format.
    Pdf,
    /// Office Open XML word-processing document.
    Docx,
    /// UTF-8 text (`.txt`, `.md`, `.log`, ...).
    PlainText,
    /// Comma-separated values with a header row.
    Csv,
    /// Anything else; handled by the fallback extractor.
    Other,
}

impl DocumentFormat {
    /// Detect the format of a path by its (case-insensitive) extension.
    pub fn from_path(path: &Path) -> Self {
        let ext = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("pdf") => Self::Pdf,
            Some("docx") => Self::Docx,
            Some("txt" | "text" | "md" | "markdown" | "log") => Self::PlainText,
            Some("csv") => Self::Csv,
            _ => Self::Other,
        }
    }

    /// A short, stable name used in chunk metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::PlainText => "plain_text",
            Self::Csv => "csv",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text extracted from one source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Path of the file the text was extracted from.
    pub source_path: PathBuf,
    /// The extracted plain text.
    pub raw_text: String,
    /// The detected source format.
    pub format: DocumentFormat,
}

/// A bounded segment of a [`Document`]; the unit that is embedded and stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// The text content of the chunk.
    pub text: String,
    /// Number of characters shared with the previous chunk of the same document.
    pub overlap_with_previous: usize,
    /// Path of the parent [`Document`], kept for provenance only.
    pub source_path: PathBuf,
    /// Position of this chunk within its document.
    pub chunk_index: usize,
}

/// A [`Chunk`] with its embedding, ready to be written to a vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    /// Unique identifier assigned at ingestion time.
    pub id: String,
    /// The chunk being stored.
    pub chunk: Chunk,
    /// The embedding of `chunk.text`.
    pub vector: Vec<f32>,
    /// Key-value payload stored alongside the vector.
    pub metadata: HashMap<String, String>,
}

/// A retrieved [`Chunk`] paired with its similarity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}

/// The outcome of one retrieval-augmented query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// The question that was asked.
    pub question: String,
    /// Retrieved chunks, ordered by descending score.
    pub matches: Vec<ScoredChunk>,
    /// The language model's answer.
    pub answer: String,
}
