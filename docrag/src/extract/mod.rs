//! Text extraction from heterogeneous file formats.
//!
//! The [`ExtractorRegistry`] maps a file's [`DocumentFormat`] to the first
//! registered [`Extractor`] that can handle it, falling back to a generic
//! best-effort extractor for anything else.
//!
//! | Extractor              | Formats                    |
//! |------------------------|----------------------------|
//! | [`PdfExtractor`]       | `.pdf`                     |
//! | [`DocxExtractor`]      | `.docx`                    |
//! | [`PlainTextExtractor`] | `.txt`, `.md`, `.log`, ... |
//! | [`CsvExtractor`]       | `.csv`                     |
//! | [`GenericExtractor`]   | everything else (fallback) |
//!
//! Extraction is synchronous; the ingestion pipeline runs it on the blocking
//! thread pool.

mod delimited;
mod docx;
mod generic;
mod pdf;
mod text;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

pub use delimited::CsvExtractor;
pub use docx::DocxExtractor;
pub use generic::GenericExtractor;
pub use pdf::PdfExtractor;
pub use text::PlainTextExtractor;

use crate::document::{Document, DocumentFormat};
use crate::error::{RagError, Result};

/// A strategy for turning one file format into plain text.
pub trait Extractor: Send + Sync {
    /// A short name used in logs.
    fn name(&self) -> &str;

    /// Whether this extractor handles `format`.
    fn can_handle(&self, format: DocumentFormat) -> bool;

    /// Read `path` and return its text content.
    ///
    /// Errors are reported as [`RagError::Extraction`] for this path.
    fn extract_text(&self, path: &Path) -> Result<String>;
}

/// Registry of extractors keyed by [`DocumentFormat`], with a fallback.
pub struct ExtractorRegistry {
    extractors: Vec<Arc<dyn Extractor>>,
    fallback: Arc<dyn Extractor>,
}

impl ExtractorRegistry {
    /// Create a registry with no format-specific extractors.
    ///
    /// Every file goes to the [`GenericExtractor`] until extractors are registered.
    pub fn new() -> Self {
        Self { extractors: Vec::new(), fallback: Arc::new(GenericExtractor) }
    }

    /// Create a registry with the PDF, DOCX, plain-text and CSV extractors.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(PdfExtractor);
        registry.register(DocxExtractor);
        registry.register(PlainTextExtractor);
        registry.register(CsvExtractor);
        registry
    }

    /// Register an extractor. Earlier registrations win for a shared format.
    pub fn register<E: Extractor + 'static>(&mut self, extractor: E) {
        self.extractors.push(Arc::new(extractor));
    }

    /// Replace the fallback used for formats no registered extractor handles.
    pub fn set_fallback<E: Extractor + 'static>(&mut self, extractor: E) {
        self.fallback = Arc::new(extractor);
    }

    /// Detect the format of a file from its extension.
    pub fn detect_format(path: &Path) -> DocumentFormat {
        DocumentFormat::from_path(path)
    }

    /// The extractor that will be used for `format`.
    pub fn extractor_for(&self, format: DocumentFormat) -> Arc<dyn Extractor> {
        self.extractors
            .iter()
            .find(|e| e.can_handle(format))
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }

    /// Extract a [`Document`] from a file.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Extraction`] scoped to `path` if the file cannot be
    /// read or parsed.
    pub fn extract(&self, path: &Path) -> Result<Document> {
        let format = Self::detect_format(path);
        let extractor = self.extractor_for(format);
        debug!(path = %path.display(), %format, extractor = extractor.name(), "extracting");

        let raw_text = extractor.extract_text(path).map_err(|e| match e {
            RagError::Extraction { .. } => e,
            other => RagError::extraction(path, other.to_string()),
        })?;

        Ok(Document { source_path: path.to_path_buf(), raw_text, format })
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.extractors.iter().map(|e| e.name()).collect();
        f.debug_struct("ExtractorRegistry")
            .field("extractors", &names)
            .field("fallback", &self.fallback.name())
            .finish()
    }
}

/// Read a whole file, mapping I/O failures to an extraction error for `path`.
pub(crate) fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| RagError::extraction(path, format!("failed to read file: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct Upper;

    impl Extractor for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        fn can_handle(&self, format: DocumentFormat) -> bool {
            format == DocumentFormat::PlainText
        }

        fn extract_text(&self, path: &Path) -> Result<String> {
            Ok(fs::read_to_string(path)?.to_uppercase())
        }
    }

    #[test]
    fn dispatches_by_format() {
        let registry = ExtractorRegistry::with_defaults();
        assert_eq!(registry.extractor_for(DocumentFormat::Pdf).name(), "pdf");
        assert_eq!(registry.extractor_for(DocumentFormat::Docx).name(), "docx");
        assert_eq!(registry.extractor_for(DocumentFormat::Csv).name(), "csv");
        assert_eq!(registry.extractor_for(DocumentFormat::PlainText).name(), "plain_text");
        assert_eq!(registry.extractor_for(DocumentFormat::Other).name(), "generic");
    }

    #[test]
    fn empty_registry_uses_fallback() {
        let registry = ExtractorRegistry::new();
        assert_eq!(registry.extractor_for(DocumentFormat::Pdf).name(), "generic");
    }

    #[test]
    fn earlier_registration_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "hello").unwrap();

        let mut registry = ExtractorRegistry::new();
        registry.register(Upper);
        registry.register(PlainTextExtractor);

        let document = registry.extract(&path).unwrap();
        assert_eq!(document.raw_text, "HELLO");
        assert_eq!(document.format, DocumentFormat::PlainText);
        assert_eq!(document.source_path, path);
    }

    #[test]
    fn failures_are_scoped_to_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.pdf");
        fs::write(&path, "this is not a pdf").unwrap();

        let err = ExtractorRegistry::with_defaults().extract(&path).unwrap_err();
        match err {
            RagError::Extraction { path: failed, .. } => assert_eq!(failed, path),
            other => panic!("expected extraction error, got {other:?}"),
        }
    }

    #[test]
    fn io_errors_from_custom_extractors_become_extraction_errors() {
        let mut registry = ExtractorRegistry::new();
        registry.register(Upper);
        let err = registry.extract(Path::new("/definitely/missing.txt")).unwrap_err();
        assert!(matches!(err, RagError::Extraction { .. }));
    }
}
