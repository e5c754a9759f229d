//! PDF text extraction via `pdf-extract`.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use super::{Extractor, read_bytes};
use crate::document::DocumentFormat;
use crate::error::{RagError, Result};

/// Extracts the text layer of a PDF; layout, images and annotations are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

impl Extractor for PdfExtractor {
    fn name(&self) -> &str {
        "pdf"
    }

    fn can_handle(&self, format: DocumentFormat) -> bool {
        format == DocumentFormat::Pdf
    }

    fn extract_text(&self, path: &Path) -> Result<String> {
        let bytes = read_bytes(path)?;

        // pdf-extract panics on some malformed inputs instead of returning an error.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem(&bytes)
        }));

        match outcome {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(RagError::extraction(path, format!("PDF extraction failed: {e}"))),
            Err(_) => Err(RagError::extraction(path, "PDF parser aborted on malformed content")),
        }
    }
}
