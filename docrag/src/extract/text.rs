//! Plain UTF-8 text files (`.txt`, `.md`, `.log`, ...).

use std::path::Path;

use super::{Extractor, read_bytes};
use crate::document::DocumentFormat;
use crate::error::{RagError, Result};

/// Reads UTF-8 text files verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl Extractor for PlainTextExtractor {
    fn name(&self) -> &str {
        "plain_text"
    }

    fn can_handle(&self, format: DocumentFormat) -> bool {
        format == DocumentFormat::PlainText
    }

    fn extract_text(&self, path: &Path) -> Result<String> {
        let bytes = read_bytes(path)?;
        String::from_utf8(bytes)
            .map_err(|e| RagError::extraction(path, format!("file is not valid UTF-8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "hello world, this is a test.").unwrap();
        assert_eq!(PlainTextExtractor.extract_text(&path).unwrap(), "hello world, this is a test.");
    }

    #[test]
    fn rejects_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        assert!(PlainTextExtractor.extract_text(&path).is_err());
    }
}
