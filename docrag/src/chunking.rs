//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`RecursiveChunker`], a
//! sliding window over the document text that prefers to end chunks at
//! natural boundaries (paragraphs, lines, sentences, then words) and only
//! cuts mid-word when a window contains no boundary at all.
//!
//! All sizes are counted in `char`s, never bytes, so multi-byte text is never
//! split inside a code point.

use crate::config::validate_chunking;
use crate::document::{Chunk, Document};
use crate::error::Result;

/// Boundaries tried, in order of preference, when a chunk must end before the
/// end of the text. Whitespace is tried after all of these.
const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", "! ", "? ", "; "];

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s without embeddings; vectors are
/// attached later by the ingestion pipeline.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has no non-whitespace text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits text with a boundary-aware sliding window.
///
/// The window is `chunk_size` characters long. Consecutive chunks share at
/// most `chunk_overlap` characters, and the first chunk of a document never
/// overlaps anything.
///
/// # Example
///
/// ```rust,ignore
/// use docrag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(500, 50)?;
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ChunkConfig`](crate::RagError::ChunkConfig) if
    /// `chunk_size` is zero or `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_chunking(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Maximum number of characters per chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Maximum number of characters shared by consecutive chunks.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.raw_text.trim().is_empty() {
            return Vec::new();
        }

        let index = CharIndex::new(&document.raw_text);
        let spans = window_spans(&index, self.chunk_size, self.chunk_overlap);

        let mut previous_end = 0;
        spans
            .into_iter()
            .enumerate()
            .map(|(chunk_index, (start, end))| {
                let overlap_with_previous =
                    if chunk_index == 0 { 0 } else { previous_end - start };
                previous_end = end;
                Chunk {
                    text: index.slice(start, end).to_string(),
                    overlap_with_previous,
                    source_path: document.source_path.clone(),
                    chunk_index,
                }
            })
            .collect()
    }
}

/// Split a document with a [`RecursiveChunker`] built from the given parameters.
///
/// # Errors
///
/// Returns [`RagError::ChunkConfig`](crate::RagError::ChunkConfig) if
/// `chunk_overlap >= chunk_size` or `chunk_size` is zero.
pub fn split(document: &Document, chunk_size: usize, chunk_overlap: usize) -> Result<Vec<Chunk>> {
    Ok(RecursiveChunker::new(chunk_size, chunk_overlap)?.chunk(document))
}

/// Char-position view over a string.
struct CharIndex<'a> {
    text: &'a str,
    chars: Vec<char>,
    /// Byte offset of every char, plus `text.len()` as a sentinel.
    offsets: Vec<usize>,
}

impl<'a> CharIndex<'a> {
    fn new(text: &'a str) -> Self {
        let (mut offsets, chars): (Vec<usize>, Vec<char>) = text.char_indices().unzip();
        offsets.push(text.len());
        Self { text, chars, offsets }
    }

    fn len(&self) -> usize {
        self.chars.len()
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.text[self.offsets[start]..self.offsets[end]]
    }

    /// Char position of a byte offset that lies on a char boundary.
    fn position_of_byte(&self, byte: usize) -> usize {
        self.offsets.binary_search(&byte).unwrap_or_else(|pos| pos)
    }

    fn follows_whitespace(&self, position: usize) -> bool {
        position > 0 && self.chars[position - 1].is_whitespace()
    }
}

/// Compute `(start, end)` char spans of every chunk.
fn window_spans(index: &CharIndex<'_>, chunk_size: usize, chunk_overlap: usize) -> Vec<(usize, usize)> {
    let len = index.len();
    let mut spans = Vec::new();
    let mut start = 0;

    loop {
        let window_end = (start + chunk_size).min(len);
        let end = if window_end == len {
            len
        } else {
            // Never break before this point: it keeps chunks reasonably full
            // and guarantees the next window starts after `start`.
            let earliest = start + chunk_overlap.max(chunk_size / 2);
            find_break(index, earliest, window_end)
        };

        spans.push((start, end));
        if end == len {
            break;
        }
        start = next_start(index, end, chunk_overlap);
    }

    spans
}

/// Latest natural boundary in `(earliest, window_end]`, or `window_end` if none.
fn find_break(index: &CharIndex<'_>, earliest: usize, window_end: usize) -> usize {
    let window = index.slice(earliest, window_end);
    let base = index.offsets[earliest];

    for separator in SEPARATORS {
        if let Some(pos) = window.rfind(separator) {
            return index.position_of_byte(base + pos + separator.len());
        }
    }

    if let Some((pos, ch)) = window.char_indices().rev().find(|(_, c)| c.is_whitespace()) {
        return index.position_of_byte(base + pos + ch.len_utf8());
    }

    window_end
}

/// Start of the window after a chunk ending at `end`.
///
/// Backs up by at most `chunk_overlap` characters, snapping forward to the
/// first word start so the overlap does not begin mid-word.
fn next_start(index: &CharIndex<'_>, end: usize, chunk_overlap: usize) -> usize {
    if chunk_overlap == 0 {
        return end;
    }
    let from = end - chunk_overlap;
    (from..end).find(|&pos| index.follows_whitespace(pos)).unwrap_or(from)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::document::DocumentFormat;
    use crate::error::RagError;

    fn doc(text: &str) -> Document {
        Document {
            source_path: PathBuf::from("doc.txt"),
            raw_text: text.to_string(),
            format: DocumentFormat::PlainText,
        }
    }

    fn texts(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn empty_and_blank_text_yield_no_chunks() {
        assert!(split(&doc(""), 10, 2).unwrap().is_empty());
        assert!(split(&doc("  \n\t "), 10, 2).unwrap().is_empty());
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = split(&doc("hello world, this is a test."), 500, 50).unwrap();
        assert_eq!(texts(&chunks), vec!["hello world, this is a test."]);
        assert_eq!(chunks[0].overlap_with_previous, 0);
        assert_eq!(chunks[0].chunk_index, 0);
    }

    #[test]
    fn breaks_at_word_boundary() {
        let chunks = split(&doc("alpha beta gamma delta"), 12, 0).unwrap();
        assert_eq!(texts(&chunks), vec!["alpha beta ", "gamma delta"]);
    }

    #[test]
    fn prefers_paragraph_breaks() {
        let text = "First paragraph here.\n\nSecond paragraph text.";
        let chunks = split(&doc(text), 30, 5).unwrap();
        assert_eq!(chunks[0].text, "First paragraph here.\n\n");
        assert!(chunks[1].text.ends_with("Second paragraph text."));
        assert!(chunks[1].overlap_with_previous <= 5);
    }

    #[test]
    fn hard_cuts_without_boundaries() {
        let chunks = split(&doc("abcdefghij"), 4, 1).unwrap();
        assert_eq!(texts(&chunks), vec!["abcd", "defg", "ghij"]);
        assert_eq!(chunks[1].overlap_with_previous, 1);
        assert_eq!(chunks[2].overlap_with_previous, 1);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let text = "ééééé ééééé ééééé";
        let chunks = split(&doc(text), 6, 0).unwrap();
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 6));
        assert_eq!(chunks.iter().map(|c| c.text.as_str()).collect::<String>(), text);
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        assert!(matches!(split(&doc("text"), 10, 10), Err(RagError::ChunkConfig(_))));
        assert!(matches!(RecursiveChunker::new(0, 0), Err(RagError::ChunkConfig(_))));
    }

    #[test]
    fn chunks_reference_their_document() {
        let chunks = split(&doc("one two three four five six"), 8, 2).unwrap();
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.source_path, PathBuf::from("doc.txt"));
            assert_eq!(chunk.chunk_index, i);
        }
    }
}
