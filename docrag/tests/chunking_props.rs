//! Property tests for the recursive chunker.

use std::path::PathBuf;

use docrag::chunking::split;
use docrag::document::{Document, DocumentFormat};
use docrag::error::RagError;
use proptest::prelude::*;

fn doc(text: String) -> Document {
    Document { source_path: PathBuf::from("prop.txt"), raw_text: text, format: DocumentFormat::PlainText }
}

/// Text with words, sentence ends, line and paragraph breaks, and some
/// multi-byte characters.
fn arb_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            4 => "[a-zé]{1,12}",
            2 => Just(" ".to_string()),
            1 => Just(". ".to_string()),
            1 => Just("\n".to_string()),
            1 => Just("\n\n".to_string()),
        ],
        0..200,
    )
    .prop_map(|parts| parts.concat())
}

/// A valid `(chunk_size, chunk_overlap)` pair.
fn arb_params() -> impl Strategy<Value = (usize, usize)> {
    (1usize..120).prop_flat_map(|size| (Just(size), 0..size))
}

mod prop_chunk_bounds_and_coverage {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Dropping each chunk's overlap prefix and concatenating gives back
        /// the input text exactly.
        #[test]
        fn chunks_cover_the_text_exactly(text in arb_text(), (size, overlap) in arb_params()) {
            let chunks = split(&doc(text.clone()), size, overlap).unwrap();

            if text.trim().is_empty() {
                prop_assert!(chunks.is_empty());
                return Ok(());
            }

            let rebuilt: String = chunks
                .iter()
                .map(|c| c.text.chars().skip(c.overlap_with_previous).collect::<String>())
                .collect();
            prop_assert_eq!(rebuilt, text);
        }

        #[test]
        fn chunks_respect_size_and_overlap(text in arb_text(), (size, overlap) in arb_params()) {
            let chunks = split(&doc(text), size, overlap).unwrap();

            for (i, chunk) in chunks.iter().enumerate() {
                let len = chunk.text.chars().count();
                prop_assert!(len >= 1);
                prop_assert!(len <= size, "chunk {} has {} chars, limit {}", i, len, size);
                prop_assert!(chunk.overlap_with_previous <= overlap);
                prop_assert!(chunk.overlap_with_previous < len);
                prop_assert_eq!(chunk.chunk_index, i);
            }
            if let Some(first) = chunks.first() {
                prop_assert_eq!(first.overlap_with_previous, 0);
            }
        }

        #[test]
        fn chunking_is_deterministic(text in arb_text(), (size, overlap) in arb_params()) {
            let a = split(&doc(text.clone()), size, overlap).unwrap();
            let b = split(&doc(text), size, overlap).unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn overlap_not_below_size_is_rejected(text in arb_text(), size in 0usize..50, extra in 0usize..10) {
            let result = split(&doc(text), size, size + extra);
            prop_assert!(matches!(result, Err(RagError::ChunkConfig(_))));
        }
    }
}
