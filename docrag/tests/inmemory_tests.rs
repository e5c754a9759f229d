//! Property tests for in-memory vector index search ordering.

use std::collections::HashMap;
use std::path::PathBuf;

use docrag::document::{Chunk, EmbeddedChunk};
use docrag::inmemory::InMemoryVectorIndex;
use docrag::vectorstore::VectorIndex;
use proptest::prelude::*;

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map(
        "non-zero embedding",
        |mut v| {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-8 {
                return None;
            }
            for val in &mut v {
                *val /= norm;
            }
            Some(v)
        },
    )
}

/// Generate an embedded chunk with a normalized vector.
fn arb_embedded_chunk(dim: usize) -> impl Strategy<Value = EmbeddedChunk> {
    ("[a-z]{3,8}", "[a-z ]{5,30}", 0usize..50, arb_normalized_embedding(dim)).prop_map(
        |(id, text, chunk_index, vector)| EmbeddedChunk {
            id,
            chunk: Chunk {
                text,
                overlap_with_previous: 0,
                source_path: PathBuf::from("docs/a.txt"),
                chunk_index,
            },
            vector,
            metadata: HashMap::new(),
        },
    )
}

/// Search returns at most `top_k` results, ordered by descending cosine
/// similarity, and every stored chunk is counted even when ids repeat.
mod prop_inmemory_search_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded_by_top_k(
            chunks in proptest::collection::vec(arb_embedded_chunk(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            top_k in 0usize..25,
        ) {
            let stored = chunks.len();
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (results, count) = rt.block_on(async {
                let index = InMemoryVectorIndex::new();
                index.ensure_schema("test", DIM).await.unwrap();
                index.upsert("test", chunks).await.unwrap();
                let results = index.query("test", &query, top_k).await.unwrap();
                let count = index.count("test").await.unwrap();
                (results, count)
            });

            // Append-only: nothing is overwritten.
            prop_assert_eq!(count, stored);

            prop_assert_eq!(results.len(), top_k.min(stored));

            for window in results.windows(2) {
                prop_assert!(
                    window[0].score >= window[1].score,
                    "results not in descending order: {} < {}",
                    window[0].score,
                    window[1].score,
                );
            }
        }
    }
}
