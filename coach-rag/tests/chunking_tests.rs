//! Property tests for the recursive chunker.

use std::collections::HashMap;

use coach_rag::{Chunker, Document, RecursiveChunker};
use proptest::prelude::*;

fn doc(text: String) -> Document {
    Document { id: "plan_p1".into(), text, metadata: HashMap::new(), source_uri: None }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn windows_never_exceed_chunk_size(
        text in "([a-záéíñ]{1,12}[ \n]{0,2}){0,80}",
        chunk_size in 5usize..120,
        overlap_ratio in 0.0f64..0.9,
    ) {
        let overlap = ((chunk_size as f64) * overlap_ratio) as usize;
        let chunks = RecursiveChunker::new(chunk_size, overlap).chunk(&doc(text.clone()));
        for chunk in &chunks {
            prop_assert!(chunk.text.chars().count() <= chunk_size, "{:?}", chunk.text);
            prop_assert!(!chunk.text.trim().is_empty());
            prop_assert_eq!(chunk.text.trim(), chunk.text.as_str());
        }
        if text.trim().is_empty() {
            prop_assert!(chunks.is_empty());
        } else {
            prop_assert!(!chunks.is_empty());
        }
    }

    #[test]
    fn every_word_survives_chunking(
        words in proptest::collection::vec("[a-z]{1,10}", 1..60),
        chunk_size in 12usize..80,
    ) {
        let text = words.join(" ");
        let chunks = RecursiveChunker::new(chunk_size, chunk_size / 4).chunk(&doc(text));
        let joined: Vec<&str> = chunks.iter().flat_map(|c| c.text.split(' ')).collect();
        for word in &words {
            prop_assert!(joined.contains(&word.as_str()), "lost {word}");
        }
    }
}

#[test]
fn chunk_ids_follow_document_and_index() {
    let text = "Deload weeks cut volume.\n\nRest days matter.\n\nSleep at least seven hours.";
    let chunks = RecursiveChunker::new(30, 5).chunk(&doc(text.to_string()));
    let ids: Vec<_> = chunks.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["plan_p1_0", "plan_p1_1", "plan_p1_2"]);
    assert!(chunks.iter().all(|c| c.document_id == "plan_p1"));
}
