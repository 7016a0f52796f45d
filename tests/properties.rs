use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use wiki_index::{build_postings, DocId, Document, InvertedIndex};

const VOCAB: &[&str] = &["the", "cat", "dog", "sat", "ran", "Cat", "fox", "über", "a"];

fn document() -> impl Strategy<Value = Document> {
    (
        0u64..50,
        prop::collection::vec(prop::sample::select(VOCAB), 0..8),
        prop::sample::select(vec![" ", "  ", "\t", "\n", " \u{3000} "]),
    )
        .prop_map(|(id, words, sep)| Document::new(id, words.join(sep)))
}

fn corpus() -> impl Strategy<Value = Vec<Document>> {
    prop::collection::vec(document(), 0..30)
}

fn words() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(prop::sample::select(VOCAB).prop_map(str::to_string), 0..4)
}

/// Reference answer by scanning every document. Records sharing an id merge,
/// so an id matches when the union of its records' tokens covers the query.
fn scan(docs: &[Document], words: &[String]) -> Vec<DocId> {
    if words.is_empty() {
        return Vec::new();
    }
    let mut by_id: BTreeMap<DocId, BTreeSet<&str>> = BTreeMap::new();
    for doc in docs {
        by_id.entry(doc.id).or_default().extend(doc.tokens());
    }
    by_id
        .into_iter()
        .filter(|(_, tokens)| words.iter().all(|w| tokens.contains(w.as_str())))
        .map(|(id, _)| id)
        .collect()
}

proptest! {
    #[test]
    fn build_is_sound_and_complete(docs in corpus()) {
        let postings = build_postings(&docs);

        for doc in &docs {
            for token in doc.tokens() {
                prop_assert!(postings[token].contains(&doc.id));
            }
        }
        for (token, ids) in &postings {
            prop_assert!(!ids.is_empty());
            for id in ids {
                prop_assert!(docs
                    .iter()
                    .any(|d| d.id == *id && d.tokens().any(|t| t == token)));
            }
        }
    }

    #[test]
    fn query_matches_scan(docs in corpus(), query in words()) {
        let index = InvertedIndex::build(&docs);
        prop_assert_eq!(index.query(&query), scan(&docs, &query));
    }

    #[test]
    fn query_output_strictly_ascending(docs in corpus(), query in words()) {
        let ids = InvertedIndex::build(&docs).query(&query);
        prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn roundtrip_preserves_answers(docs in corpus(), queries in prop::collection::vec(words(), 1..6)) {
        let index = InvertedIndex::build(&docs);
        let restored = InvertedIndex::deserialize(&index.serialize().unwrap()).unwrap();

        prop_assert_eq!(&restored, &index);
        for query in &queries {
            prop_assert_eq!(restored.query(query), index.query(query));
        }
    }

    #[test]
    fn queries_do_not_leak_state(docs in corpus(), first in words(), second in words()) {
        let index = InvertedIndex::build(&docs);
        let fresh = index.clone();

        let _ = index.query(&first);
        prop_assert_eq!(index.query(&second), fresh.query(&second));
    }

    #[test]
    fn decode_never_panics_on_mutation(docs in corpus(), pos in any::<prop::sample::Index>(), byte in any::<u8>()) {
        let mut bytes = InvertedIndex::build(&docs).serialize().unwrap();
        let at = pos.index(bytes.len());
        let original = bytes[at];
        bytes[at] = byte;

        let decoded = InvertedIndex::deserialize(&bytes);
        if original == byte {
            prop_assert!(decoded.is_ok());
        } else {
            prop_assert!(decoded.is_err());
        }
    }
}
