use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Instant;

use tracing::{debug, info};

use crate::atomic_index_manager::AtomicIndexManager;
use crate::document_record::{DocId, Document};
use crate::error::{IndexError, Result};
use crate::index_builder::{build_postings, PostingSet, PostingsMap};
use crate::index_format;

/// Read-only word -> documents index.
///
/// Owns its postings exclusively and exposes no way to change them, so a loaded
/// index can be shared between threads and queried without locking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvertedIndex {
    postings: PostingsMap,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub documents: usize,
    pub terms: usize,
}

impl InvertedIndex {
    pub fn new(mut postings: PostingsMap) -> Self {
        // An empty posting set can only come from a hand-built map; it would also
        // be unencodable, and dropping it leaves every query answer unchanged.
        postings.retain(|_, ids| !ids.is_empty());
        Self { postings }
    }

    pub fn build(documents: &[Document]) -> Self {
        let started = Instant::now();
        let index = Self::new(build_postings(documents));

        let stats = index.stats();
        info!(
            documents = documents.len(),
            terms = stats.terms,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "inverted index built"
        );
        index
    }

    /// Ids of documents containing every word, ascending.
    ///
    /// An empty word list matches nothing, as does any list containing a word the
    /// index has never seen.
    pub fn query<I, S>(&self, words: I) -> Vec<DocId>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut word_postings: Vec<&PostingSet> = Vec::new();
        for word in words {
            match self.postings.get(word.as_ref()) {
                Some(ids) => word_postings.push(ids),
                None => return Vec::new(),
            }
        }

        // Rarest word first keeps the running set as small as possible.
        word_postings.sort_unstable_by_key(|ids| ids.len());

        let mut common: Option<PostingSet> = None;
        for ids in word_postings {
            let next = match common {
                None => ids.clone(),
                Some(mut acc) => {
                    acc.retain(|id| ids.contains(id));
                    acc
                }
            };
            let exhausted = next.is_empty();
            common = Some(next);
            if exhausted {
                break;
            }
        }

        common
            .map(|ids| ids.into_iter().collect())
            .unwrap_or_default()
    }

    /// Posting set of a single word, if any document contains it.
    pub fn postings(&self, word: &str) -> Option<&PostingSet> {
        self.postings.get(word)
    }

    pub fn stats(&self) -> IndexStats {
        let documents: HashSet<DocId> = self.postings.values().flatten().copied().collect();
        IndexStats {
            documents: documents.len(),
            terms: self.postings.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn into_postings(self) -> PostingsMap {
        self.postings
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        index_format::encode(&self.postings)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        index_format::decode(bytes).map(Self::new)
    }

    /// Persists the index, replacing `path` only once the new bytes are fully on disk.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        AtomicIndexManager::new(path.as_ref()).save(self)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let started = Instant::now();

        let bytes = fs::read(path).map_err(|e| IndexError::storage(path, e))?;
        debug!(path = %path.display(), bytes = bytes.len(), "index file read");

        let index = Self::deserialize(&bytes)?;
        let stats = index.stats();
        info!(
            path = %path.display(),
            documents = stats.documents,
            terms = stats.terms,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "inverted index loaded"
        );
        Ok(index)
    }
}

impl From<PostingsMap> for InvertedIndex {
    fn from(postings: PostingsMap) -> Self {
        Self::new(postings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn corpus() -> Vec<Document> {
        vec![
            Document::new(1, "the cat sat"),
            Document::new(2, "the dog sat"),
            Document::new(3, "the cat ran"),
        ]
    }

    #[test]
    fn test_query_single_word() {
        let index = InvertedIndex::build(&corpus());
        assert_eq!(index.query(["cat"]), vec![1, 3]);
        assert_eq!(index.query(["the"]), vec![1, 2, 3]);
    }

    #[test]
    fn test_query_intersects_words() {
        let index = InvertedIndex::build(&corpus());
        assert_eq!(index.query(["cat", "sat"]), vec![1]);
        assert_eq!(index.query(["sat", "cat"]), vec![1]);
        assert_eq!(index.query(["the", "sat"]), vec![1, 2]);
    }

    #[test]
    fn test_query_disjoint_words_is_empty() {
        let index = InvertedIndex::build(&corpus());
        assert!(index.query(["dog", "ran"]).is_empty());
    }

    #[test]
    fn test_query_absent_word() {
        let index = InvertedIndex::build(&corpus());
        assert!(index.query(["fox"]).is_empty());
        assert!(index.query(["cat", "fox"]).is_empty());
        assert!(index.query(["fox", "cat"]).is_empty());
    }

    #[test]
    fn test_query_empty_word_list() {
        let index = InvertedIndex::build(&corpus());
        assert!(index.query(Vec::<String>::new()).is_empty());
    }

    #[test]
    fn test_query_repeated_word() {
        let index = InvertedIndex::build(&corpus());
        assert_eq!(index.query(["cat", "cat"]), vec![1, 3]);
    }

    #[test]
    fn test_query_is_case_sensitive() {
        let index = InvertedIndex::build(&corpus());
        assert!(index.query(["Cat"]).is_empty());
    }

    #[test]
    fn test_query_does_not_touch_postings() {
        let index = InvertedIndex::build(&corpus());
        let before = index.clone();

        assert_eq!(index.query(["cat", "dog"]), Vec::<DocId>::new());
        assert_eq!(index.query(["cat"]), vec![1, 3]);
        assert_eq!(index, before);
    }

    #[test]
    fn test_empty_posting_set_is_dropped() {
        let postings = PostingsMap::from([
            ("ghost".to_string(), BTreeSet::new()),
            ("cat".to_string(), BTreeSet::from([5])),
        ]);
        let index = InvertedIndex::from(postings);

        assert!(index.postings("ghost").is_none());
        assert!(index.query(["ghost"]).is_empty());
        assert_eq!(index.query(["cat"]), vec![5]);
        assert_eq!(InvertedIndex::deserialize(&index.serialize().unwrap()).unwrap(), index);
    }

    #[test]
    fn test_empty_corpus() {
        let index = InvertedIndex::build(&[]);
        assert!(index.is_empty());
        assert!(index.query(["anything"]).is_empty());
        assert_eq!(index.stats(), IndexStats { documents: 0, terms: 0 });
    }

    #[test]
    fn test_stats() {
        let mut docs = corpus();
        docs.push(Document::new(4, "   "));
        let index = InvertedIndex::build(&docs);
        // Document 4 has no tokens and so is invisible to the index.
        assert_eq!(index.stats(), IndexStats { documents: 3, terms: 5 });
    }

    #[test]
    fn test_serialize_roundtrip_preserves_queries() {
        let index = InvertedIndex::build(&corpus());
        let restored = InvertedIndex::deserialize(&index.serialize().unwrap()).unwrap();

        assert_eq!(restored, index);
        assert_eq!(restored.query(["cat", "sat"]), vec![1]);
    }

    #[test]
    fn test_deserialize_truncated() {
        let bytes = InvertedIndex::build(&corpus()).serialize().unwrap();
        let err = InvertedIndex::deserialize(&bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, IndexError::CorruptIndex(_)));
    }

    #[test]
    fn test_concurrent_queries() {
        let index = InvertedIndex::build(&corpus());
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..100 {
                        assert_eq!(index.query(["cat", "sat"]), vec![1]);
                        assert!(index.query(["cat", "dog"]).is_empty());
                    }
                });
            }
        });
    }
}
