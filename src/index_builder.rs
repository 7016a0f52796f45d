use std::collections::{BTreeSet, HashMap};

use rayon::prelude::*;

use crate::document_record::{DocId, Document};

pub type PostingSet = BTreeSet<DocId>;

/// token -> ids of every document containing it
pub type PostingsMap = HashMap<String, PostingSet>;

/// Builds the postings mapping for a corpus.
///
/// Documents are folded into per-thread partial maps which are then merged, so the
/// call touches nothing outside its own locals and can run concurrently with
/// other builds.
pub fn build_postings(documents: &[Document]) -> PostingsMap {
    documents
        .par_iter()
        .fold(PostingsMap::new, |mut postings, document| {
            add_document(&mut postings, document);
            postings
        })
        .reduce(PostingsMap::new, merge_postings)
}

fn add_document(postings: &mut PostingsMap, document: &Document) {
    for token in document.tokens() {
        // Avoid allocating the key when the token was seen before.
        match postings.get_mut(token) {
            Some(ids) => {
                ids.insert(document.id);
            }
            None => {
                postings.insert(token.to_string(), BTreeSet::from([document.id]));
            }
        }
    }
}

fn merge_postings(mut left: PostingsMap, mut right: PostingsMap) -> PostingsMap {
    if left.len() < right.len() {
        std::mem::swap(&mut left, &mut right);
    }

    for (token, ids) in right {
        left.entry(token).or_default().extend(ids);
    }
    left
}
