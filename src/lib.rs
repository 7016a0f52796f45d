//! Word-to-document inverted index.
//!
//! Documents are `(id, text)` pairs; their whitespace-separated tokens are mapped to
//! the set of ids containing them. Queries return the ids containing every word.
//! Indexes persist in a small versioned binary format (see [`index_format`]).

pub mod atomic_index_manager;
pub mod document_record;
pub mod error;
pub mod index_builder;
pub mod index_format;
pub mod inverted_index;
pub mod query_file;

pub use document_record::{load_documents, DocId, Document};
pub use error::{IndexError, Result};
pub use index_builder::{build_postings, PostingSet, PostingsMap};
pub use inverted_index::{IndexStats, InvertedIndex};
pub use query_file::load_queries;
