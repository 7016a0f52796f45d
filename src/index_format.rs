//! Binary format for persisted postings.
//!
//! # File Layout
//!
//! ```text
//! magic        4 bytes  b"WIDX"
//! version      u32      INDEX_VERSION
//! term_count   u64
//! term_count × {
//!     term_len   u32
//!     term       term_len bytes, UTF-8
//!     doc_count  u32
//!     doc_ids    doc_count × u64, strictly ascending
//! }
//! crc32        u32      over every preceding byte
//! ```
//!
//! All integers are little-endian. Terms are written in ascending byte order,
//! so two equal mappings always encode to identical bytes.

use std::collections::BTreeSet;

use crate::document_record::DocId;
use crate::error::{IndexError, Result};
use crate::index_builder::PostingsMap;

/// Magic bytes for index files.
pub const INDEX_MAGIC: [u8; 4] = *b"WIDX";

/// Index file format version.
pub const INDEX_VERSION: u32 = 1;

const HEADER_LEN: usize = 4 + 4 + 8;
const FOOTER_LEN: usize = 4;

/// Encodes postings into the versioned binary layout.
///
/// Fails with [`IndexError::TooLarge`] when a term is longer than `u32::MAX` bytes or
/// a posting set holds more than `u32::MAX` ids, since neither fits its length field.
pub fn encode(postings: &PostingsMap) -> Result<Vec<u8>> {
    let mut terms: Vec<(&String, &BTreeSet<DocId>)> = postings.iter().collect();
    terms.sort_unstable_by(|a, b| a.0.cmp(b.0));

    let body_len: usize = terms
        .iter()
        .map(|(term, ids)| 4 + term.len() + 4 + ids.len() * 8)
        .sum();
    let mut buf = Vec::with_capacity(HEADER_LEN + body_len + FOOTER_LEN);

    buf.extend_from_slice(&INDEX_MAGIC);
    buf.extend_from_slice(&INDEX_VERSION.to_le_bytes());
    buf.extend_from_slice(&(terms.len() as u64).to_le_bytes());

    for (term, ids) in terms {
        buf.extend_from_slice(&length_field(term.len(), "term length")?.to_le_bytes());
        buf.extend_from_slice(term.as_bytes());
        buf.extend_from_slice(&length_field(ids.len(), "document count")?.to_le_bytes());
        for id in ids {
            buf.extend_from_slice(&id.to_le_bytes());
        }
    }

    let crc = crc32fast::hash(&buf);
    buf.extend_from_slice(&crc.to_le_bytes());
    Ok(buf)
}

fn length_field(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| IndexError::TooLarge(format!("{} {} exceeds u32::MAX", what, len)))
}

/// Decodes bytes produced by [`encode`], rejecting anything that does not
/// describe a valid mapping.
pub fn decode(bytes: &[u8]) -> Result<PostingsMap> {
    if bytes.len() < HEADER_LEN + FOOTER_LEN {
        return Err(IndexError::corrupt(format!(
            "index is {} bytes, shorter than the minimum {}",
            bytes.len(),
            HEADER_LEN + FOOTER_LEN
        )));
    }

    let (payload, footer) = bytes.split_at(bytes.len() - FOOTER_LEN);

    let mut reader = SliceReader::new(payload);
    let magic = reader.take(4, "magic")?;
    if magic != INDEX_MAGIC {
        return Err(IndexError::corrupt(format!(
            "not an index file: expected WIDX, got {:?}",
            magic
        )));
    }
    let version = reader.read_u32("version")?;
    if version != INDEX_VERSION {
        return Err(IndexError::corrupt(format!(
            "unsupported index version: {}",
            version
        )));
    }

    // Checked after the header so a foreign file reports the more useful error.
    let stored_crc = u32::from_le_bytes([footer[0], footer[1], footer[2], footer[3]]);
    let computed_crc = crc32fast::hash(payload);
    if stored_crc != computed_crc {
        return Err(IndexError::corrupt(format!(
            "checksum mismatch: stored {:#010x}, computed {:#010x}",
            stored_crc, computed_crc
        )));
    }

    let term_count = reader.read_u64("term count")?;
    let mut postings = PostingsMap::with_capacity(capacity_hint(term_count, reader.remaining()));

    for _ in 0..term_count {
        let term_len = reader.read_u32("term length")? as usize;
        if term_len == 0 {
            return Err(IndexError::corrupt("empty term"));
        }
        let term = std::str::from_utf8(reader.take(term_len, "term")?)
            .map_err(|e| IndexError::corrupt(format!("term is not valid UTF-8: {}", e)))?
            .to_string();

        let doc_count = reader.read_u32("document count")?;
        if doc_count == 0 {
            return Err(IndexError::corrupt(format!("term {:?} has no documents", term)));
        }

        let mut ids = BTreeSet::new();
        let mut previous: Option<DocId> = None;
        for _ in 0..doc_count {
            let id = reader.read_u64("document id")?;
            if previous.is_some_and(|prev| prev >= id) {
                return Err(IndexError::corrupt(format!(
                    "document ids for term {:?} are not strictly ascending",
                    term
                )));
            }
            previous = Some(id);
            ids.insert(id);
        }

        if postings.insert(term, ids).is_some() {
            return Err(IndexError::corrupt("duplicate term"));
        }
    }

    if reader.remaining() != 0 {
        return Err(IndexError::corrupt(format!(
            "{} unexpected trailing bytes",
            reader.remaining()
        )));
    }

    Ok(postings)
}

/// Never trust a declared count further than the bytes that could back it.
fn capacity_hint(declared: u64, remaining: usize) -> usize {
    // Smallest possible term record: 4 + 1 + 4 + 8 bytes.
    let max_possible = remaining / 17;
    usize::try_from(declared).unwrap_or(usize::MAX).min(max_possible)
}

struct SliceReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> SliceReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(IndexError::corrupt(format!(
                "truncated while reading {} at offset {}",
                what, self.pos
            )));
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_u32(&mut self, what: &str) -> Result<u32> {
        let raw = self.take(4, what)?;
        Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    fn read_u64(&mut self, what: &str) -> Result<u64> {
        let raw = self.take(8, what)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(raw);
        Ok(u64::from_le_bytes(buf))
    }
}
