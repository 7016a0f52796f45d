use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{IndexError, Result};

pub type DocId = u64;

/// Single corpus record. Lives only for the duration of a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: DocId,
    pub text: String,
}

impl Document {
    pub fn new(id: DocId, text: impl AsRef<str>) -> Self {
        Self {
            id,
            text: text.as_ref().trim().to_string(),
        }
    }

    /// Whitespace-delimited tokens of the text, empty pieces skipped.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.text.split_whitespace()
    }

    /// Parses a `<id><whitespace><text>` dataset line. `line_no` is 1-based and only
    /// used for error reporting.
    pub fn parse_line(line: &str, line_no: usize) -> Result<Self> {
        let line = line.trim();
        let (raw_id, text) = match line.split_once(char::is_whitespace) {
            Some((raw_id, text)) => (raw_id, text),
            None => (line, ""),
        };

        let id = raw_id.parse::<DocId>().map_err(|e| IndexError::InvalidDocument {
            line: line_no,
            reason: format!("document id {:?} is not a non-negative integer: {}", raw_id, e),
        })?;

        Ok(Self::new(id, text))
    }
}

/// Reads every non-empty line of a dataset file into a [`Document`].
pub fn load_documents(path: impl AsRef<Path>) -> Result<Vec<Document>> {
    let path = path.as_ref();
    info!(path = %path.display(), "loading documents");

    let file = File::open(path).map_err(|e| IndexError::storage(path, e))?;
    let reader = BufReader::with_capacity(1024 * 1024, file);

    let mut documents = Vec::new();
    let mut seen_ids = HashSet::new();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| match e.kind() {
            ErrorKind::InvalidData => IndexError::InvalidDocument {
                line: line_no,
                reason: "line is not valid UTF-8".to_string(),
            },
            _ => IndexError::storage(path, e),
        })?;

        if line.trim().is_empty() {
            continue;
        }

        let document = Document::parse_line(&line, line_no)?;
        if !seen_ids.insert(document.id) {
            // Both records still contribute their tokens under the same id.
            warn!(id = document.id, line = line_no, "duplicate document id");
        }
        documents.push(document);
    }

    debug!(count = documents.len(), "documents parsed");
    Ok(documents)
}
