use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;

use tracing::debug;

use crate::error::{IndexError, Result};

/// Reads one query per line; each query is the line's whitespace-separated words.
/// Blank lines are kept as empty queries so output lines match input lines.
pub fn load_queries(path: impl AsRef<Path>) -> Result<Vec<Vec<String>>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| IndexError::storage(path, e))?;

    let queries = BufReader::new(file)
        .lines()
        .enumerate()
        .map(|(idx, line)| -> Result<Vec<String>> {
            let line = line.map_err(|e| match e.kind() {
                ErrorKind::InvalidData => IndexError::InvalidQuery {
                    line: idx + 1,
                    reason: "line is not valid UTF-8".to_string(),
                },
                _ => IndexError::storage(path, e),
            })?;
            Ok(line.split_whitespace().map(str::to_string).collect())
        })
        .collect::<Result<Vec<Vec<String>>>>()?;

    debug!(path = %path.display(), count = queries.len(), "queries loaded");
    Ok(queries)
}
