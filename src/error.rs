//! Error types for index building, persistence and loading

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Invalid document on line {line}: {reason}")]
    InvalidDocument { line: usize, reason: String },

    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    #[error("Storage error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Index too large to encode: {0}")]
    TooLarge(String),

    #[error("Invalid query on line {line}: {reason}")]
    InvalidQuery { line: usize, reason: String },

    #[error("Index at {} is locked by another build", .0.display())]
    Locked(PathBuf),
}

impl IndexError {
    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        IndexError::CorruptIndex(reason.into())
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IndexError::Storage {
            path: path.into(),
            source,
        }
    }
}
