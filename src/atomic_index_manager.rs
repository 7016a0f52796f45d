use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use fs4::fs_std::FileExt;
use tracing::{debug, info, warn};

use crate::error::{IndexError, Result};
use crate::inverted_index::InvertedIndex;

/// Replaces an index file atomically.
///
/// Bytes are written to a sibling `.tmp` file, synced, then renamed over the target,
/// so readers see either the previous index or the complete new one. An exclusive
/// lock on a sibling `.lock` file keeps two builds from interleaving.
pub struct AtomicIndexManager {
    pub index_path: PathBuf,
}

impl AtomicIndexManager {
    pub fn new(index_path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: index_path.into(),
        }
    }

    pub fn temp_path(&self) -> PathBuf {
        sibling(&self.index_path, "tmp")
    }

    pub fn lock_path(&self) -> PathBuf {
        sibling(&self.index_path, "lock")
    }

    pub fn save(&self, index: &InvertedIndex) -> Result<()> {
        let lock_path = self.lock_path();
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&lock_path)
            .map_err(|e| IndexError::storage(&lock_path, e))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(IndexError::Locked(self.index_path.clone()));
        }
        debug!(path = %lock_path.display(), "acquired index lock");

        // The lock is released when `lock_file` drops, on every return path.
        self.cleanup_temp_files();
        self.save_locked(index)
    }

    fn save_locked(&self, index: &InvertedIndex) -> Result<()> {
        let temp_path = self.temp_path();
        let bytes = index.serialize()?;

        if let Err(e) = write_synced(&temp_path, &bytes) {
            let _ = fs::remove_file(&temp_path);
            return Err(IndexError::storage(&temp_path, e));
        }

        if let Err(e) = fs::rename(&temp_path, &self.index_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(IndexError::storage(&self.index_path, e));
        }

        info!(
            path = %self.index_path.display(),
            bytes = bytes.len(),
            "index saved"
        );
        Ok(())
    }

    /// Removes a temp file left behind by an interrupted save.
    pub fn cleanup_temp_files(&self) {
        let temp_path = self.temp_path();
        if !temp_path.exists() {
            return;
        }
        match fs::remove_file(&temp_path) {
            Ok(()) => debug!(path = %temp_path.display(), "removed stale temp file"),
            Err(e) => warn!(
                path = %temp_path.display(),
                error = %e,
                "could not remove stale temp file"
            ),
        }
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(1024 * 1024, file);
    writer.write_all(bytes)?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()
}

fn sibling(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}
