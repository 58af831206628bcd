//! On-disk cache for raw fetched report documents.
//!
//! Daily bulletins are published as sizable archives that never change once
//! posted, so re-parsing should not mean re-downloading. Entries are keyed by
//! the blake3 hash of the document URL; writes are atomic (tmp then rename).

use crate::error::UpdateError;
use std::fs;
use std::path::{Path, PathBuf};

pub struct NetCache {
    dir: PathBuf,
}

impl NetCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let hash = blake3::hash(key.as_bytes()).to_hex();
        self.dir.join(format!("{hash}.bin"))
    }

    /// Cached bytes for a key, if present.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        fs::read(self.entry_path(key)).ok()
    }

    pub fn put(&self, key: &str, bytes: &[u8]) -> Result<(), UpdateError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| UpdateError::Store(format!("failed to create cache dir: {e}")))?;

        let path = self.entry_path(key);
        let tmp_path = path.with_extension("bin.tmp");
        fs::write(&tmp_path, bytes)
            .map_err(|e| UpdateError::Store(format!("cache write: {e}")))?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            UpdateError::Store(format!("cache rename: {e}"))
        })?;
        Ok(())
    }

    /// Fetch-through: return the cached bytes or fetch, store, and return.
    pub fn get_or_fetch<F>(&self, key: &str, fetch: F) -> Result<Vec<u8>, UpdateError>
    where
        F: FnOnce() -> Result<Vec<u8>, UpdateError>,
    {
        if let Some(bytes) = self.get(key) {
            return Ok(bytes);
        }
        let bytes = fetch()?;
        self.put(key, &bytes)?;
        Ok(bytes)
    }

    pub fn remove(&self, key: &str) {
        let _ = fs::remove_file(self.entry_path(key));
    }
}
