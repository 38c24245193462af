//! Disk cache for raw service responses.
//!
//! One file per request, named by the SHA-256 hex digest of the full request
//! URL (host, path and query), holding the response bytes. An entry is fresh
//! while its modification time is at most one day old.

use crate::error::{EcsError, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Age beyond which an entry is stale.
pub const MAX_AGE: Duration = Duration::from_secs(86_400);

/// Flat-directory response cache.
#[derive(Debug, Clone)]
pub struct Cache {
    path: PathBuf,
}

impl Cache {
    /// Default cache directory.
    pub fn default_dir() -> PathBuf {
        std::env::temp_dir().join("amazon")
    }

    /// Opens the cache at `path`, creating the directory if it is missing.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            debug!("Creating cache directory {}", path.display());
            fs::create_dir_all(&path).map_err(|e| path_error(&path, e.to_string()))?;
        }

        let meta = fs::metadata(&path).map_err(|e| path_error(&path, e.to_string()))?;
        if !meta.is_dir() {
            return Err(path_error(&path, "is not a directory"));
        }
        if fs::read_dir(&path).is_err() {
            return Err(path_error(&path, "is not readable"));
        }
        // Dropping the scratch file removes it again.
        NamedTempFile::new_in(&path).map_err(|_| path_error(&path, "is not writable"))?;

        Ok(Self { path })
    }

    /// Directory holding the entries.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cache key for a URL.
    pub fn key(url: &str) -> String {
        hex::encode(Sha256::digest(url.as_bytes()))
    }

    fn entry_path(&self, url: &str) -> PathBuf {
        self.path.join(Self::key(url))
    }

    /// Returns true if a fresh entry exists for `url`.
    pub fn is_cached(&self, url: &str) -> bool {
        entry_age(&self.entry_path(url)).is_some_and(|age| age <= MAX_AGE)
    }

    /// Returns the cached bytes for `url`, if present and readable.
    ///
    /// Freshness is not checked here; callers test [`Cache::is_cached`] first.
    pub fn fetch(&self, url: &str) -> Option<Vec<u8>> {
        let entry = self.entry_path(url);
        match fs::read(&entry) {
            Ok(bytes) if !bytes.is_empty() => {
                debug!("Fetching {} from cache", entry.display());
                Some(bytes)
            }
            Ok(_) => None,
            Err(e) => {
                if entry.exists() {
                    warn!("Unreadable cache entry {}: {}", entry.display(), e);
                }
                None
            }
        }
    }

    /// Stores `contents` for `url`, replacing any previous entry.
    pub fn store(&self, url: &str, contents: &[u8]) -> Result<()> {
        let key = Self::key(url);
        debug!("Caching {}", key);

        // The temporary file is deleted on drop unless it was persisted.
        let mut file = NamedTempFile::new_in(&self.path)?;
        file.write_all(contents)?;
        file.as_file().sync_all()?;
        file.persist(self.path.join(&key)).map_err(|e| e.error)?;
        Ok(())
    }

    /// Removes every entry. Returns the number removed.
    pub fn flush_all(&self) -> Result<usize> {
        self.flush(|_| true)
    }

    /// Removes entries older than [`MAX_AGE`]. Returns the number removed.
    pub fn flush_expired(&self) -> Result<usize> {
        self.flush(|path| entry_age(path).map_or(true, |age| age > MAX_AGE))
    }

    fn flush(&self, doomed: impl Fn(&Path) -> bool) -> Result<usize> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.path)? {
            let path = entry?.path();
            if path.is_file() && doomed(&path) {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        debug!("Flushed {} cache entries from {}", removed, self.path.display());
        Ok(removed)
    }
}

fn path_error(path: &Path, reason: impl Into<String>) -> EcsError {
    EcsError::CachePath { path: path.to_path_buf(), reason: reason.into() }
}

fn entry_age(path: &Path) -> Option<Duration> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    // A modification time in the future counts as brand new.
    Some(SystemTime::now().duration_since(modified).unwrap_or(Duration::ZERO))
}
