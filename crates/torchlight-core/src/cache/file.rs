//! File-backed cache store.
//!
//! ## Storage Layout
//!
//! ```text
//! <root>/
//!   3f2a...e1.json   # one entry per key, named by the SHA-256 of the key
//!   9b0c...47.json
//! ```
//!
//! Each file records its key, value and optional expiry. Writes go through a
//! uniquely named temp file and a rename so readers never observe a half-written entry.
//! Unreadable or corrupt files are treated as misses.

use std::fmt::Write as _;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tempfile::Builder;
use tracing::{debug, warn};

use super::CacheStore;
use crate::{Error, Result};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredEntry {
    key: String,
    value: Value,
    expires_at: Option<DateTime<Utc>>,
}

/// Cache store writing one JSON file per entry under a root directory.
#[derive(Debug, Clone)]
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    /// Create a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        let name = digest.iter().fold(String::with_capacity(69), |mut acc, b| {
            let _ = write!(acc, "{b:02x}");
            acc
        });
        self.root.join(format!("{name}.json"))
    }

    fn write(&self, key: &str, value: Value, expires_at: Option<DateTime<Utc>>) -> Result<()> {
        fs::create_dir_all(&self.root)
            .map_err(|e| Error::Cache(format!("Failed to create cache directory: {e}")))?;

        let path = self.entry_path(key);
        let entry = StoredEntry {
            key: key.to_string(),
            value,
            expires_at,
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| Error::Cache(format!("Failed to serialize cache entry: {e}")))?;

        // Atomic write: uniquely named temp file + rename
        let mut tmp = Builder::new()
            .suffix(".tmp")
            .tempfile_in(&self.root)
            .map_err(|e| Error::Cache(format!("Failed to create temp cache file: {e}")))?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| Error::Cache(format!("Failed to write temp cache file: {e}")))?;
        tmp.persist(&path)
            .map_err(|e| Error::Cache(format!("Failed to commit cache file: {}", e.error)))?;

        debug!(key, "wrote file cache entry");
        Ok(())
    }

    fn read(&self, key: &str) -> Option<StoredEntry> {
        let path = self.entry_path(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to read cache entry {}: {e}", path.display());
                return None;
            },
        };

        match serde_json::from_str::<StoredEntry>(&content) {
            Ok(entry) if entry.key == key => Some(entry),
            Ok(_) => None,
            Err(e) => {
                warn!("Ignoring corrupt cache entry {}: {e}", path.display());
                None
            },
        }
    }
}

impl CacheStore for FileCache {
    fn get(&self, key: &str) -> Option<Value> {
        let entry = self.read(key)?;
        match entry.expires_at {
            Some(at) if at <= Utc::now() => {
                debug!(key, "file cache entry expired");
                let _ = fs::remove_file(self.entry_path(key));
                None
            },
            _ => Some(entry.value),
        }
    }

    fn put(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        // Lifetimes past the representable range never expire.
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl));
        self.write(key, value, expires_at)
    }

    fn forever(&self, key: &str, value: Value) -> Result<()> {
        self.write(key, value, None)
    }

    fn forget(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Cache(format!("Failed to remove cache entry: {e}"))),
        }
    }

    fn flush(&self) -> Result<()> {
        if !self.root.exists() {
            return Ok(());
        }
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json" || ext == "tmp") {
                fs::remove_file(&path)
                    .map_err(|e| Error::Cache(format!("Failed to remove cache entry: {e}")))?;
            }
        }
        debug!("flushed file cache at {}", self.root.display());
        Ok(())
    }
}
