//! Cache stores for resolved block output.
//!
//! Entries are keyed by [`cache_key`] (`torchlight::block-<hash>`) and hold the
//! JSON form of the output fields that were actually produced. A miss is never an
//! error; it only means the block has to be requested.
//!
//! ## Key Types
//!
//! - [`CacheStore`]: the store contract
//! - [`MemoryCache`]: in-process map with per-entry expiry
//! - [`FileCache`]: one JSON file per entry, shared across processes
//! - [`NullCache`]: stores nothing
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use torchlight_core::cache::{CacheStore, MemoryCache};
//!
//! let cache = MemoryCache::new();
//! cache.put("torchlight::block-abc", serde_json::json!({"wrapped": "<pre/>"}), Duration::from_secs(60))?;
//! assert!(cache.get("torchlight::block-abc").is_some());
//! assert!(cache.get("torchlight::block-missing").is_none());
//! # Ok::<(), torchlight_core::Error>(())
//! ```

mod file;
mod memory;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

pub use file::FileCache;
pub use memory::MemoryCache;

use crate::config::{CacheDriver, Config};
use crate::{Block, Result};

/// Prefix for every cache key written by the client.
pub const CACHE_PREFIX: &str = "torchlight::";

/// Cache key for a block: `torchlight::block-<hash>`.
pub fn cache_key(block: &Block) -> String {
    format!("{CACHE_PREFIX}block-{}", block.hash())
}

/// Key/value store with expiry.
///
/// Implementations must tolerate concurrent use from independent resolution
/// calls. Writes to the same key are last-write-wins.
pub trait CacheStore: Send + Sync {
    /// Fetch a live entry.
    fn get(&self, key: &str) -> Option<Value>;

    /// Store an entry that expires after `ttl`.
    fn put(&self, key: &str, value: Value, ttl: Duration) -> Result<()>;

    /// Store an entry that never expires.
    fn forever(&self, key: &str, value: Value) -> Result<()>;

    /// Remove one entry.
    fn forget(&self, key: &str) -> Result<()>;

    /// Remove every entry.
    fn flush(&self) -> Result<()>;
}

/// A store that never keeps anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCache;

impl CacheStore for NullCache {
    fn get(&self, _key: &str) -> Option<Value> {
        None
    }

    fn put(&self, _key: &str, _value: Value, _ttl: Duration) -> Result<()> {
        Ok(())
    }

    fn forever(&self, _key: &str, _value: Value) -> Result<()> {
        Ok(())
    }

    fn forget(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Build the store selected by `config.cache`.
pub fn store_for(config: &Config) -> Result<Arc<dyn CacheStore>> {
    Ok(match config.cache {
        CacheDriver::Memory => Arc::new(MemoryCache::new()),
        CacheDriver::File => Arc::new(FileCache::new(config.resolved_cache_dir()?)),
        CacheDriver::None => Arc::new(NullCache),
    })
}
