//! Cache clearing command implementation

use std::io::{self, Write};

use anyhow::Result;
use torchlight_core::cache::{CacheStore, store_for};
use torchlight_core::{CacheDriver, Config};

/// Flush the configured cache store and report what was cleared.
pub fn execute(config: &Config) -> Result<()> {
    let store = store_for(config)?;
    execute_clear(config, store.as_ref(), io::stdout().lock())
}

/// Core clear implementation with an injectable store and writer.
pub fn execute_clear<W: Write>(config: &Config, store: &dyn CacheStore, mut writer: W) -> Result<()> {
    match config.cache {
        CacheDriver::File => {
            store.flush()?;
            writeln!(
                writer,
                "Cleared cache at {}",
                config.resolved_cache_dir()?.display()
            )?;
        },
        CacheDriver::Memory | CacheDriver::None => {
            writeln!(writer, "Nothing to clear: the {:?} cache is not persisted", config.cache)?;
        },
    }
    Ok(())
}
