//! Configuration loading for the CLI.

use std::path::Path;

use anyhow::{Context, Result};
use torchlight_core::{CacheDriver, Config};

/// Defaults the CLI starts from before reading any file.
///
/// A one-shot process gains nothing from a memory cache, so the CLI caches
/// to disk unless told otherwise.
pub fn cli_defaults() -> Config {
    Config {
        cache: CacheDriver::File,
        ..Config::default()
    }
}

/// Load the effective configuration.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = Config::layered(cli_defaults(), path).with_context(|| match path {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Failed to load configuration".to_string(),
    })?;
    tracing::debug!(
        cache = ?config.cache,
        environment = %config.environment,
        "configuration loaded"
    );
    Ok(config)
}

/// Copy of `config` that is safe to print.
pub fn redacted(config: &Config) -> Config {
    let mut shown = config.clone();
    if let Some(token) = shown.token.as_mut() {
        *token = redact(token);
    }
    shown
}

fn redact(token: &str) -> String {
    let visible: String = token.chars().take(6).collect();
    if token.chars().count() <= 10 {
        "********".to_string()
    } else {
        format!("{visible}********")
    }
}
