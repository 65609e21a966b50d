//! Configuration for the Torchlight client.
//!
//! Configuration is a typed [`Config`] struct resolved once at startup. It can come
//! from three places, applied in this order:
//!
//! 1. **Defaults**: [`Config::default`]
//! 2. **TOML file**: [`Config::load`] / [`Config::load_from`]
//! 3. **Key lookup**: [`Config::apply_lookup`], which reads string values from any
//!    source (environment variables, a host framework's settings, a plain map)
//!
//! ## Example Configuration File
//!
//! ```toml
//! token = "torch_..."
//! theme = ["github-dark", "github-light"]
//! bust = 2
//! request_chunk_size = 10
//! cache_seconds = "forever"
//! tab_width = false
//!
//! [options]
//! lineNumbers = true
//! ```
//!
//! ## Lookup Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use torchlight_core::Config;
//!
//! let settings = HashMap::from([("token", "secret"), ("theme", "nord")]);
//! let config = Config::from_lookup(|key| settings.get(key).map(|v| (*v).to_string()))?;
//! assert_eq!(config.token.as_deref(), Some("secret"));
//! assert_eq!(config.theme.joined(), "nord");
//! # Ok::<(), torchlight_core::Error>(())
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

/// Default remote highlighter host.
pub const DEFAULT_HOST: &str = "https://api.torchlight.dev";

/// Default theme used when neither the block nor the config names one.
pub const DEFAULT_THEME: &str = "material-theme-palenight";

/// Default cache lifetime: seven days.
pub const DEFAULT_CACHE_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Global highlighting options forwarded verbatim to the remote service.
pub type Options = BTreeMap<String, serde_json::Value>;

/// Every key understood by [`Config::apply_lookup`].
pub const LOOKUP_KEYS: &[&str] = &[
    "token",
    "theme",
    "bust",
    "options",
    "host",
    "request_timeout",
    "request_chunk_size",
    "cache_seconds",
    "tab_width",
    "cache",
    "cache_dir",
    "environment",
];

/// Typed Torchlight configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API token. Required outside production.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Default theme, or a list of themes for multi-theme rendering.
    pub theme: ThemeSetting,

    /// Cache-busting token mixed into every block hash.
    pub bust: Bust,

    /// Global options forwarded to the remote highlighter.
    pub options: Options,

    /// Remote highlighter host, without the `/highlight` path.
    pub host: String,

    /// Per-request timeout in seconds.
    pub request_timeout: u64,

    /// Maximum number of blocks sent in a single request.
    pub request_chunk_size: usize,

    /// Cache lifetime in seconds; `None` caches permanently.
    #[serde(
        serialize_with = "serialize_cache_seconds",
        deserialize_with = "deserialize_cache_seconds"
    )]
    pub cache_seconds: Option<u64>,

    /// Number of spaces a tab expands to, or `false` to keep tabs.
    pub tab_width: TabWidth,

    /// Which cache store hosts should build.
    pub cache: CacheDriver,

    /// Directory for the file cache. Defaults to the platform cache directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Host environment name. `production` swallows request errors.
    pub environment: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: None,
            theme: ThemeSetting::Single(DEFAULT_THEME.to_string()),
            bust: Bust::Number(0),
            options: Options::new(),
            host: DEFAULT_HOST.to_string(),
            request_timeout: 5,
            request_chunk_size: 15,
            cache_seconds: Some(DEFAULT_CACHE_SECONDS),
            tab_width: TabWidth::Spaces(4),
            cache: CacheDriver::Memory,
            cache_dir: None,
            environment: "local".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, then apply `TORCHLIGHT_*`
    /// environment overrides.
    ///
    /// A missing file is not an error; defaults are used instead.
    pub fn load() -> Result<Self> {
        Self::layered(Self::default(), None)
    }

    /// Load configuration from an explicit TOML file, then apply `TORCHLIGHT_*`
    /// environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::layered(Self::default(), Some(path))
    }

    /// Layer a TOML file and `TORCHLIGHT_*` overrides on top of `base`.
    ///
    /// With no explicit `path` the default location is used when it exists.
    /// Keys the file leaves out keep their value from `base`, which lets a host
    /// pick its own defaults (the CLI defaults to the file cache, for example).
    pub fn layered(base: Self, path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => Some(Self::default_path()?).filter(|p| p.exists()),
        };

        let mut config = match path {
            Some(path) => {
                let content = fs::read_to_string(&path).map_err(|e| {
                    Error::Configuration(format!("Failed to read config {}: {e}", path.display()))
                })?;
                tracing::debug!("Loaded config from {}", path.display());
                Self::merge_toml(&base, &content)?
            },
            None => base,
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string. No overrides are applied.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from defaults plus a key lookup function.
    ///
    /// See [`LOOKUP_KEYS`] for the keys that are queried.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_lookup(lookup)?;
        Ok(config)
    }

    /// Override fields with values returned by `lookup`.
    ///
    /// Keys for which `lookup` returns `None` are left untouched. List-valued
    /// keys (`theme`) accept comma-separated strings, `options` accepts a JSON
    /// object, and `cache_seconds` accepts `forever`.
    pub fn apply_lookup<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        for &key in LOOKUP_KEYS {
            let Some(value) = lookup(key) else {
                continue;
            };
            self.set_from_str(key, value.trim())?;
        }
        self.validate()
    }

    /// Apply `TORCHLIGHT_<KEY>` environment variables (see [`env_var_name`]).
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_lookup(|key| std::env::var(env_var_name(key)).ok())
    }

    /// Whether the host runs in production, where request errors are swallowed.
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Per-request timeout.
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Cache entry lifetime; `None` means permanent.
    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_seconds.map(Duration::from_secs)
    }

    /// Directory used by the file cache.
    pub fn resolved_cache_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.cache_dir {
            return Ok(dir.clone());
        }
        let dirs = project_dirs()?;
        Ok(dirs.cache_dir().join("blocks"))
    }

    /// Serialize the configuration as pretty TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Path of the default configuration file.
    ///
    /// - Linux: `~/.config/torchlight/torchlight.toml`
    /// - macOS: `~/Library/Application Support/dev.torchlight.torchlight/torchlight.toml`
    /// - Windows: `%APPDATA%\torchlight\torchlight\config\torchlight.toml`
    pub fn default_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("torchlight.toml"))
    }

    fn merge_toml(base: &Self, content: &str) -> Result<Self> {
        let toml::Value::Table(mut table) = toml::Value::try_from(base)? else {
            return Err(Error::Serialization(
                "configuration did not serialize to a table".into(),
            ));
        };
        let overrides: toml::Table = toml::from_str(content)?;
        table.extend(overrides);

        let config: Self = toml::Value::Table(table).try_into()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.request_chunk_size == 0 {
            return Err(Error::Configuration(
                "request_chunk_size must be at least 1".into(),
            ));
        }
        if self.host.trim().is_empty() {
            return Err(Error::Configuration("host must not be empty".into()));
        }
        Ok(())
    }

    fn set_from_str(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "token" => self.token = Some(value.to_string()).filter(|t| !t.is_empty()),
            "theme" => self.theme = ThemeSetting::parse(value),
            "bust" => self.bust = Bust::parse(value),
            "options" => {
                self.options = serde_json::from_str(value).map_err(|e| {
                    Error::Configuration(format!("options must be a JSON object: {e}"))
                })?;
            },
            "host" => self.host = value.trim_end_matches('/').to_string(),
            "request_timeout" => self.request_timeout = parse_number(key, value)?,
            "request_chunk_size" => self.request_chunk_size = parse_number(key, value)?,
            "cache_seconds" => self.cache_seconds = parse_cache_seconds(value)?,
            "tab_width" => self.tab_width = TabWidth::parse(value)?,
            "cache" => self.cache = CacheDriver::parse(value)?,
            "cache_dir" => self.cache_dir = Some(PathBuf::from(value)),
            "environment" => self.environment = value.to_string(),
            other => {
                return Err(Error::Configuration(format!(
                    "Unknown configuration key '{other}'"
                )));
            },
        }
        Ok(())
    }
}

/// Environment variable consulted for a configuration key.
///
/// `environment` reads `TORCHLIGHT_ENV`; every other key reads
/// `TORCHLIGHT_<KEY>` in upper case.
pub fn env_var_name(key: &str) -> String {
    match key {
        "environment" => "TORCHLIGHT_ENV".to_string(),
        other => format!("TORCHLIGHT_{}", other.to_uppercase()),
    }
}

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("dev", "torchlight", "torchlight")
        .ok_or_else(|| Error::Configuration("Failed to determine project directories".into()))
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::Configuration(format!("{key} must be a number, got '{value}'")))
}

fn parse_cache_seconds(value: &str) -> Result<Option<u64>> {
    if value.eq_ignore_ascii_case("forever") || value.eq_ignore_ascii_case("permanent") {
        return Ok(None);
    }
    parse_number("cache_seconds", value).map(Some)
}

fn serialize_cache_seconds<S>(value: &Option<u64>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(seconds) => serializer.serialize_u64(*seconds),
        None => serializer.serialize_str("forever"),
    }
}

fn deserialize_cache_seconds<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Named(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(seconds) => Ok(Some(seconds)),
        Raw::Named(name) => parse_cache_seconds(&name).map_err(serde::de::Error::custom),
    }
}

/// Default theme: one name, or several for multi-theme rendering.
///
/// Entries may carry a `label:` prefix (`dark:github-dark`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThemeSetting {
    /// A single theme name (which may itself be comma-joined).
    Single(String),
    /// Several themes, rendered as one block plus one clone per extra theme.
    List(Vec<String>),
}

impl ThemeSetting {
    fn parse(value: &str) -> Self {
        Self::Single(value.to_string())
    }

    /// The comma-joined form stored on blocks.
    pub fn joined(&self) -> String {
        match self {
            Self::Single(theme) => theme.clone(),
            Self::List(themes) => themes.join(","),
        }
    }
}

/// Cache-busting token, numeric or textual.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bust {
    /// Numeric bust, e.g. `bust = 2`.
    Number(i64),
    /// Textual bust, e.g. `bust = "2024-05-01"`.
    Text(String),
}

impl Bust {
    fn parse(value: &str) -> Self {
        value
            .parse()
            .map_or_else(|_| Self::Text(value.to_string()), Self::Number)
    }
}

impl fmt::Display for Bust {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Bust {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Bust {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Tab expansion policy: a number of spaces, or `true`/`false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TabWidth {
    /// Expand each tab to this many spaces.
    Spaces(usize),
    /// `true` expands to the default width, `false` keeps tabs verbatim.
    Toggle(bool),
}

impl TabWidth {
    /// Number of spaces per tab, or `None` when tabs are preserved.
    pub const fn spaces(self) -> Option<usize> {
        match self {
            Self::Spaces(n) => Some(n),
            Self::Toggle(true) => Some(4),
            Self::Toggle(false) => None,
        }
    }

    fn parse(value: &str) -> Result<Self> {
        match value {
            "false" | "off" => Ok(Self::Toggle(false)),
            "true" | "on" => Ok(Self::Toggle(true)),
            _ => parse_number("tab_width", value).map(Self::Spaces),
        }
    }
}

/// Cache store selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheDriver {
    /// In-process memory cache.
    Memory,
    /// JSON files on disk, shared across processes.
    File,
    /// Never cache.
    None,
}

impl CacheDriver {
    fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "memory" | "array" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "none" | "null" => Ok(Self::None),
            other => Err(Error::Configuration(format!(
                "Unknown cache driver '{other}' (expected memory, file or none)"
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.theme.joined(), DEFAULT_THEME);
        assert_eq!(config.request_chunk_size, 15);
        assert_eq!(config.cache_ttl(), Some(Duration::from_secs(604_800)));
        assert_eq!(config.tab_width.spaces(), Some(4));
        assert!(!config.is_production());
    }

    #[test]
    fn test_toml_parsing() {
        let config = Config::from_toml(
            r#"
            token = "abc"
            theme = ["github-dark", "github-light"]
            bust = "v2"
            request_chunk_size = 2
            cache_seconds = "forever"
            tab_width = false
            environment = "production"

            [options]
            lineNumbers = true
            "#,
        )
        .unwrap();

        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.theme.joined(), "github-dark,github-light");
        assert_eq!(config.bust.to_string(), "v2");
        assert_eq!(config.request_chunk_size, 2);
        assert_eq!(config.cache_ttl(), None);
        assert_eq!(config.tab_width.spaces(), None);
        assert!(config.is_production());
        assert_eq!(config.options["lineNumbers"], serde_json::Value::Bool(true));
        // Unspecified keys keep their defaults
        assert_eq!(config.host, DEFAULT_HOST);
    }

    #[test]
    fn test_zero_chunk_size_is_rejected() {
        let err = Config::from_toml("request_chunk_size = 0").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_lookup_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("token", "from lookup"),
            ("bust", "3"),
            ("tab_width", "2"),
            ("cache", "none"),
            ("host", "http://localhost:8080/"),
            ("options", r#"{"lineNumbers": false}"#),
        ]))
        .unwrap();

        assert_eq!(config.token.as_deref(), Some("from lookup"));
        assert_eq!(config.bust, Bust::Number(3));
        assert_eq!(config.tab_width.spaces(), Some(2));
        assert_eq!(config.cache, CacheDriver::None);
        assert_eq!(config.host, "http://localhost:8080");
        assert_eq!(config.options["lineNumbers"], serde_json::Value::Bool(false));
    }

    #[test]
    fn test_lookup_rejects_bad_numbers() {
        let err = Config::from_lookup(lookup_from(&[("request_timeout", "soon")])).unwrap_err();
        assert!(err.to_string().contains("request_timeout"));
    }

    #[test]
    fn test_empty_token_is_treated_as_missing() {
        let config = Config::from_lookup(lookup_from(&[("token", "")])).unwrap();
        assert!(config.token.is_none());
    }

    #[test]
    fn test_toml_roundtrip_keeps_permanent_cache() {
        let config = Config {
            cache_seconds: None,
            ..Config::default()
        };
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("cache_seconds = \"forever\""));
        assert_eq!(Config::from_toml(&toml).unwrap().cache_seconds, None);
    }

    #[test]
    fn test_explicit_cache_dir() {
        let config = Config {
            cache_dir: Some(PathBuf::from("/tmp/tl")),
            ..Config::default()
        };
        assert_eq!(config.resolved_cache_dir().unwrap(), PathBuf::from("/tmp/tl"));
    }

    #[test]
    fn test_layered_keeps_base_for_unset_keys() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("torchlight.toml");
        fs::write(&path, "theme = \"nord\"\nrequest_timeout = 9\n").unwrap();

        let base = Config {
            cache: CacheDriver::File,
            request_timeout: 1,
            ..Config::default()
        };
        let merged = Config::merge_toml(&base, &fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(merged.cache, CacheDriver::File);
        assert_eq!(merged.theme.joined(), "nord");
        assert_eq!(merged.request_timeout, 9);
    }

    #[test]
    fn test_layered_file_overrides_base() {
        let base = Config {
            cache: CacheDriver::File,
            ..Config::default()
        };
        let merged = Config::merge_toml(&base, "cache = \"none\"").unwrap();
        assert_eq!(merged.cache, CacheDriver::None);
    }

    #[test]
    fn test_env_var_names() {
        assert_eq!(env_var_name("token"), "TORCHLIGHT_TOKEN");
        assert_eq!(env_var_name("cache_dir"), "TORCHLIGHT_CACHE_DIR");
        assert_eq!(env_var_name("environment"), "TORCHLIGHT_ENV");
    }
}
