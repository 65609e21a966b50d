//! Error types and handling for torchlight-core operations.
//!
//! Errors fall into three groups that callers treat differently:
//!
//! - **Setup mistakes**: [`Error::Configuration`] and [`Error::InvalidBlock`]. These are
//!   always returned to the caller, regardless of environment.
//! - **Remote failures**: [`Error::Request`]. Returned outside production; in production
//!   the client logs them and falls back to plain renderings instead.
//! - **Ambient failures**: I/O, serialization and cache errors raised by the
//!   configuration and cache layers.
//!
//! ```rust
//! use torchlight_core::Error;
//!
//! let err = Error::Request("connection timed out".into());
//! assert!(err.is_recoverable());
//! assert_eq!(err.category(), "request");
//! ```

use thiserror::Error;

/// The main error type for torchlight-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Required configuration is missing or invalid.
    ///
    /// Raised when no API token is configured outside production, or when a
    /// configuration value cannot be interpreted.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// One or more highlight requests failed.
    ///
    /// Covers transport errors, timeouts, non-success status codes and
    /// malformed response bodies. When several chunks fail, the first
    /// recorded failure is reported.
    #[error("Request error: {0}")]
    Request(String),

    /// A block handed to the resolution entry point cannot be resolved.
    ///
    /// Blocks must have a non-empty id that does not contain `]`, and ids must
    /// be unique within a batch (clones included).
    #[error("Invalid block: {0}")]
    InvalidBlock(String),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Cache store operation failed.
    #[error("Cache error: {0}")]
    Cache(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Configuration(format!("Failed to parse config: {err}"))
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Request(format!("Request timed out: {err}"))
        } else {
            Self::Request(err.to_string())
        }
    }
}

impl Error {
    /// Whether retrying the operation later might succeed.
    ///
    /// Remote failures are transient by nature. Interrupted or timed-out I/O is
    /// also worth retrying; everything else indicates a setup problem.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            ),
            Self::Configuration(_)
            | Self::InvalidBlock(_)
            | Self::Serialization(_)
            | Self::Cache(_) => false,
        }
    }

    /// Stable category name, useful for structured log fields.
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Request(_) => "request",
            Self::InvalidBlock(_) => "invalid_block",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Cache(_) => "cache",
        }
    }
}

/// Convenience type alias for Results with our Error type.
pub type Result<T> = std::result::Result<T, Error>;
