//! Wire types and the HTTP transport for the remote highlighter.
//!
//! One [`HighlightRequest`] carries a chunk of blocks plus the global options:
//!
//! ```json
//! {"blocks": [{"id": "a", "hash": "...", "language": "php", "theme": "nord", "code": "echo 1;"}],
//!  "options": {"lineNumbers": true}}
//! ```
//!
//! The response echoes ids back with whatever output fields were produced.
//! Extra top-level fields such as `duration` or `engine` are ignored.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::block::{Attrs, RequestBlock};
use crate::config::{Config, Options};
use crate::{Error, Result};

/// Body of `POST {host}/highlight`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightRequest {
    /// Blocks in this chunk.
    pub blocks: Vec<RequestBlock>,
    /// Global highlighting options.
    pub options: Options,
}

/// Successful highlighter response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightResponse {
    /// Resolved blocks, matched to requests by id.
    #[serde(default)]
    pub blocks: Vec<ResponseBlock>,
}

/// One resolved block. Absent fields leave the block untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseBlock {
    /// Id of the requested block.
    pub id: String,
    /// Highlighted inner HTML.
    #[serde(default)]
    pub highlighted: Option<String>,
    /// Wrapped HTML.
    #[serde(default)]
    pub wrapped: Option<String>,
    /// Classes for the `<code>` element.
    #[serde(default)]
    pub classes: Option<String>,
    /// Inline styles for the `<code>` element.
    #[serde(default)]
    pub styles: Option<String>,
    /// Extra attributes.
    #[serde(default)]
    pub attrs: Option<Attrs>,
}

/// Sends one chunk to the highlighter.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and return the parsed response.
    ///
    /// Any failure (connection, timeout, non-2xx status, malformed body) is an
    /// [`Error::Request`].
    async fn send(&self, request: HighlightRequest) -> Result<HighlightResponse>;
}

/// Production transport over HTTPS.
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    token: String,
}

impl HttpTransport {
    /// Create a transport for `host` authenticating with `token`.
    pub fn new(host: &str, token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("torchlight-rs/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/highlight", host.trim_end_matches('/')),
            token: token.into(),
        })
    }

    /// Build a transport from configuration. Returns `None` when no token is set.
    pub fn from_config(config: &Config) -> Result<Option<Self>> {
        config
            .token
            .as_deref()
            .filter(|token| !token.is_empty())
            .map(|token| Self::new(&config.host, token, config.request_timeout()))
            .transpose()
    }

    /// Full URL requests are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HighlightRequest) -> Result<HighlightResponse> {
        let count = request.blocks.len();
        debug!("Posting {count} blocks to {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Request(describe_failure(status, &body)));
        }

        let body = response.text().await?;
        let parsed = parse_response(&body)?;
        info!("Highlighted {}/{count} blocks", parsed.blocks.len());
        Ok(parsed)
    }
}

fn describe_failure(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect());

    if detail.trim().is_empty() {
        format!("Highlighter returned {status}")
    } else {
        format!("Highlighter returned {status}: {detail}")
    }
}

/// Parse a 2xx body.
///
/// An empty or `null` body is an empty response; the affected blocks fall back
/// to default renderings. A body carrying an `error` field, or one that is not
/// a response object, is a failure.
pub fn parse_response(body: &str) -> Result<HighlightResponse> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(HighlightResponse::default());
    }

    let value: serde_json::Value = serde_json::from_str(trimmed)
        .map_err(|e| Error::Request(format!("Malformed highlighter response: {e}")))?;

    if value.is_null() {
        return Ok(HighlightResponse::default());
    }
    if let Some(error) = value.get("error") {
        let message = error
            .as_str()
            .map_or_else(|| error.to_string(), str::to_string);
        return Err(Error::Request(format!("Highlighter error: {message}")));
    }

    serde_json::from_value(value)
        .map_err(|e| Error::Request(format!("Malformed highlighter response: {e}")))
}
