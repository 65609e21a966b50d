//! Resolves blocks against the cache and the remote highlighter.
//!
//! ## Resolution
//!
//! 1. Probe the cache for every unresolved block and copy recovered fields.
//! 2. Blocks that still lack wrapped HTML are split into chunks and sent
//!    concurrently, one request per chunk.
//! 3. Responses are merged by id. A failed chunk is recorded and the others
//!    carry on.
//! 4. Blocks returned by the highlighter are cached.
//! 5. Anything still missing output gets a plain escaped rendering.
//! 6. The first chunk failure is returned, unless running in production.
//!
//! No request is made when every block is already resolved.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::block::CachedBlock;
use crate::cache::{CacheStore, cache_key};
use crate::config::{Config, DEFAULT_CACHE_SECONDS, Options};
use crate::transport::{HighlightRequest, HttpTransport, ResponseBlock, Transport};
use crate::{Block, Error, Result};

/// Resolution settings, usually derived from [`Config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Maximum blocks per request.
    pub chunk_size: usize,
    /// Cache entry lifetime; `None` caches permanently.
    pub cache_ttl: Option<Duration>,
    /// Swallow request failures and fall back to plain renderings.
    pub production: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            chunk_size: 15,
            cache_ttl: Some(Duration::from_secs(DEFAULT_CACHE_SECONDS)),
            production: false,
        }
    }
}

impl ClientSettings {
    /// Settings matching `config`.
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk_size: config.request_chunk_size.max(1),
            cache_ttl: config.cache_ttl(),
            production: config.is_production(),
        }
    }
}

/// Highlight client.
pub struct Client {
    transport: Option<Arc<dyn Transport>>,
    cache: Arc<dyn CacheStore>,
    settings: ClientSettings,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("has_transport", &self.transport.is_some())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client. A `None` transport means no token is configured.
    pub fn new(
        transport: Option<Arc<dyn Transport>>,
        cache: Arc<dyn CacheStore>,
        settings: ClientSettings,
    ) -> Self {
        Self {
            transport,
            cache,
            settings,
        }
    }

    /// Create a client using [`HttpTransport`] when `config` carries a token.
    pub fn from_config(config: &Config, cache: Arc<dyn CacheStore>) -> Result<Self> {
        let transport = HttpTransport::from_config(config)?
            .map(|transport| Arc::new(transport) as Arc<dyn Transport>);
        Ok(Self::new(transport, cache, ClientSettings::from_config(config)))
    }

    /// The cache store backing this client.
    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    /// Resolution settings.
    pub const fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Resolve `blocks` in place.
    ///
    /// Blocks must already be clone-expanded. On a request failure the blocks
    /// still carry their fallback renderings when the error is returned.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidBlock`] for empty, malformed or duplicate ids
    /// - [`Error::Configuration`] when blocks need a request but no token is set,
    ///   outside production
    /// - [`Error::Request`] for the first failed chunk, outside production
    #[tracing::instrument(skip_all, fields(blocks = blocks.len()))]
    pub async fn highlight(&self, blocks: &mut [Block]) -> Result<()> {
        validate_ids(blocks)?;

        let needed = self.probe_cache(blocks);
        if needed.is_empty() {
            debug!("All blocks resolved without a request");
            return Ok(());
        }

        let Some(transport) = &self.transport else {
            if self.settings.production {
                warn!("No Torchlight token configured; rendering {} blocks as plain text", needed.len());
                apply_defaults(blocks);
                return Ok(());
            }
            return Err(Error::Configuration("No Torchlight token configured.".into()));
        };

        let chunk_size = self.settings.chunk_size.max(1);
        let view: &[Block] = blocks;
        let requests: Vec<HighlightRequest> = group_by_options(view, &needed)
            .into_iter()
            .flat_map(|(options, members)| {
                members
                    .chunks(chunk_size)
                    .map(|chunk| HighlightRequest {
                        blocks: chunk.iter().map(|&i| view[i].to_request_params()).collect(),
                        options: options.clone(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        info!(
            "Requesting {} blocks in {} chunks",
            needed.len(),
            requests.len()
        );
        let results = join_all(requests.into_iter().map(|request| transport.send(request))).await;

        let by_id: HashMap<String, usize> = needed
            .iter()
            .map(|&i| (blocks[i].id().to_string(), i))
            .collect();
        let mut returned = Vec::new();
        let mut first_error = None;

        for result in results {
            match result {
                Ok(response) => {
                    for resolved in response.blocks {
                        if let Some(&index) = by_id.get(&resolved.id) {
                            merge(&mut blocks[index], resolved);
                            returned.push(index);
                        } else {
                            debug!(id = %resolved.id, "Ignoring unrequested block in response");
                        }
                    }
                },
                Err(err) => {
                    warn!("Highlight chunk failed: {err}");
                    first_error.get_or_insert(err);
                },
            }
        }

        for &index in &returned {
            self.store(&blocks[index]);
        }
        apply_defaults(blocks);

        match first_error {
            Some(err) if self.settings.production => {
                warn!("Using fallback renderings after request failure: {err}");
                Ok(())
            },
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Copy cached output into unresolved blocks. Returns indices still needing a request.
    fn probe_cache(&self, blocks: &mut [Block]) -> Vec<usize> {
        let mut needed = Vec::new();
        for (index, block) in blocks.iter_mut().enumerate() {
            if block.is_resolved() {
                continue;
            }
            let key = cache_key(block);
            match self.cache.get(&key).map(serde_json::from_value::<CachedBlock>) {
                Some(Ok(cached)) => {
                    debug!(id = block.id(), "Cache hit");
                    block.apply_cached(cached);
                },
                Some(Err(e)) => warn!(key = %key, "Ignoring unreadable cache entry: {e}"),
                None => debug!(id = block.id(), "Cache miss"),
            }
            if !block.is_resolved() {
                needed.push(index);
            }
        }
        needed
    }

    fn store(&self, block: &Block) {
        let cached = block.to_cached();
        if cached.is_empty() {
            return;
        }
        let value = match serde_json::to_value(&cached) {
            Ok(value) => value,
            Err(e) => {
                warn!(id = block.id(), "Failed to encode cache entry: {e}");
                return;
            },
        };

        let key = cache_key(block);
        let written = match self.settings.cache_ttl {
            Some(ttl) => self.cache.put(&key, value, ttl),
            None => self.cache.forever(&key, value),
        };
        if let Err(e) = written {
            warn!(key = %key, "Failed to write cache entry: {e}");
        }
    }
}

fn validate_ids(blocks: &[Block]) -> Result<()> {
    let mut seen = HashSet::with_capacity(blocks.len());
    for block in blocks {
        let id = block.id();
        if id.is_empty() {
            return Err(Error::InvalidBlock("block id must not be empty".into()));
        }
        if id.contains(']') {
            return Err(Error::InvalidBlock(format!(
                "block id '{id}' must not contain ']'"
            )));
        }
        if !seen.insert(id) {
            return Err(Error::InvalidBlock(format!("duplicate block id '{id}'")));
        }
    }
    Ok(())
}

/// Partition `needed` by block options, keeping first-seen order, so every
/// request carries exactly the options its blocks were hashed with.
fn group_by_options<'a>(blocks: &'a [Block], needed: &[usize]) -> Vec<(&'a Options, Vec<usize>)> {
    let mut groups: Vec<(&Options, Vec<usize>)> = Vec::new();
    for &index in needed {
        let options = &blocks[index].options;
        match groups.iter_mut().find(|(seen, _)| *seen == options) {
            Some((_, members)) => members.push(index),
            None => groups.push((options, vec![index])),
        }
    }
    groups
}

fn merge(block: &mut Block, resolved: ResponseBlock) {
    if let Some(highlighted) = resolved.highlighted {
        block.highlighted = highlighted;
    }
    if let Some(wrapped) = resolved.wrapped {
        block.wrapped = wrapped;
    }
    if let Some(classes) = resolved.classes {
        block.classes = classes;
    }
    if let Some(styles) = resolved.styles {
        block.styles = styles;
    }
    if let Some(attrs) = resolved.attrs {
        block.attrs = attrs;
    }
}

fn apply_defaults(blocks: &mut [Block]) {
    for block in blocks {
        if block.wrapped.is_empty() || block.highlighted.is_empty() {
            block.apply_default_rendering();
        }
    }
}
