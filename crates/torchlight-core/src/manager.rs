//! Orchestrates a document render.
//!
//! A host creates blocks through [`Manager::block`], registers them in a
//! caller-owned [`RenderContext`] while it writes placeholders into its output,
//! then calls [`Manager::render`] once the document is complete:
//!
//! ```rust,no_run
//! use torchlight_core::{Config, Manager, RenderContext};
//!
//! # async fn run() -> torchlight_core::Result<()> {
//! let manager = Manager::new(Config::load()?)?;
//! let mut context = RenderContext::new();
//!
//! let block = manager.block().with_language("rust").with_code("fn main() {}");
//! let html = format!("<pre><code>{}</code></pre>", block.placeholder(None));
//! context.register(block);
//!
//! let rendered = manager.render(&mut context, &html).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::block::IdGenerator;
use crate::cache::{CacheStore, store_for};
use crate::post_processor::{PostProcessor, run_pipeline};
use crate::substitution::{Substitution, find_ids};
use crate::{Block, Bust, Client, Config, Result};

/// Blocks registered while one document is being produced.
///
/// Owned by the caller and emptied by every [`Manager::render`].
#[derive(Debug, Default)]
pub struct RenderContext {
    blocks: Vec<Block>,
}

impl RenderContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a block whose placeholder appears in the document.
    pub fn register(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Registered blocks.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Number of registered blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether no block is registered.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Take every registered block, leaving the context empty.
    pub fn drain(&mut self) -> Vec<Block> {
        std::mem::take(&mut self.blocks)
    }
}

/// Ties configuration, the client and the post-processor pipeline together.
pub struct Manager {
    config: Config,
    client: Client,
    post_processors: Vec<Arc<dyn PostProcessor>>,
    compiling: AtomicBool,
    id_generator: IdGenerator,
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("client", &self.client)
            .field("post_processors", &self.post_processors.len())
            .field("compiling", &self.is_compiling())
            .finish_non_exhaustive()
    }
}

impl Manager {
    /// Create a manager with the cache store selected by `config.cache`.
    pub fn new(config: Config) -> Result<Self> {
        let cache = store_for(&config)?;
        Self::with_cache(config, cache)
    }

    /// Create a manager backed by an explicit cache store.
    pub fn with_cache(config: Config, cache: Arc<dyn CacheStore>) -> Result<Self> {
        let client = Client::from_config(&config, cache)?;
        Ok(Self::with_client(config, client))
    }

    /// Create a manager around a preconfigured client.
    pub fn with_client(config: Config, client: Client) -> Self {
        Self {
            config,
            client,
            post_processors: Vec::new(),
            compiling: AtomicBool::new(false),
            id_generator: Arc::new(|| uuid::Uuid::new_v4().to_string()),
        }
    }

    /// Effective configuration.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The underlying client.
    pub const fn client(&self) -> &Client {
        &self.client
    }

    /// Replace the generator used for block ids.
    pub fn set_id_generator(&mut self, generator: IdGenerator) {
        self.id_generator = generator;
    }

    /// A new block with a generated id and the configured defaults.
    pub fn block(&self) -> Block {
        self.configure(Block::generated(&self.id_generator))
    }

    /// A new block with a fixed id and the configured defaults.
    pub fn block_with_id(&self, id: impl Into<String>) -> Block {
        self.configure(Block::with_id(id))
    }

    fn configure(&self, block: Block) -> Block {
        block
            .with_theme(self.config.theme.joined())
            .with_bust(self.config.bust.clone())
            .with_options(self.config.options.clone())
            .with_tab_width(self.config.tab_width.spaces())
    }

    // The hash is taken from the block itself, so everything the config
    // contributes has to land on the block before it is resolved.
    fn fill_defaults(&self, block: &mut Block) {
        if block.theme.trim().is_empty() {
            block.theme = self.config.theme.joined();
        }
        if block.bust.is_empty() || block.bust == Bust::Number(0).to_string() {
            block.bust = self.config.bust.to_string();
        }
        if !self.config.options.is_empty() {
            let mut options = self.config.options.clone();
            options.append(&mut block.options);
            block.options = options;
        }
    }

    /// Register a global post-processor. Global processors run before inline ones.
    pub fn add_post_processor(&mut self, processor: impl PostProcessor + 'static) {
        self.post_processors.push(Arc::new(processor));
    }

    /// Mark whether the host is pre-compiling templates.
    pub fn set_compiling(&self, compiling: bool) {
        self.compiling.store(compiling, Ordering::Relaxed);
    }

    /// Whether the host is pre-compiling templates.
    pub fn is_compiling(&self) -> bool {
        self.compiling.load(Ordering::Relaxed)
    }

    /// Expand, resolve and post-process `blocks`.
    ///
    /// Blocks without a theme or bust get the configured ones, and the
    /// configured options sit underneath each block's own. Clones come back
    /// attached to their parents.
    #[tracing::instrument(skip_all, fields(blocks = blocks.len()))]
    pub async fn highlight(&self, blocks: Vec<Block>) -> Result<Vec<Block>> {
        let mut flat = Vec::with_capacity(blocks.len());
        let mut clone_counts = Vec::with_capacity(blocks.len());

        for mut block in blocks {
            self.fill_defaults(&mut block);
            block.expand_clones();
            let clones = std::mem::take(&mut block.clones);
            clone_counts.push(clones.len());
            flat.push(block);
            flat.extend(clones);
        }

        self.client.highlight(&mut flat).await?;

        let compiling = self.is_compiling();
        for block in &mut flat {
            run_pipeline(block, &self.post_processors, compiling);
        }

        let mut flat = flat.into_iter();
        let mut grouped = Vec::with_capacity(clone_counts.len());
        for count in clone_counts {
            let Some(mut parent) = flat.next() else {
                break;
            };
            parent.clones = flat.by_ref().take(count).collect();
            grouped.push(parent);
        }
        Ok(grouped)
    }

    /// Resolve the blocks in `context` and substitute them into `content`.
    ///
    /// Only blocks whose placeholders appear in `content` are resolved. The
    /// context is emptied either way.
    pub async fn render(&self, context: &mut RenderContext, content: &str) -> Result<String> {
        let ids = find_ids(content);
        let (referenced, unused): (Vec<Block>, Vec<Block>) = context
            .drain()
            .into_iter()
            .partition(|block| ids.iter().any(|id| id == block.id()));

        if !unused.is_empty() {
            debug!("Skipping {} blocks not referenced in content", unused.len());
        }
        if referenced.is_empty() {
            return Ok(content.to_string());
        }

        let resolved = self.highlight(referenced).await?;
        Ok(Substitution::new(&resolved).render(content))
    }

    /// Distinct block ids referenced in `content`.
    pub fn find_ids(&self, content: &str) -> Vec<String> {
        find_ids(content)
    }
}
