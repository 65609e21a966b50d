//! # torchlight-core
//!
//! Client library for the Torchlight remote syntax highlighter.
//!
//! Hosts (template engines, Markdown renderers, static site generators) describe
//! code samples as [`Block`]s, leave placeholder tokens in their output, and hand
//! the blocks to a [`Manager`]. The manager resolves them through a cache and
//! chunked concurrent requests, runs post-processors, and substitutes the
//! highlighted HTML back into the document.
//!
//! ## Architecture
//!
//! - **Blocks**: code normalization, content hashing, placeholders, multi-theme clones
//! - **Client**: cache probing, chunked fan-out, response merging, fallback rendering
//! - **Cache**: pluggable stores (memory, file, none) keyed by block hash
//! - **Post-processors**: ordered mutators over highlighted output
//! - **Substitution**: one-pass placeholder replacement with clone region expansion
//! - **Configuration**: typed settings from TOML, environment or any key lookup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use torchlight_core::{Config, Manager, RenderContext};
//!
//! # async fn run() -> torchlight_core::Result<()> {
//! let manager = Manager::new(Config::load()?)?;
//! let mut context = RenderContext::new();
//!
//! let block = manager.block().with_language("php").with_code("echo 'hi';");
//! let page = format!("<pre><code>{}</code></pre>", block.placeholder(None));
//! context.register(block);
//!
//! println!("{}", manager.render(&mut context, &page).await?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Request failures only surface outside production. In production every block
//! still renders, falling back to escaped plain text:
//!
//! ```rust
//! use torchlight_core::Error;
//!
//! fn report(err: &Error) {
//!     match err {
//!         Error::Configuration(msg) => eprintln!("Fix your setup: {msg}"),
//!         e if e.is_recoverable() => eprintln!("Try again later: {e}"),
//!         e => eprintln!("Fatal: {e}"),
//!     }
//! }
//! ```

/// Code blocks, hashing and placeholders
pub mod block;
/// Cache stores for resolved output
pub mod cache;
/// Cache-aware chunked highlight client
pub mod client;
/// Typed configuration
pub mod config;
/// Error types and result aliases
pub mod error;
/// Render orchestration
pub mod manager;
/// Post-processing pipeline
pub mod post_processor;
/// Placeholder substitution
pub mod substitution;
/// Wire types and HTTP transport
pub mod transport;

// Re-export commonly used types
pub use block::{Block, IdGenerator, PLACEHOLDER_PREFIX};
pub use cache::{CacheStore, FileCache, MemoryCache, NullCache};
pub use client::{Client, ClientSettings};
pub use config::{Bust, CacheDriver, Config, TabWidth, ThemeSetting};
pub use error::{Error, Result};
pub use manager::{Manager, RenderContext};
pub use post_processor::{FnProcessor, PostProcessor, SimpleSwapProcessor};
pub use substitution::{Substitution, find_ids};
pub use transport::{HighlightRequest, HighlightResponse, HttpTransport, Transport};
