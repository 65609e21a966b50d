//! Post-processors mutate a block's highlighted output after resolution.
//!
//! Global processors (registered on the [`Manager`](crate::Manager)) run first,
//! then the block's inline processors, each tier in registration order. Every
//! processor sees the cumulative result of the ones before it.
//!
//! While the host is pre-compiling templates, processors are skipped unless they
//! opt in through [`PostProcessor::process_even_when_compiling`]; compiled output is
//! cached and must not capture per-request data.
//!
//! ```rust
//! use std::sync::Arc;
//! use torchlight_core::{Block, PostProcessor, SimpleSwapProcessor, post_processor::run_pipeline};
//!
//! let mut block = Block::with_id("a");
//! block.highlighted = "echo \"hello world\";".into();
//!
//! let global: Vec<Arc<dyn PostProcessor>> =
//!     vec![Arc::new(SimpleSwapProcessor::new([("hello", "goodbye")]))];
//! run_pipeline(&mut block, &global, false);
//! assert_eq!(block.highlighted, "echo \"goodbye world\";");
//! ```

use std::sync::Arc;

use crate::Block;

/// A mutator applied to resolved blocks.
pub trait PostProcessor: Send + Sync {
    /// Mutate the block, typically its `highlighted` field.
    fn process(&self, block: &mut Block);

    /// Whether to run while the host is pre-compiling templates.
    fn process_even_when_compiling(&self) -> bool {
        false
    }
}

/// Run global then inline processors over `block`.
pub fn run_pipeline(block: &mut Block, global: &[Arc<dyn PostProcessor>], compiling: bool) {
    let inline = block.post_processors.clone();

    for processor in global.iter().chain(inline.iter()) {
        if compiling && !processor.process_even_when_compiling() {
            continue;
        }
        processor.process(block);
    }
}

/// Literal search-and-replace over `highlighted`, applied pair by pair.
#[derive(Debug, Clone, Default)]
pub struct SimpleSwapProcessor {
    swaps: Vec<(String, String)>,
}

impl SimpleSwapProcessor {
    /// Build from `(search, replace)` pairs.
    pub fn new<I, S, R>(swaps: I) -> Self
    where
        I: IntoIterator<Item = (S, R)>,
        S: Into<String>,
        R: Into<String>,
    {
        Self {
            swaps: swaps
                .into_iter()
                .map(|(s, r)| (s.into(), r.into()))
                .collect(),
        }
    }
}

impl PostProcessor for SimpleSwapProcessor {
    fn process(&self, block: &mut Block) {
        for (search, replace) in &self.swaps {
            if search.is_empty() {
                continue;
            }
            block.highlighted = block.highlighted.replace(search.as_str(), replace);
        }
    }
}

/// Adapts a closure into a [`PostProcessor`].
pub struct FnProcessor<F> {
    func: F,
    even_when_compiling: bool,
}

impl<F> FnProcessor<F>
where
    F: Fn(&mut Block) + Send + Sync,
{
    /// Wrap `func`. It is skipped while compiling.
    pub const fn new(func: F) -> Self {
        Self {
            func,
            even_when_compiling: false,
        }
    }

    /// Run this processor even while the host is pre-compiling.
    #[must_use]
    pub const fn always(mut self) -> Self {
        self.even_when_compiling = true;
        self
    }
}

impl<F> PostProcessor for FnProcessor<F>
where
    F: Fn(&mut Block) + Send + Sync,
{
    fn process(&self, block: &mut Block) {
        (self.func)(block);
    }

    fn process_even_when_compiling(&self) -> bool {
        self.even_when_compiling
    }
}
