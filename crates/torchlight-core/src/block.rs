//! The unit of work: one code sample, its highlighting parameters and its output.
//!
//! A [`Block`] is built by a host (a template engine, a Markdown renderer, the CLI),
//! resolved by the [`Client`](crate::Client) and finally stitched back into the
//! document by the [`Substitution`](crate::Substitution) engine.
//!
//! ```rust
//! use torchlight_core::Block;
//!
//! let block = Block::with_id("intro")
//!     .with_language("php")
//!     .with_theme("material")
//!     .with_code("    echo 1;\n    echo 2;\n");
//!
//! assert_eq!(block.code, "echo 1;\necho 2;");
//! assert_eq!(block.placeholder(None), "__torchlight-block-[intro]__");
//! assert!(!block.is_resolved());
//! ```

use std::collections::BTreeMap;
use std::fmt::{self, Write};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::{Bust, Options};
use crate::post_processor::PostProcessor;

/// Prefix shared by every placeholder token.
pub const PLACEHOLDER_PREFIX: &str = "__torchlight-block-";

/// Attributes returned by the highlighter for the `<code>` element.
pub type Attrs = BTreeMap<String, String>;

/// Generates ids for blocks created without one.
pub type IdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// One code sample to be highlighted.
#[derive(Clone)]
pub struct Block {
    id: String,
    /// Source language name passed to the highlighter.
    pub language: String,
    /// Theme name, or a comma-joined list of `label:theme` entries.
    pub theme: String,
    /// Cleaned source text.
    pub code: String,
    /// Global highlighting options.
    pub options: Options,
    /// Cache-busting token mixed into the hash.
    pub bust: String,
    /// Spaces per tab used by [`Block::set_code`]; `None` keeps tabs.
    pub tab_width: Option<usize>,
    /// Highlighted inner HTML.
    pub highlighted: String,
    /// Highlighted HTML wrapped in its container.
    pub wrapped: String,
    /// Classes for the `<code>` element.
    pub classes: String,
    /// Inline styles for the `<code>` element.
    pub styles: String,
    /// Extra attributes for the `<code>` element.
    pub attrs: Attrs,
    /// Per-block post-processors, run after the global ones.
    pub post_processors: Vec<Arc<dyn PostProcessor>>,
    /// Sibling blocks rendering the same code in the extra themes.
    pub clones: Vec<Block>,
}

impl Block {
    /// Create a block with a random UUID id.
    pub fn new() -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string())
    }

    /// Create a block with a caller-supplied id.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            language: String::new(),
            theme: String::new(),
            code: String::new(),
            options: Options::new(),
            bust: Bust::Number(0).to_string(),
            tab_width: Some(4),
            highlighted: String::new(),
            wrapped: String::new(),
            classes: String::new(),
            styles: String::new(),
            attrs: Attrs::new(),
            post_processors: Vec::new(),
            clones: Vec::new(),
        }
    }

    /// Create a block whose id comes from `generator`.
    pub fn generated(generator: &IdGenerator) -> Self {
        Self::with_id(generator())
    }

    /// The block id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Set the language.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set the theme (or comma-joined theme list).
    #[must_use]
    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = theme.into();
        self
    }

    /// Set the tab width used when cleaning code. Call before [`Block::with_code`].
    #[must_use]
    pub const fn with_tab_width(mut self, tab_width: Option<usize>) -> Self {
        self.tab_width = tab_width;
        self
    }

    /// Clean and set the code.
    #[must_use]
    pub fn with_code(mut self, raw: &str) -> Self {
        self.set_code(raw);
        self
    }

    /// Set the global options.
    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Set the cache-busting token.
    #[must_use]
    pub fn with_bust(mut self, bust: impl Into<Bust>) -> Self {
        self.bust = bust.into().to_string();
        self
    }

    /// Attach an inline post-processor.
    #[must_use]
    pub fn with_post_processor(mut self, processor: impl PostProcessor + 'static) -> Self {
        self.post_processors.push(Arc::new(processor));
        self
    }

    /// Clean `raw` and store it as the block's code.
    pub fn set_code(&mut self, raw: &str) {
        self.code = clean(raw, self.tab_width);
    }

    /// Whether the block already has its final wrapped HTML.
    pub fn is_resolved(&self) -> bool {
        !self.wrapped.is_empty()
    }

    /// Content fingerprint over language, theme, code, bust and options.
    ///
    /// Used as the cache key, so it must only change when the highlighter
    /// output could change.
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        for part in [&self.language, &self.theme, &self.code, &self.bust] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        // BTreeMap keeps option keys sorted, so the encoding is stable.
        let options = serde_json::to_string(&self.options).unwrap_or_default();
        hasher.update(options.as_bytes());

        hasher.finalize().iter().fold(String::with_capacity(64), |mut acc, b| {
            // write! to String is infallible
            let _ = write!(acc, "{b:02x}");
            acc
        })
    }

    /// The placeholder token for this block, optionally for one extra field.
    ///
    /// `extra` is one of `classes`, `styles`, `attrs`, `begin` or `end`.
    pub fn placeholder(&self, extra: Option<&str>) -> String {
        placeholder_for(&self.id, extra)
    }

    /// The fields sent to the highlighter for this block.
    pub fn to_request_params(&self) -> RequestBlock {
        RequestBlock {
            id: self.id.clone(),
            hash: self.hash(),
            language: self.language.clone(),
            theme: self.theme.clone(),
            code: self.code.clone(),
        }
    }

    /// Render [`Block::attrs`] as `key="value" ` pairs, each followed by a space.
    pub fn attrs_string(&self) -> String {
        self.attrs.iter().fold(String::new(), |mut acc, (key, value)| {
            let _ = write!(
                acc,
                "{key}=\"{}\" ",
                html_escape::encode_double_quoted_attribute(value)
            );
            acc
        })
    }

    /// Themes listed in [`Block::theme`], split on commas.
    pub fn themes(&self) -> Vec<&str> {
        self.theme
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect()
    }

    /// Split a multi-theme block into itself plus one clone per extra theme.
    ///
    /// The block keeps the first theme. Clone ids are `<id>_clone_<n>` with `n`
    /// counting from zero over the remaining themes. Calling this on a block
    /// with a single theme, or on a block that was already expanded, does nothing.
    pub fn expand_clones(&mut self) {
        let themes: Vec<String> = self.themes().into_iter().map(str::to_string).collect();
        if themes.len() < 2 {
            return;
        }

        let mut themes = themes.into_iter();
        if let Some(first) = themes.next() {
            self.theme = first;
        }

        self.clones = themes
            .enumerate()
            .map(|(index, theme)| {
                let mut clone = self.clone();
                clone.id = format!("{}_clone_{index}", self.id);
                clone.theme = theme;
                clone.clones = Vec::new();
                clone
            })
            .collect();
    }

    /// Ids of this block's clones, in theme order.
    pub fn clone_ids(&self) -> impl Iterator<Item = &str> {
        self.clones.iter().map(Self::id)
    }

    pub(crate) fn apply_cached(&mut self, cached: CachedBlock) {
        if let Some(highlighted) = cached.highlighted {
            self.highlighted = highlighted;
        }
        if let Some(wrapped) = cached.wrapped {
            self.wrapped = wrapped;
        }
        if let Some(classes) = cached.classes {
            self.classes = classes;
        }
        if let Some(styles) = cached.styles {
            self.styles = styles;
        }
        if let Some(attrs) = cached.attrs {
            self.attrs = attrs;
        }
    }

    pub(crate) fn to_cached(&self) -> CachedBlock {
        let non_empty = |s: &String| Some(s.clone()).filter(|s| !s.is_empty());
        CachedBlock {
            wrapped: non_empty(&self.wrapped),
            highlighted: non_empty(&self.highlighted),
            styles: non_empty(&self.styles),
            classes: non_empty(&self.classes),
            attrs: Some(self.attrs.clone()).filter(|a| !a.is_empty()),
        }
    }

    /// Fill whatever the highlighter did not produce with a plain rendering.
    pub(crate) fn apply_default_rendering(&mut self) {
        let escaped = html_escape::encode_double_quoted_attribute(&self.code).into_owned();

        if self.wrapped.is_empty() {
            self.wrapped = format!(
                "<pre><code data-lang='{}' data-theme='{}' class='torchlight'>{escaped}</code></pre>",
                html_escape::encode_single_quoted_attribute(&self.language),
                html_escape::encode_single_quoted_attribute(&self.theme),
            );
        }
        if self.highlighted.is_empty() {
            self.highlighted = escaped;
        }
        if self.classes.is_empty() {
            self.classes = "torchlight".to_string();
        }
        if self.attrs.is_empty() {
            self.attrs
                .insert("data-lang".to_string(), self.language.clone());
            self.attrs.insert("data-theme".to_string(), self.theme.clone());
        }
    }
}

impl Default for Block {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("id", &self.id)
            .field("language", &self.language)
            .field("theme", &self.theme)
            .field("code", &self.code)
            .field("bust", &self.bust)
            .field("resolved", &self.is_resolved())
            .field("post_processors", &self.post_processors.len())
            .field("clones", &self.clones)
            .finish_non_exhaustive()
    }
}

/// Build a placeholder token for an arbitrary id.
pub fn placeholder_for(id: &str, extra: Option<&str>) -> String {
    match extra {
        Some(extra) => format!("{PLACEHOLDER_PREFIX}[{id}]_{extra}__"),
        None => format!("{PLACEHOLDER_PREFIX}[{id}]__"),
    }
}

/// One block as sent to the highlighter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestBlock {
    /// Block id, echoed back in the response.
    pub id: String,
    /// Content hash.
    pub hash: String,
    /// Source language.
    pub language: String,
    /// Theme (single entry, after clone expansion).
    pub theme: String,
    /// Cleaned code.
    pub code: String,
}

/// Output fields persisted in the cache. Only fields that were produced are stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedBlock {
    /// Wrapped HTML.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrapped: Option<String>,
    /// Highlighted inner HTML.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlighted: Option<String>,
    /// Inline styles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styles: Option<String>,
    /// Classes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<String>,
    /// Attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Attrs>,
}

impl CachedBlock {
    /// Whether nothing worth caching was produced.
    pub const fn is_empty(&self) -> bool {
        self.wrapped.is_none() && self.highlighted.is_none()
    }
}

/// Normalize raw code: trim the end, expand tabs, then [`dedent`].
pub fn clean(raw: &str, tab_width: Option<usize>) -> String {
    let code = raw.strip_suffix('\n').unwrap_or(raw).trim_end();
    match tab_width {
        Some(width) => dedent(&code.replace('\t', &" ".repeat(width))),
        None => dedent(code),
    }
}

/// Remove the indentation common to every non-blank line and right-trim each line.
///
/// Blank lines do not take part in the minimum. Applying `dedent` to its own
/// output returns it unchanged.
pub fn dedent(code: &str) -> String {
    let indent = code
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start_matches(' ').len())
        .min()
        .unwrap_or(0);

    let prefix = " ".repeat(indent);
    code.split('\n')
        .map(|line| {
            let line = line.trim_end();
            line.strip_prefix(prefix.as_str()).unwrap_or(line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
