//! Stitches resolved blocks back into rendered content.
//!
//! Hosts leave placeholder tokens where highlighted output belongs:
//!
//! | Token | Replaced with |
//! |---|---|
//! | `__torchlight-block-[id]__` | `highlighted` |
//! | `__torchlight-block-[id]_classes__` | `classes` |
//! | `__torchlight-block-[id]_styles__` | `styles` |
//! | `__torchlight-block-[id]_attrs__` | rendered `attrs` |
//!
//! A region wrapped in `<!-- __torchlight-block-[id]_begin__ -->` and
//! `<!-- __torchlight-block-[id]_end__ -->` is repeated once per clone of the
//! block, with the clone's id swapped in, so each extra theme gets its own copy
//! of the markup. The markers themselves are removed.
//!
//! Tokens for ids with no known block are left untouched.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::Block;
use crate::block::PLACEHOLDER_PREFIX;

#[allow(clippy::expect_used)]
static ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"__torchlight-block-\[(.+?)\]").expect("id regex is valid")
});

#[allow(clippy::expect_used)]
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"__torchlight-block-\[([^\]]+)\](?:_(classes|styles|attrs))?__")
        .expect("token regex is valid")
});

/// Distinct block ids referenced in `content`, in order of first appearance.
///
/// ```rust
/// let ids = torchlight_core::find_ids("__torchlight-block-[a]__ __torchlight-block-[b]_styles__ __torchlight-block-[a]__");
/// assert_eq!(ids, ["a", "b"]);
/// ```
pub fn find_ids(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    ID_RE
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}

/// Replaces placeholders with the output of a set of resolved blocks.
#[derive(Debug)]
pub struct Substitution<'a> {
    blocks: HashMap<&'a str, &'a Block>,
}

impl<'a> Substitution<'a> {
    /// Index `blocks` and their clones by id.
    pub fn new(blocks: &'a [Block]) -> Self {
        let mut index = HashMap::new();
        for block in blocks {
            index.insert(block.id(), block);
            for clone in &block.clones {
                index.insert(clone.id(), clone);
            }
        }
        Self { blocks: index }
    }

    /// Expand clone regions, then substitute every known placeholder.
    pub fn render(&self, content: &str) -> String {
        let mut content = content.to_string();

        for id in find_ids(&content) {
            if let Some(block) = self.blocks.get(id.as_str()) {
                content = expand_region(&content, block);
            }
        }

        TOKEN_RE
            .replace_all(&content, |caps: &Captures<'_>| self.replacement(caps))
            .into_owned()
    }

    fn replacement(&self, caps: &Captures<'_>) -> String {
        let Some(block) = self.blocks.get(&caps[1]) else {
            return caps[0].to_string();
        };
        match caps.get(2).map(|m| m.as_str()) {
            None => block.highlighted.clone(),
            Some("classes") => block.classes.clone(),
            Some("styles") => block.styles.clone(),
            Some(_) => block.attrs_string(),
        }
    }
}

/// Replace each begin/end region of `block` with itself plus one copy per clone.
fn expand_region(content: &str, block: &Block) -> String {
    let begin = format!("<!-- {} -->", block.placeholder(Some("begin")));
    let end = format!("<!-- {} -->", block.placeholder(Some("end")));
    let tag = format!("{PLACEHOLDER_PREFIX}[{}]", block.id());

    let mut out = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find(&begin) {
        let inner = &rest[start + begin.len()..];
        let Some(stop) = inner.find(&end) else {
            break;
        };
        let region = &inner[..stop];

        out.push_str(&rest[..start]);
        out.push_str(region);
        for clone in &block.clones {
            let clone_tag = format!("{PLACEHOLDER_PREFIX}[{}]", clone.id());
            out.push_str(&region.replace(&tag, &clone_tag));
        }
        rest = &inner[stop + end.len()..];
    }

    out.push_str(rest);
    out
}
