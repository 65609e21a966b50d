//! Markdown host: turns fenced code blocks into placeholders.
//!
//! Every fenced block (backticks or tildes, three or more) becomes a
//! `<pre><code>` template whose pieces are placeholders, wrapped in the
//! begin/end markers so multi-theme blocks repeat once per theme. Everything
//! outside fences is passed through untouched.

use std::sync::LazyLock;

use regex::Regex;
use torchlight_core::{Block, Manager};

#[allow(clippy::expect_used)]
static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^( {0,3})(`{3,}|~{3,})[ \t]*([^\s`{]*)").expect("fence regex is valid")
});

/// Language used when a fence has no info string.
const PLAIN_LANGUAGE: &str = "text";

/// A document with its fenced blocks swapped for placeholders.
#[derive(Debug)]
pub struct Extracted {
    /// The document with placeholder templates in place of fenced blocks.
    pub document: String,
    /// One block per fence, in document order.
    pub blocks: Vec<Block>,
}

#[derive(Debug)]
struct Fence {
    indent: usize,
    marker: char,
    len: usize,
    language: String,
}

impl Fence {
    fn open(line: &str) -> Option<Self> {
        let caps = FENCE_RE.captures(line.trim_end_matches(['\n', '\r']))?;
        let fence = &caps[2];
        let marker = fence.chars().next()?;
        // A backtick fence's info string may not contain backticks
        if marker == '`' && line[caps[0].len()..].contains('`') {
            return None;
        }
        Some(Self {
            indent: caps[1].len(),
            marker,
            len: fence.len(),
            language: caps[3].to_string(),
        })
    }

    fn closes(&self, line: &str) -> bool {
        let line = line.trim_end();
        let trimmed = line.trim_start_matches(' ');
        line.len() - trimmed.len() <= 3
            && trimmed.len() >= self.len
            && trimmed.chars().all(|c| c == self.marker)
    }

    fn strip_indent<'a>(&self, line: &'a str) -> &'a str {
        let spaces = line
            .bytes()
            .take(self.indent)
            .take_while(|&b| b == b' ')
            .count();
        &line[spaces..]
    }
}

/// Replace every fenced block in `source` with a placeholder template.
///
/// Blocks get the manager's defaults; `theme` overrides the configured theme.
pub fn extract(manager: &Manager, source: &str, theme: Option<&str>) -> Extracted {
    let mut document = String::with_capacity(source.len());
    let mut blocks = Vec::new();
    let mut lines = source.split_inclusive('\n');

    while let Some(line) = lines.next() {
        let Some(fence) = Fence::open(line) else {
            document.push_str(line);
            continue;
        };

        // An unclosed fence runs to the end of the document
        let mut code = String::new();
        for inner in lines.by_ref() {
            if fence.closes(inner) {
                break;
            }
            code.push_str(fence.strip_indent(inner));
        }

        let language = if fence.language.is_empty() {
            PLAIN_LANGUAGE
        } else {
            fence.language.as_str()
        };
        let mut block = manager.block().with_language(language);
        if let Some(theme) = theme {
            block = block.with_theme(theme);
        }
        let block = block.with_code(&code);

        document.push_str(&template(&block));
        document.push('\n');
        blocks.push(block);
    }

    Extracted { document, blocks }
}

/// Placeholder markup for one block.
pub fn template(block: &Block) -> String {
    format!(
        "<!-- {} --><pre><code {}class=\"{}\" style=\"{}\">{}</code></pre><!-- {} -->",
        block.placeholder(Some("begin")),
        block.placeholder(Some("attrs")),
        block.placeholder(Some("classes")),
        block.placeholder(Some("styles")),
        block.placeholder(None),
        block.placeholder(Some("end")),
    )
}
