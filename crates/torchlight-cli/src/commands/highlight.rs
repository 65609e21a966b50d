//! Highlight a single file

use std::path::Path;

use anyhow::Result;
use torchlight_core::{Config, Manager};

use crate::utils::io::{read_input, write_output};

/// Highlight `input` and print the wrapped HTML, one `<pre>` per theme.
pub async fn execute(
    config: Config,
    input: &Path,
    language: &str,
    theme: Option<&str>,
) -> Result<()> {
    let code = read_input(input)?;
    let manager = Manager::new(config)?;

    let mut block = manager.block().with_language(language);
    if let Some(theme) = theme {
        block = block.with_theme(theme);
    }
    let block = block.with_code(&code);

    let resolved = manager.highlight(vec![block]).await?;

    let html: Vec<&str> = resolved
        .iter()
        .flat_map(|block| std::iter::once(block).chain(block.clones.iter()))
        .map(|block| block.wrapped.as_str())
        .collect();

    write_output(None, &html.join("\n"))
}
