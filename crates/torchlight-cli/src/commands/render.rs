//! Render a Markdown document

use std::path::Path;

use anyhow::Result;
use torchlight_core::{Config, Manager, RenderContext};
use tracing::debug;

use crate::markdown;
use crate::utils::io::{read_input, write_output};

/// Highlight every fenced block in `input` and write the resulting document.
pub async fn execute(
    config: Config,
    input: &Path,
    output: Option<&Path>,
    theme: Option<&str>,
) -> Result<()> {
    let source = read_input(input)?;
    let manager = Manager::new(config)?;

    let extracted = markdown::extract(&manager, &source, theme);
    debug!("Found {} fenced blocks", extracted.blocks.len());

    let mut context = RenderContext::new();
    for block in extracted.blocks {
        context.register(block);
    }

    let rendered = manager.render(&mut context, &extracted.document).await?;
    write_output(output, &rendered)
}
