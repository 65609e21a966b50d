//! Show the effective configuration

use std::io::{self, Write};

use anyhow::Result;
use torchlight_core::Config;

use crate::utils::settings::redacted;

/// Print `config` as TOML (or JSON) with the token redacted.
pub fn show(config: &Config, json: bool) -> Result<()> {
    render(config, json, io::stdout().lock())
}

fn render<W: Write>(config: &Config, json: bool, mut writer: W) -> Result<()> {
    let shown = redacted(config);
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&shown)?)?;
    } else {
        write!(writer, "{}", shown.to_toml()?)?;
    }
    Ok(())
}
