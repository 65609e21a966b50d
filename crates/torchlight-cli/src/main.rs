//! torchlight CLI - syntax highlighting through the Torchlight API
//!
//! This is the main entry point for the `torchlight` command-line interface.
//! Each command lives in its own module under `commands`.

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod markdown;
mod utils;

use cli::{CacheCommands, Cli, Commands, ConfigCommands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    utils::logging::initialize_logging(&cli)?;

    execute_command(cli).await
}

async fn execute_command(cli: Cli) -> Result<()> {
    let config = utils::settings::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Highlight {
            input,
            language,
            theme,
        } => {
            commands::highlight(config, &input, &language, theme.as_deref()).await?;
        },

        Commands::Render {
            input,
            output,
            theme,
        } => {
            commands::render(config, &input, output.as_deref(), theme.as_deref()).await?;
        },

        Commands::Cache {
            command: CacheCommands::Clear,
        } => {
            commands::clear_cache(&config)?;
        },

        Commands::Config {
            command: ConfigCommands::Show { json },
        } => {
            commands::show_config(&config, json)?;
        },
    }

    Ok(())
}
