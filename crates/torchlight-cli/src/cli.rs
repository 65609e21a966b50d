//! # CLI Structure and Argument Parsing
//!
//! The `torchlight` command wraps the core library for shell use and simple
//! static-site pipelines.
//!
//! ## Usage Patterns
//!
//! ```bash
//! # Highlight a single file
//! torchlight highlight src/main.rs --language rust
//!
//! # Highlight from stdin with an explicit theme
//! echo 'echo "hi";' | torchlight highlight - --language php --theme nord
//!
//! # Render every fenced block in a Markdown document
//! torchlight render README.md --output README.html
//!
//! # Housekeeping
//! torchlight cache clear
//! torchlight config show
//! ```
//!
//! Configuration comes from `torchlight.toml` (see `torchlight config show`),
//! `TORCHLIGHT_*` environment variables and finally the flags below.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Main CLI structure for the `torchlight` command
#[derive(Parser, Clone, Debug)]
#[command(name = "torchlight")]
#[command(version)]
#[command(about = "Torchlight - syntax highlighting through the Torchlight API", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Show debug logs, including cache hits and requests
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Suppress warnings (only show errors)
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to the configuration file. Also via `TORCHLIGHT_CONFIG`.
    #[arg(long, global = true, value_name = "FILE", env = "TORCHLIGHT_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available subcommands for the `torchlight` CLI
#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Highlight one file and print the wrapped HTML
    Highlight {
        /// File to highlight, or `-` for stdin
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Source language
        #[arg(short, long)]
        language: String,

        /// Theme, or comma-separated themes for one block per theme
        #[arg(short, long)]
        theme: Option<String>,
    },

    /// Highlight every fenced code block in a Markdown document
    Render {
        /// Markdown file, or `-` for stdin
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Write the rendered document here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Theme, or comma-separated themes for one block per theme
        #[arg(short, long)]
        theme: Option<String>,
    },

    /// Manage the block cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// `torchlight cache` subcommands
#[derive(Subcommand, Clone, Debug)]
pub enum CacheCommands {
    /// Remove every cached block
    Clear,
}

/// `torchlight config` subcommands
#[derive(Subcommand, Clone, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration with the token redacted
    Show {
        /// Print JSON instead of TOML
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_highlight() {
        let cli = Cli::try_parse_from([
            "torchlight",
            "-v",
            "highlight",
            "-",
            "--language",
            "php",
            "--theme",
            "nord",
        ])
        .unwrap_or_else(|e| panic!("{e}"));

        assert!(cli.verbose);
        match cli.command {
            Commands::Highlight {
                input,
                language,
                theme,
            } => {
                assert_eq!(input, PathBuf::from("-"));
                assert_eq!(language, "php");
                assert_eq!(theme.as_deref(), Some("nord"));
            },
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["torchlight", "-v", "-q", "config", "show"]).is_err());
    }

    #[test]
    fn test_highlight_requires_language() {
        assert!(Cli::try_parse_from(["torchlight", "highlight", "file.php"]).is_err());
    }
}
