//! Shared helpers for CLI commands.

pub mod io;
pub mod logging;
pub mod settings;
