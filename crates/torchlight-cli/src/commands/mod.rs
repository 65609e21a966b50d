//! Command implementations for the torchlight CLI

mod cache;
mod config;
mod highlight;
mod render;

pub use cache::execute as clear_cache;
pub use config::show as show_config;
pub use highlight::execute as highlight;
pub use render::execute as render;
