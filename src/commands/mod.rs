//! CLI command handlers.

mod config;
mod export;
mod ping;
mod search;

pub use config::{run_config_save_command, run_config_show_command};
pub use export::run_export_command;
pub use ping::run_ping_command;
pub use search::run_search_command;
