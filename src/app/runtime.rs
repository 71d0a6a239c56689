use anyhow::Result;
use clap::Parser;
use tracing::debug;

use crate::app::{config_runtime, terminal};
use crate::cli::{Cli, Command, ConfigCommand};
use crate::{ProcessExit, commands};

pub(crate) async fn run() -> Result<ProcessExit> {
    let cli = Cli::parse();

    let default_level = config_runtime::resolve_default_log_level(cli.verbose, cli.quiet);
    let force_cli_log_level = config_runtime::should_force_cli_log_level(cli.verbose, cli.quiet);
    let no_color = terminal::should_disable_color(
        terminal::no_color_env_requested(),
        terminal::is_dumb_terminal(),
    );
    terminal::init_tracing(default_level, force_cli_log_level, no_color);
    debug!(command = ?cli.command, "CLI arguments parsed");

    match &cli.command {
        Command::Export(args) => commands::run_export_command(args, &cli.zotero, cli.quiet).await,
        Command::Search(args) => {
            commands::run_search_command(args, &cli.zotero).await?;
            Ok(ProcessExit::Success)
        }
        Command::Ping => commands::run_ping_command(&cli.zotero).await,
        Command::Config { command } => {
            match command {
                ConfigCommand::Show => commands::run_config_show_command(&cli.zotero)?,
                ConfigCommand::Save(output) => {
                    commands::run_config_save_command(&cli.zotero, output)?;
                }
            }
            Ok(ProcessExit::Success)
        }
    }
}
