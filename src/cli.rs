//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Export Zotero PDF annotations to Markdown notes.
///
/// Reads items from the local Zotero database when available and from the
/// Zotero local API otherwise, and writes one `@citekey.md` note per item.
#[derive(Parser, Debug)]
#[command(name = "zotero-export")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(flatten)]
    pub zotero: ZoteroArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Backend connection flags shared by every command.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoteroArgs {
    /// Zotero local API base URL (default http://127.0.0.1:23119)
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Zotero API key sent with local API requests
    #[arg(long, global = true, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Path to zotero.sqlite (default: $ZOTERO_SQLITE_PATH or ~/Zotero)
    #[arg(long, global = true, value_name = "PATH")]
    pub zotero_db: Option<PathBuf>,

    /// Path to better-bibtex.sqlite (default: next to zotero.sqlite)
    #[arg(long, global = true, value_name = "PATH")]
    pub bbt_db: Option<PathBuf>,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Export annotations of one or more items to Markdown
    Export(ExportArgs),
    /// Search items by title, creator, or year
    Search(SearchArgs),
    /// Check whether Zotero is reachable
    Ping,
    /// Show or save settings
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Output directory flags.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputArgs {
    /// Directory receiving @citekey.md notes
    #[arg(long, value_name = "DIR")]
    pub markdown_dir: Option<String>,

    /// Base directory for attachment/<citekey>/ image folders (default: markdown dir)
    #[arg(long = "attachment-dir", value_name = "DIR")]
    pub attachment_dir: Option<String>,
}

/// Arguments of `export`.
#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Zotero item keys to export
    #[arg(required = true, value_name = "ITEM_KEY")]
    pub keys: Vec<String>,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Render and list planned files without writing or downloading images
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments of `search`.
#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Search text (matched against title, creators, and date)
    #[arg(required = true, num_args = 1.., value_name = "QUERY")]
    pub query: Vec<String>,
}

impl SearchArgs {
    /// Query words joined with single spaces.
    #[must_use]
    pub fn query_text(&self) -> String {
        self.query.join(" ")
    }
}

/// `config` subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Persist the given flags into the settings file
    Save(OutputArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_export_parses_keys_and_flags() {
        let cli = Cli::try_parse_from([
            "zotero-export",
            "export",
            "ABCD2345",
            "EFGH6789",
            "--markdown-dir",
            "/vault",
            "--dry-run",
        ])
        .unwrap();
        let Command::Export(args) = cli.command else {
            panic!("expected export command");
        };
        assert_eq!(args.keys, vec!["ABCD2345", "EFGH6789"]);
        assert_eq!(args.output.markdown_dir.as_deref(), Some("/vault"));
        assert_eq!(args.output.attachment_dir, None);
        assert!(args.dry_run);
    }

    #[test]
    fn test_cli_export_requires_keys() {
        let err = Cli::try_parse_from(["zotero-export", "export"]).unwrap_err();
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "zotero-export",
            "ping",
            "--base-url",
            "http://localhost:1234",
            "--zotero-db",
            "/tmp/zotero.sqlite",
            "-vv",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Ping));
        assert_eq!(cli.verbose, 2);
        assert_eq!(
            cli.zotero.base_url.as_deref(),
            Some("http://localhost:1234")
        );
        assert_eq!(
            cli.zotero.zotero_db,
            Some(PathBuf::from("/tmp/zotero.sqlite"))
        );
    }

    #[test]
    fn test_cli_quiet_conflicts_with_verbose() {
        let err = Cli::try_parse_from(["zotero-export", "-q", "-v", "ping"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_cli_search_joins_words() {
        let cli = Cli::try_parse_from(["zotero-export", "search", "attention", "is"]).unwrap();
        let Command::Search(args) = cli.command else {
            panic!("expected search command");
        };
        assert_eq!(args.query_text(), "attention is");
    }

    #[test]
    fn test_cli_config_save_flags() {
        let cli = Cli::try_parse_from([
            "zotero-export",
            "config",
            "save",
            "--markdown-dir",
            "/notes",
            "--attachment-dir",
            "/files",
        ])
        .unwrap();
        let Command::Config {
            command: ConfigCommand::Save(output),
        } = cli.command
        else {
            panic!("expected config save");
        };
        assert_eq!(output.markdown_dir.as_deref(), Some("/notes"));
        assert_eq!(output.attachment_dir.as_deref(), Some("/files"));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        let result = Cli::try_parse_from(["zotero-export"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Cli::try_parse_from(["zotero-export", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
