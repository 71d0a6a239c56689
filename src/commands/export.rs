//! Export command handler: write (or preview) notes for the given items.

use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::info;
use zotero_export_core::{ExportOptions, Exporter};

use crate::ProcessExit;
use crate::app::{config_runtime, exit_handler, progress_manager, terminal};
use crate::cli::{ExportArgs, ZoteroArgs};
use crate::output;

pub async fn run_export_command(
    args: &ExportArgs,
    zotero: &ZoteroArgs,
    quiet: bool,
) -> Result<ProcessExit> {
    let keys = normalize_item_keys(&args.keys);
    if keys.is_empty() {
        bail!("No item keys given\n  Suggestion: Pass one or more Zotero item keys, e.g. `zotero-export export ABCD2345`");
    }

    let loaded = config_runtime::load_settings()?;
    let settings = config_runtime::apply_cli_overrides(loaded.settings, zotero, Some(&args.output));
    let (markdown_dir, attachment_base_dir) = config_runtime::resolve_output_dirs(&settings)?;
    let source = config_runtime::build_source(&settings, zotero)?;

    let options = ExportOptions::new(markdown_dir, attachment_base_dir)
        .with_dry_run(args.dry_run)
        .with_template(settings.template_settings.clone());
    info!(
        items = keys.len(),
        dry_run = args.dry_run,
        markdown_dir = %options.markdown_dir,
        "Starting export"
    );

    let use_spinner = terminal::should_use_spinner(
        std::io::stderr().is_terminal(),
        quiet,
        terminal::is_dumb_terminal(),
        keys.len(),
    );
    let spinner = progress_manager::create_spinner(use_spinner);
    let total = keys.len();

    let exporter = Exporter::new(Arc::new(source));
    let summary = exporter
        .export_items(&keys, &options, |index, key| {
            if let Some(spinner) = &spinner {
                spinner.set_message(progress_manager::progress_message(index, total, key));
            }
        })
        .await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    for preview in summary.outcomes.iter().filter_map(|o| o.preview.as_deref()) {
        println!("{preview}");
    }
    for line in output::render_export_summary_lines(&summary, args.dry_run, output::terminal_width())
    {
        println!("{line}");
    }

    Ok(exit_handler::determine_exit_outcome(&summary))
}

/// Trims keys and drops blanks and repeats, keeping first-seen order.
fn normalize_item_keys(raw: &[String]) -> Vec<String> {
    let mut keys: Vec<String> = Vec::with_capacity(raw.len());
    for key in raw.iter().map(|key| key.trim()) {
        if !key.is_empty() && !keys.iter().any(|seen| seen == key) {
            keys.push(key.to_string());
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_item_keys() {
        let raw = vec![
            " ABCD2345 ".to_string(),
            String::new(),
            "EFGH6789".to_string(),
            "ABCD2345".to_string(),
        ];
        assert_eq!(normalize_item_keys(&raw), vec!["ABCD2345", "EFGH6789"]);
    }
}
