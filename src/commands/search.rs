//! Search command handler: list matching items.

use anyhow::{Context, Result};

use crate::app::config_runtime;
use crate::cli::{SearchArgs, ZoteroArgs};
use crate::output;

pub async fn run_search_command(args: &SearchArgs, zotero: &ZoteroArgs) -> Result<()> {
    let query = args.query_text();
    let loaded = config_runtime::load_settings()?;
    let settings = config_runtime::apply_cli_overrides(loaded.settings, zotero, None);
    let source = config_runtime::build_source(&settings, zotero)?;

    let results = source
        .search_items(&query)
        .await
        .with_context(|| format!("Search for '{query}' failed"))?;

    if results.is_empty() {
        println!("No items match '{query}'.");
        return Ok(());
    }

    let width = output::terminal_width();
    for summary in &results {
        println!("{}", output::render_search_row(summary, width));
    }
    Ok(())
}
