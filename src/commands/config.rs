//! Config command handlers: show and persist the effective configuration.

use anyhow::{Context, Result, bail};
use tracing::info;
use zotero_export_core::AppSettings;

use crate::app::config_runtime;
use crate::cli::{OutputArgs, ZoteroArgs};

pub fn run_config_show_command(zotero: &ZoteroArgs) -> Result<()> {
    let loaded = config_runtime::load_settings()?;
    let effective = config_runtime::apply_cli_overrides(loaded.settings, zotero, None);
    let database = config_runtime::resolve_database(zotero);

    let resolved_path = loaded.path.as_ref().map_or_else(
        || "<unresolved>".to_string(),
        |path| path.display().to_string(),
    );
    println!("config_path = {resolved_path}");
    println!(
        "config_file = {}",
        if loaded.loaded_from_file {
            "loaded"
        } else {
            "not found (using defaults)"
        }
    );
    for line in settings_lines(&effective) {
        println!("{line}");
    }
    println!(
        "zotero_db = {}",
        database.as_ref().map_or_else(
            || "<not found>".to_string(),
            |db| db.sqlite_path().display().to_string()
        )
    );
    Ok(())
}

pub fn run_config_save_command(zotero: &ZoteroArgs, output: &OutputArgs) -> Result<()> {
    let loaded = config_runtime::load_settings()?;
    let Some(path) = loaded.path else {
        bail!(
            "Cannot determine where to save settings\n  \
             Suggestion: Set XDG_CONFIG_HOME or HOME"
        );
    };
    let merged = config_runtime::apply_cli_overrides(loaded.settings, zotero, Some(output));
    merged
        .save_to(&path)
        .with_context(|| format!("Failed to save settings to '{}'", path.display()))?;
    info!(path = %path.display(), "Settings saved");
    println!("Saved settings to {}", path.display());
    Ok(())
}

fn settings_lines(settings: &AppSettings) -> Vec<String> {
    let or_unset = |value: &str| {
        if value.is_empty() {
            "<unset>".to_string()
        } else {
            value.to_string()
        }
    };
    let overrides = if settings.template_settings.color_heading_overrides.is_empty() {
        "<none>".to_string()
    } else {
        settings
            .template_settings
            .color_heading_overrides
            .iter()
            .map(|(color, heading)| format!("{color}={heading}"))
            .collect::<Vec<_>>()
            .join(", ")
    };
    vec![
        format!("markdown_dir = {}", or_unset(&settings.markdown_dir)),
        format!(
            "attachment_base_dir = {}",
            if settings.attachment_base_dir.is_empty() {
                "<markdown_dir>".to_string()
            } else {
                settings.attachment_base_dir.clone()
            }
        ),
        format!("zotero_base_url = {}", settings.zotero_base_url),
        format!(
            "zotero_api_key = {}",
            if settings.api_key().is_some() {
                "<redacted>"
            } else {
                "<unset>"
            }
        ),
        format!("connect_timeout_secs = {}", settings.connect_timeout_secs),
        format!("request_timeout_secs = {}", settings.request_timeout_secs),
        format!(
            "property_order = {}",
            settings.template_settings.property_order.join(", ")
        ),
        format!("color_heading_overrides = {overrides}"),
    ]
}
