//! Effective configuration: settings file merged with command-line flags.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::debug;
use zotero_export_core::{
    AnnotationSource, AppSettings, LocalApi, SettingsError, ZoteroDatabase, default_settings_path,
};

use crate::cli::{OutputArgs, ZoteroArgs};

/// Settings as loaded from disk.
#[derive(Debug, Clone)]
pub(crate) struct LoadedSettings {
    /// Resolved settings path, if a config home is known.
    pub(crate) path: Option<PathBuf>,
    /// Sanitized settings (defaults when no file exists).
    pub(crate) settings: AppSettings,
    /// Whether a settings file was read.
    pub(crate) loaded_from_file: bool,
}

/// Loads the settings file from its default location.
pub(crate) fn load_settings() -> Result<LoadedSettings> {
    let path = match default_settings_path() {
        Ok(path) => path,
        Err(SettingsError::NoConfigHome) => {
            debug!("No config home; using default settings");
            return Ok(LoadedSettings {
                path: None,
                settings: AppSettings::default(),
                loaded_from_file: false,
            });
        }
        Err(error) => return Err(error.into()),
    };

    let loaded_from_file = path.exists();
    let settings = AppSettings::load_from(&path)
        .with_context(|| format!("Failed to load settings from '{}'", path.display()))?;
    Ok(LoadedSettings {
        path: Some(path),
        settings,
        loaded_from_file,
    })
}

/// Applies flags given on the command line over file settings.
pub(crate) fn apply_cli_overrides(
    mut settings: AppSettings,
    zotero: &ZoteroArgs,
    output: Option<&OutputArgs>,
) -> AppSettings {
    if let Some(base_url) = non_blank(zotero.base_url.as_deref()) {
        settings.zotero_base_url = base_url.to_string();
    }
    if let Some(api_key) = non_blank(zotero.api_key.as_deref()) {
        settings.zotero_api_key = api_key.to_string();
    }
    if let Some(output) = output {
        if let Some(dir) = non_blank(output.markdown_dir.as_deref()) {
            settings.markdown_dir = dir.to_string();
        }
        if let Some(dir) = non_blank(output.attachment_dir.as_deref()) {
            settings.attachment_base_dir = dir.to_string();
        }
    }
    settings.sanitized()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Default log level from verbosity flags.
pub(crate) fn resolve_default_log_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Explicit verbosity flags override `RUST_LOG`.
pub(crate) fn should_force_cli_log_level(verbose: u8, quiet: bool) -> bool {
    verbose > 0 || quiet
}

/// Markdown and attachment base directories, made absolute against the
/// working directory; the attachment base defaults to the Markdown directory.
pub(crate) fn resolve_output_dirs(settings: &AppSettings) -> Result<(String, String)> {
    if settings.markdown_dir.is_empty() {
        bail!(
            "No Markdown output directory configured\n  \
             Suggestion: Pass --markdown-dir, or run `zotero-export config save --markdown-dir <DIR>`"
        );
    }
    let attachment_base_dir = if settings.attachment_base_dir.is_empty() {
        &settings.markdown_dir
    } else {
        &settings.attachment_base_dir
    };
    Ok((
        absolute_dir(&settings.markdown_dir)?,
        absolute_dir(attachment_base_dir)?,
    ))
}

fn absolute_dir(dir: &str) -> Result<String> {
    let absolute = std::path::absolute(dir)
        .with_context(|| format!("Cannot resolve output directory '{dir}'"))?;
    Ok(absolute.to_string_lossy().into_owned())
}

/// Picks the database: `--zotero-db` when given, otherwise the located default.
pub(crate) fn resolve_database(zotero: &ZoteroArgs) -> Option<ZoteroDatabase> {
    let database = match &zotero.zotero_db {
        Some(path) => Some(ZoteroDatabase::new(path)),
        None => match ZoteroDatabase::locate() {
            Ok(db) => Some(db),
            Err(error) => {
                debug!(error = %error, "Local Zotero database not found; using local API only");
                None
            }
        },
    };
    match (&zotero.bbt_db, database) {
        (Some(bbt), Some(db)) => Some(db.with_better_bibtex(bbt)),
        (_, database) => database,
    }
}

/// Builds the database-first, local-API-second source.
pub(crate) fn build_source(settings: &AppSettings, zotero: &ZoteroArgs) -> Result<AnnotationSource> {
    let local_api = LocalApi::new(
        &settings.zotero_base_url,
        settings.api_key().map(ToString::to_string),
        settings.http_timeouts(),
    )
    .context("Failed to set up the Zotero local API client")?;
    Ok(AnnotationSource::new(resolve_database(zotero), local_api))
}
