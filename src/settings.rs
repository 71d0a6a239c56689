//! Persistent user settings (`settings.json`).
//!
//! Settings are plain camelCase JSON. Every field is optional on disk and
//! loaded values are sanitized before use.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::source::{DEFAULT_BASE_URL, HttpTimeouts};
use crate::template::TemplateSettings;

/// Application directory name under the config home.
pub const APP_DIR_NAME: &str = "zotero-export";
/// Settings file name.
pub const SETTINGS_FILE_NAME: &str = "settings.json";

const MIN_TIMEOUT_SECS: u64 = 1;
const MAX_TIMEOUT_SECS: u64 = 600;

/// Errors reading or writing the settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The file exists but could not be read or written.
    #[error("failed to access settings file {path}: {source}")]
    Io {
        /// Settings file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid settings JSON.
    #[error("invalid settings file {path}: {source}\n  Suggestion: Fix the JSON or delete the file to start from defaults")]
    Parse {
        /// Settings file path
        path: PathBuf,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// Neither `XDG_CONFIG_HOME` nor `HOME` is set.
    #[error("cannot determine settings location\n  Suggestion: Set XDG_CONFIG_HOME or HOME")]
    NoConfigHome,
}

/// User settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    /// Directory receiving Markdown notes.
    pub markdown_dir: String,
    /// Base directory for `attachment/{cite_key}/` image folders.
    pub attachment_base_dir: String,
    /// Opaque key sent as `Zotero-API-Key`.
    pub zotero_api_key: String,
    /// Zotero local API base URL.
    pub zotero_base_url: String,
    /// Rendering options.
    pub template_settings: TemplateSettings,
    /// HTTP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// HTTP whole-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        let timeouts = HttpTimeouts::default();
        Self {
            markdown_dir: String::new(),
            attachment_base_dir: String::new(),
            zotero_api_key: String::new(),
            zotero_base_url: DEFAULT_BASE_URL.to_string(),
            template_settings: TemplateSettings::default(),
            connect_timeout_secs: timeouts.connect_secs,
            request_timeout_secs: timeouts.request_secs,
        }
    }
}

impl AppSettings {
    /// Returns a sanitized copy.
    ///
    /// Strings are trimmed, an unparsable base URL reverts to the default,
    /// and timeouts are clamped to `1..=600` seconds.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        let base_url = self.zotero_base_url.trim().trim_end_matches('/');
        let zotero_base_url = if !base_url.is_empty() && Url::parse(base_url).is_ok() {
            base_url.to_string()
        } else {
            if !base_url.is_empty() {
                debug!(value = base_url, "Ignoring invalid zoteroBaseUrl");
            }
            DEFAULT_BASE_URL.to_string()
        };

        Self {
            markdown_dir: self.markdown_dir.trim().to_string(),
            attachment_base_dir: self.attachment_base_dir.trim().to_string(),
            zotero_api_key: self.zotero_api_key.trim().to_string(),
            zotero_base_url,
            template_settings: self.template_settings.sanitized(),
            connect_timeout_secs: clamp_timeout(self.connect_timeout_secs),
            request_timeout_secs: clamp_timeout(self.request_timeout_secs),
        }
    }

    /// HTTP timeouts from these settings.
    #[must_use]
    pub fn http_timeouts(&self) -> HttpTimeouts {
        HttpTimeouts {
            connect_secs: clamp_timeout(self.connect_timeout_secs),
            request_secs: clamp_timeout(self.request_timeout_secs),
        }
    }

    /// API key, if one is set.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        Some(self.zotero_api_key.trim()).filter(|key| !key.is_empty())
    }

    /// Loads and sanitizes settings; a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when the file exists but cannot be read or
    /// parsed.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            debug!(path = %path.display(), "No settings file; using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self = serde_json::from_str(&raw).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(settings.sanitized())
    }

    /// Writes sanitized settings as pretty JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Io`] when the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let io_error = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let json = serde_json::to_string_pretty(&self.sanitized()).map_err(|source| {
            SettingsError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        std::fs::write(path, format!("{json}\n")).map_err(io_error)
    }
}

fn clamp_timeout(secs: u64) -> u64 {
    secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS)
}

/// Resolves the settings file path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/zotero-export/settings.json`
/// 2. `$HOME/.config/zotero-export/settings.json`
///
/// # Errors
///
/// Returns [`SettingsError::NoConfigHome`] when neither variable is set.
pub fn default_settings_path() -> Result<PathBuf, SettingsError> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg_config_home)
            .join(APP_DIR_NAME)
            .join(SETTINGS_FILE_NAME));
    }

    let home = env_var_non_empty_os("HOME").ok_or(SettingsError::NoConfigHome)?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join(APP_DIR_NAME)
        .join(SETTINGS_FILE_NAME))
}

fn env_var_non_empty_os(name: &str) -> Option<OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}
