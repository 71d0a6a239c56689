//! Citation key resolution from item metadata.
//!
//! Resolution order:
//! 1. direct metadata fields ([`DIRECT_CITE_KEY_FIELDS`])
//! 2. labelled lines in the free-text `extra` field
//! 3. [`CiteKeyError::Missing`]
//!
//! Better BibTeX lookups are a separate, I/O-bound fallback owned by the
//! export orchestrator.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::item::Item;

/// Metadata fields checked for a citation key, in priority order.
pub const DIRECT_CITE_KEY_FIELDS: [&str; 4] =
    ["citationKey", "citekey", "bibtexKey", "meta.citationKey"];

static EXTRA_CITE_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:BBT Citation Key|Citation Key|citekey)\s*:\s*(\S.*?)\s*$")
        .unwrap_or_else(|e| panic!("invalid static regex: {e}"))
});

/// Errors from citation key resolution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CiteKeyError {
    /// No citation key could be found for the item.
    #[error("no citation key found for item '{item_key}'\n  Suggestion: {suggestion}")]
    Missing {
        /// The item that has no citation key
        item_key: String,
        /// How to fix the issue
        suggestion: String,
    },
}

impl CiteKeyError {
    /// Creates a `Missing` error with remediation guidance.
    #[must_use]
    pub fn missing(item_key: &str) -> Self {
        Self::Missing {
            item_key: item_key.to_string(),
            suggestion: "Install Better BibTeX for Zotero, or add a line \
                         'Citation Key: <key>' to the item's Extra field"
                .to_string(),
        }
    }
}

/// Resolves a citation key from an item's own metadata.
///
/// # Errors
///
/// Returns [`CiteKeyError::Missing`] when neither a direct field nor a
/// labelled `extra` line carries a key.
pub fn resolve_cite_key(item: &Item) -> Result<String, CiteKeyError> {
    if let Some(key) = DIRECT_CITE_KEY_FIELDS
        .iter()
        .find_map(|field| item.field(field))
    {
        return Ok(key.to_string());
    }

    if let Some(key) = item.field("extra").and_then(cite_key_from_extra) {
        return Ok(key);
    }

    Err(CiteKeyError::missing(&item.key))
}

/// Scans `extra` line by line for a labelled citation key.
#[must_use]
pub fn cite_key_from_extra(extra: &str) -> Option<String> {
    extra.lines().find_map(|line| {
        EXTRA_CITE_KEY_RE
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|value| !value.is_empty())
    })
}
