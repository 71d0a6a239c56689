//! Template settings for rendered notes and the frontmatter codec.
//!
//! Settings come from a user-editable file and are sanitized before use:
//! the property order is reduced to the four known properties, each exactly
//! once, and blank heading overrides are dropped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Frontmatter properties in their default order.
pub const DEFAULT_PROPERTY_ORDER: [&str; 4] = ["title", "author", "year", "company"];

/// User-adjustable rendering options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateSettings {
    /// Order of the frontmatter properties (`title|author|year|company`).
    pub property_order: Vec<String>,
    /// Color name to heading text.
    pub color_heading_overrides: BTreeMap<String, String>,
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            property_order: DEFAULT_PROPERTY_ORDER.iter().map(ToString::to_string).collect(),
            color_heading_overrides: BTreeMap::new(),
        }
    }
}

impl TemplateSettings {
    /// Returns a sanitized copy.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        Self {
            property_order: sanitize_property_order(&self.property_order),
            color_heading_overrides: sanitize_heading_overrides(&self.color_heading_overrides),
        }
    }

    /// Heading for a color group.
    ///
    /// An override is used only when it is non-blank and differs from the
    /// plain color name. Override keys match exactly first, then ignoring
    /// ASCII case.
    #[must_use]
    pub fn heading_for(&self, color_name: &str) -> String {
        let custom = self
            .color_heading_overrides
            .get(color_name)
            .or_else(|| {
                self.color_heading_overrides
                    .iter()
                    .find(|(name, _)| name.trim().eq_ignore_ascii_case(color_name))
                    .map(|(_, heading)| heading)
            })
            .map(|heading| heading.trim())
            .filter(|heading| !heading.is_empty() && *heading != color_name);

        custom.unwrap_or(color_name).to_string()
    }
}

/// Reduces a user-supplied property order to a permutation of
/// [`DEFAULT_PROPERTY_ORDER`].
///
/// Entries are trimmed and lowercased; unknown entries and duplicates are
/// dropped; missing properties are appended in default order.
#[must_use]
pub fn sanitize_property_order(raw: &[String]) -> Vec<String> {
    let mut order: Vec<String> = Vec::with_capacity(DEFAULT_PROPERTY_ORDER.len());
    for entry in raw {
        let normalized = entry.trim().to_ascii_lowercase();
        if DEFAULT_PROPERTY_ORDER.contains(&normalized.as_str()) && !order.contains(&normalized) {
            order.push(normalized);
        }
    }
    for property in DEFAULT_PROPERTY_ORDER {
        if !order.iter().any(|existing| existing == property) {
            order.push(property.to_string());
        }
    }
    order
}

/// Trims override keys and values and drops blank entries.
#[must_use]
pub fn sanitize_heading_overrides(raw: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    raw.iter()
        .map(|(name, heading)| (name.trim().to_string(), heading.trim().to_string()))
        .filter(|(name, heading)| !name.is_empty() && !heading.is_empty())
        .collect()
}

/// Frontmatter key for a property name (`title` -> `Title`).
#[must_use]
pub fn property_label(property: &str) -> String {
    let mut chars = property.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Escapes a value for a YAML single-quoted scalar.
#[must_use]
pub fn escape_single_quoted(value: &str) -> String {
    value.replace('\'', "''")
}

/// Inverse of [`escape_single_quoted`].
#[must_use]
pub fn unescape_single_quoted(value: &str) -> String {
    value.replace("''", "'")
}

/// Parses the leading `---` frontmatter block into ordered key/value pairs.
///
/// Single-quoted values are unquoted and unescaped; other values are
/// returned trimmed. Returns `None` when the document has no closed block.
#[must_use]
pub fn parse_frontmatter(markdown: &str) -> Option<Vec<(String, String)>> {
    let mut lines = markdown.lines();
    if lines.next()?.trim_end() != "---" {
        return None;
    }

    let mut entries = Vec::new();
    for line in lines {
        if line.trim_end() == "---" {
            return Some(entries);
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        let value = match value
            .strip_prefix('\'')
            .and_then(|inner| inner.strip_suffix('\''))
        {
            Some(inner) => unescape_single_quoted(inner),
            None => value.to_string(),
        };
        entries.push((key.trim().to_string(), value));
    }
    None
}
