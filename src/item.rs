//! Normalized Zotero records shared by both backends.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::color::{color_name, normalize_color_code};

/// Item types that are never offered as export candidates.
pub const NON_SEARCHABLE_ITEM_TYPES: [&str; 3] = ["attachment", "note", "annotation"];

/// Placeholder title some Zotero views substitute for missing titles.
pub const UNTITLED_PLACEHOLDER: &str = "(untitled)";

/// A creator of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Creator {
    /// Two-field name.
    Structured {
        /// Family name.
        last: String,
        /// Given name.
        first: String,
    },
    /// Single-field name (institutions, mononyms).
    Single {
        /// Display name.
        name: String,
    },
}

impl Creator {
    /// Display form: `"Last, First"`, or the raw name for single-field creators.
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Structured { last, first } => {
                let last = last.trim();
                let first = first.trim();
                if first.is_empty() {
                    last.to_string()
                } else if last.is_empty() {
                    first.to_string()
                } else {
                    format!("{last}, {first}")
                }
            }
            Self::Single { name } => name.trim().to_string(),
        }
    }
}

/// Joins creators in encounter order with `"; "`, skipping blank entries.
#[must_use]
pub fn join_creators(creators: &[Creator]) -> String {
    creators
        .iter()
        .map(Creator::display)
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A bibliographic item with its metadata fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Item {
    /// Zotero item key.
    pub key: String,
    /// Zotero item type (e.g. `journalArticle`).
    pub item_type: String,
    /// String metadata fields keyed by Zotero field name.
    pub fields: BTreeMap<String, String>,
    /// Creators in Zotero order.
    pub creators: Vec<Creator>,
}

impl Item {
    /// Creates an item with no fields.
    #[must_use]
    pub fn new(key: impl Into<String>, item_type: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            item_type: item_type.into(),
            ..Self::default()
        }
    }

    /// Builder-style field setter.
    #[must_use]
    pub fn with_field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// Builder-style creator append.
    #[must_use]
    pub fn with_creator(mut self, creator: Creator) -> Self {
        self.creators.push(creator);
        self
    }

    /// Returns the trimmed field value, or `None` when absent or blank.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}

/// A PDF annotation with a reconciled presentation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    /// Annotation item key.
    pub key: String,
    /// Key of the attachment the annotation belongs to.
    pub attachment_key: String,
    /// Normalized (trimmed, lowercase) color code.
    pub color_hex: String,
    /// Canonical color name derived from `color_hex`.
    pub color_name: String,
    /// Highlighted text.
    pub text: String,
    /// User comment.
    pub comment: String,
    /// Free-text page label.
    pub page_label: String,
    /// Stable presentation index.
    pub sort_index: usize,
    /// True for selected-area (image) annotations.
    pub is_image: bool,
}

impl Annotation {
    /// Creates an annotation; the color code is normalized and classified.
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        attachment_key: impl Into<String>,
        color_code: &str,
        sort_index: usize,
    ) -> Self {
        Self {
            key: key.into(),
            attachment_key: attachment_key.into(),
            color_hex: normalize_color_code(color_code),
            color_name: color_name(color_code),
            text: String::new(),
            comment: String::new(),
            page_label: String::new(),
            sort_index,
            is_image: false,
        }
    }

    /// Builder-style text setter.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Builder-style comment setter.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Builder-style page label setter.
    #[must_use]
    pub fn with_page_label(mut self, page_label: impl Into<String>) -> Self {
        self.page_label = page_label.into();
        self
    }

    /// Marks the annotation as an image selection.
    #[must_use]
    pub fn as_image(mut self) -> Self {
        self.is_image = true;
        self
    }
}

/// One search result row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemSummary {
    /// Item key.
    pub key: String,
    /// Item title.
    pub title: String,
    /// Creators joined with `"; "`.
    pub creators: String,
    /// Four-digit year, or empty.
    pub year: String,
    /// Zotero item type.
    pub item_type: String,
}

/// Returns true when a title is usable in search results.
#[must_use]
pub fn is_displayable_title(title: &str) -> bool {
    let trimmed = title.trim();
    !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case(UNTITLED_PLACEHOLDER)
}

/// Drops non-top-level item types and results without a usable title.
#[must_use]
pub fn filter_search_results(results: Vec<ItemSummary>) -> Vec<ItemSummary> {
    results
        .into_iter()
        .filter(|summary| !NON_SEARCHABLE_ITEM_TYPES.contains(&summary.item_type.as_str()))
        .filter(|summary| is_displayable_title(&summary.title))
        .collect()
}

/// Extracts the first run of four ASCII digits from free-text date input.
#[must_use]
pub fn extract_year(raw: &str) -> String {
    let bytes = raw.as_bytes();
    bytes
        .windows(4)
        .position(|window| window.iter().all(u8::is_ascii_digit))
        .map(|start| raw[start..start + 4].to_string())
        .unwrap_or_default()
}
