//! Per-run export results.

use serde::Serialize;

/// Result of one successfully exported (or previewed) item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemOutcome {
    /// Zotero item key.
    pub item_key: String,
    /// Citation key naming the note.
    pub cite_key: String,
    /// Markdown destination.
    pub markdown_path: String,
    /// Number of annotations rendered.
    pub annotation_count: usize,
    /// Image files written (or planned, in a dry run).
    pub image_paths: Vec<String>,
    /// Annotations whose image could not be obtained.
    pub missing_images: usize,
    /// Rendered preview; only set for dry runs.
    pub preview: Option<String>,
}

impl ItemOutcome {
    /// True when the note has annotations and every image was written.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.annotation_count > 0 && self.missing_images == 0
    }
}

/// An item that could not be exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    /// Zotero item key.
    pub item_key: String,
    /// Error message, including any suggestion.
    pub message: String,
}

/// Aggregated results of an export run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    /// Items that produced a note, in processing order.
    pub outcomes: Vec<ItemOutcome>,
    /// Items that failed, in processing order.
    pub failures: Vec<ItemFailure>,
}

impl ExportSummary {
    /// Items that produced a note.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.outcomes.len()
    }

    /// Items that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Items exported with annotations and all images.
    #[must_use]
    pub fn fully_succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_complete()).count()
    }

    /// Items exported without any annotations.
    #[must_use]
    pub fn without_annotations(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.annotation_count == 0)
            .count()
    }

    /// Items with at least one missing image.
    #[must_use]
    pub fn with_missing_images(&self) -> usize {
        self.outcomes.iter().filter(|o| o.missing_images > 0).count()
    }

    /// Total missing-image TODOs across all items.
    #[must_use]
    pub fn missing_image_todos(&self) -> usize {
        self.outcomes.iter().map(|o| o.missing_images).sum()
    }
}
