//! Export orchestration: from item keys to Markdown notes on disk.
//!
//! Items are processed one at a time. For each item the exporter fetches the
//! item, resolves its citation key, fetches annotations, plans paths, obtains
//! selected-area images, renders, and writes. A failing item is recorded in
//! the [`ExportSummary`] and the run continues with the next key.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use zotero_export_core::export::{ExportOptions, Exporter};
//! use zotero_export_core::source::{AnnotationSource, HttpTimeouts, LocalApi};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let api = LocalApi::new("http://127.0.0.1:23119", None, HttpTimeouts::default())?;
//! let exporter = Exporter::new(Arc::new(AnnotationSource::new(None, api)));
//! let options = ExportOptions::new("/vault/papers", "/vault");
//! let summary = exporter
//!     .export_items(&["ABCD2345".to_string()], &options, |_, _| {})
//!     .await;
//! println!("{} exported, {} failed", summary.completed(), summary.failed());
//! # Ok(())
//! # }
//! ```

mod summary;

pub use summary::{ExportSummary, ItemFailure, ItemOutcome};

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::citekey::{CiteKeyError, resolve_cite_key};
use crate::item::Item;
use crate::paths::parent_dir;
use crate::plan::{ExportPlan, PlanInput, prepare_export_plan};
use crate::render::render_markdown;
use crate::source::{ItemSource, SourceError};
use crate::template::TemplateSettings;

/// Message recorded when no backend can provide an annotation image.
pub const MISSING_IMAGE_MESSAGE: &str =
    "image could not be retrieved from Zotero; open the annotation to export it manually";

/// Errors that stop the export of a single item.
#[derive(Debug, Error)]
pub enum ExportError {
    /// No citation key is available to name the note.
    #[error(transparent)]
    CiteKey(#[from] CiteKeyError),

    /// Item data could not be read from any backend.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Writing the note or an image failed.
    #[error("failed to write {path}: {source}\n  Suggestion: Check that the output directory exists and is writable")]
    Io {
        /// The path being written
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ExportError {
    fn io(path: &str, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_string(),
            source,
        }
    }
}

/// Where and how notes are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Directory receiving `@{cite_key}.md`.
    pub markdown_dir: String,
    /// Base directory receiving `attachment/{cite_key}/image_N.png`.
    pub attachment_base_dir: String,
    /// Render and report without touching the filesystem or fetching images.
    pub dry_run: bool,
    /// Rendering options.
    pub template: TemplateSettings,
}

impl ExportOptions {
    /// Creates write-mode options with default template settings.
    #[must_use]
    pub fn new(markdown_dir: impl Into<String>, attachment_base_dir: impl Into<String>) -> Self {
        Self {
            markdown_dir: markdown_dir.into(),
            attachment_base_dir: attachment_base_dir.into(),
            dry_run: false,
            template: TemplateSettings::default(),
        }
    }

    /// Sets dry-run mode.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sets the template settings (sanitized at render time).
    #[must_use]
    pub fn with_template(mut self, template: TemplateSettings) -> Self {
        self.template = template;
        self
    }
}

/// Drives exports against an [`ItemSource`].
#[derive(Clone)]
pub struct Exporter {
    source: Arc<dyn ItemSource>,
}

impl std::fmt::Debug for Exporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter").finish_non_exhaustive()
    }
}

impl Exporter {
    /// Creates an exporter over a data source.
    #[must_use]
    pub fn new(source: Arc<dyn ItemSource>) -> Self {
        Self { source }
    }

    /// Exports items sequentially, collecting per-item results.
    ///
    /// `on_item` is called with the zero-based position and key before each
    /// item starts.
    pub async fn export_items(
        &self,
        item_keys: &[String],
        options: &ExportOptions,
        mut on_item: impl FnMut(usize, &str),
    ) -> ExportSummary {
        let mut summary = ExportSummary::default();
        for (index, item_key) in item_keys.iter().enumerate() {
            on_item(index, item_key);
            match self.export_item(item_key, options).await {
                Ok(outcome) => summary.outcomes.push(outcome),
                Err(error) => {
                    warn!(item = %item_key, error = %error, "Item export failed");
                    summary.failures.push(ItemFailure {
                        item_key: item_key.clone(),
                        message: error.to_string(),
                    });
                }
            }
        }
        info!(
            completed = summary.completed(),
            failed = summary.failed(),
            "Export run finished"
        );
        summary
    }

    /// Exports a single item.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] when the item or its annotations cannot be
    /// read, no citation key exists, or a write fails.
    #[instrument(skip(self, options), fields(dry_run = options.dry_run))]
    pub async fn export_item(
        &self,
        item_key: &str,
        options: &ExportOptions,
    ) -> Result<ItemOutcome, ExportError> {
        let item = self.source.get_item(item_key).await?;
        let cite_key = self.cite_key_for(&item).await?;
        let annotations = self.source.get_annotations(item_key).await?;
        debug!(cite_key = %cite_key, annotations = annotations.len(), "Planning export");

        let mut plan = prepare_export_plan(PlanInput {
            markdown_dir: &options.markdown_dir,
            attachment_base_dir: &options.attachment_base_dir,
            cite_key: &cite_key,
            item: &item,
            annotations: &annotations,
        });

        if options.dry_run {
            let markdown = render_markdown(&plan, Some(&options.template));
            let preview = build_preview(&plan, &markdown);
            return Ok(outcome_for(&plan, Some(preview)));
        }

        // Images go to disk first so the note never embeds a file that was
        // not written.
        for image in plan.images.clone() {
            let Some(bytes) = self
                .source
                .annotation_image(&image.annotation_key, Some(&image.attachment_key))
                .await
            else {
                warn!(annotation = %image.annotation_key, "Annotation image unavailable");
                plan = plan.with_missing_image(&image.annotation_key, MISSING_IMAGE_MESSAGE);
                continue;
            };
            if let Err(error) = write_bytes(&image.absolute_path, &bytes).await {
                warn!(
                    annotation = %image.annotation_key,
                    error = %error,
                    "Annotation image could not be written"
                );
                plan = plan.with_missing_image(
                    &image.annotation_key,
                    format!("image could not be saved to {}", image.absolute_path),
                );
            }
        }

        let markdown = render_markdown(&plan, Some(&options.template));
        write_text(&plan.markdown_path, &markdown).await?;

        let outcome = outcome_for(&plan, None);
        info!(
            cite_key = %outcome.cite_key,
            path = %outcome.markdown_path,
            annotations = outcome.annotation_count,
            images = outcome.image_paths.len(),
            missing_images = outcome.missing_images,
            "Exported item"
        );
        Ok(outcome)
    }

    async fn cite_key_for(&self, item: &Item) -> Result<String, ExportError> {
        match resolve_cite_key(item) {
            Ok(key) => Ok(key),
            Err(missing) => {
                debug!(item = %item.key, "No citation key in metadata; asking Better BibTeX");
                match self.source.lookup_citation_key(&item.key).await {
                    Some(key) => Ok(key),
                    None => Err(missing.into()),
                }
            }
        }
    }
}

fn outcome_for(plan: &ExportPlan, preview: Option<String>) -> ItemOutcome {
    ItemOutcome {
        item_key: plan.item_key.clone(),
        cite_key: plan.cite_key.clone(),
        markdown_path: plan.markdown_path.clone(),
        annotation_count: plan.annotation_count(),
        image_paths: plan
            .images
            .iter()
            .map(|image| image.absolute_path.clone())
            .collect(),
        missing_images: plan.missing_image_count(),
        preview,
    }
}

/// Lists the planned files followed by the rendered document.
fn build_preview(plan: &ExportPlan, markdown: &str) -> String {
    let mut preview = String::new();
    preview.push_str(&format!("Markdown: {}\n", plan.markdown_path));
    for image in &plan.images {
        preview.push_str(&format!("Image: {}\n", image.absolute_path));
    }
    preview.push('\n');
    preview.push_str(markdown);
    preview
}

async fn ensure_parent(path: &str) -> Result<(), ExportError> {
    let dir = parent_dir(path);
    if dir.is_empty() {
        return Ok(());
    }
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|error| ExportError::io(&dir, error))
}

async fn write_text(path: &str, contents: &str) -> Result<(), ExportError> {
    ensure_parent(path).await?;
    tokio::fs::write(path, contents)
        .await
        .map_err(|error| ExportError::io(path, error))
}

async fn write_bytes(path: &str, bytes: &[u8]) -> Result<(), ExportError> {
    ensure_parent(path).await?;
    tokio::fs::write(path, bytes)
        .await
        .map_err(|error| ExportError::io(path, error))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::item::{Annotation, Creator};

    #[derive(Default)]
    struct FakeSource {
        items: HashMap<String, Item>,
        annotations: HashMap<String, Vec<Annotation>>,
        images: HashMap<String, Vec<u8>>,
        bbt_keys: HashMap<String, String>,
        image_requests: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ItemSource for FakeSource {
        async fn get_item(&self, item_key: &str) -> Result<Item, SourceError> {
            self.items
                .get(item_key)
                .cloned()
                .ok_or_else(|| SourceError::not_found("item", item_key))
        }

        async fn get_annotations(&self, item_key: &str) -> Result<Vec<Annotation>, SourceError> {
            Ok(self.annotations.get(item_key).cloned().unwrap_or_default())
        }

        async fn annotation_image(
            &self,
            annotation_key: &str,
            _attachment_key: Option<&str>,
        ) -> Option<Vec<u8>> {
            self.image_requests
                .lock()
                .unwrap()
                .push(annotation_key.to_string());
            self.images.get(annotation_key).cloned()
        }

        async fn lookup_citation_key(&self, item_key: &str) -> Option<String> {
            self.bbt_keys.get(item_key).cloned()
        }
    }

    fn paper(key: &str, cite_key: Option<&str>) -> Item {
        let mut item = Item::new(key, "journalArticle")
            .with_field("title", "A Paper")
            .with_field("date", "2020")
            .with_creator(Creator::Structured {
                last: "Smith".into(),
                first: "Ann".into(),
            });
        if let Some(cite_key) = cite_key {
            item = item.with_field("citationKey", cite_key);
        }
        item
    }

    fn source_with_images() -> FakeSource {
        let mut source = FakeSource::default();
        source
            .items
            .insert("ITEM1".into(), paper("ITEM1", Some("smith2020")));
        source.annotations.insert(
            "ITEM1".into(),
            vec![
                Annotation::new("TXT", "ATT", "#ffd400", 0)
                    .with_text("highlight")
                    .with_page_label("1"),
                Annotation::new("IMG1", "ATT", "#2ea8e5", 1).as_image(),
                Annotation::new("IMG2", "ATT", "#2ea8e5", 2).as_image(),
            ],
        );
        source.images.insert("IMG1".into(), vec![0x89, b'P', b'N', b'G']);
        source
    }

    fn options_in(dir: &std::path::Path) -> ExportOptions {
        let root = dir.to_string_lossy().to_string();
        ExportOptions::new(format!("{root}/notes"), root)
    }

    #[tokio::test]
    async fn test_export_writes_markdown_and_available_images() {
        let temp = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(Arc::new(source_with_images()));
        let options = options_in(temp.path());

        let outcome = exporter.export_item("ITEM1", &options).await.unwrap();

        assert_eq!(outcome.cite_key, "smith2020");
        assert_eq!(outcome.annotation_count, 3);
        assert_eq!(outcome.missing_images, 1);
        assert_eq!(outcome.image_paths.len(), 1);
        assert!(outcome.preview.is_none());

        let markdown = std::fs::read_to_string(temp.path().join("notes/@smith2020.md")).unwrap();
        assert!(markdown.contains("![image_1.png](../attachment/smith2020/image_1.png)"));
        assert!(markdown.contains(&format!("> TODO: {MISSING_IMAGE_MESSAGE}")));
        assert!(!markdown.contains("image_2.png"));

        let image = std::fs::read(temp.path().join("attachment/smith2020/image_1.png")).unwrap();
        assert_eq!(image, vec![0x89, b'P', b'N', b'G']);
        assert!(!temp.path().join("attachment/smith2020/image_2.png").exists());
    }

    #[tokio::test]
    async fn test_unwritable_image_becomes_todo_in_note() {
        let temp = tempfile::tempdir().unwrap();
        // A plain file where the attachment directory should go.
        std::fs::write(temp.path().join("attachment"), b"not a directory").unwrap();
        let exporter = Exporter::new(Arc::new(source_with_images()));

        let outcome = exporter
            .export_item("ITEM1", &options_in(temp.path()))
            .await
            .unwrap();

        assert_eq!(outcome.missing_images, 2);
        assert!(outcome.image_paths.is_empty());
        let markdown = std::fs::read_to_string(temp.path().join("notes/@smith2020.md")).unwrap();
        assert!(!markdown.contains("![image_1.png]"));
        assert!(markdown.contains("> TODO: image could not be saved to "));
        assert!(markdown.contains(&format!("> TODO: {MISSING_IMAGE_MESSAGE}")));
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing_and_fetches_no_images() {
        let temp = tempfile::tempdir().unwrap();
        let source = Arc::new(source_with_images());
        let exporter = Exporter::new(source.clone());
        let options = options_in(temp.path()).with_dry_run(true);

        let outcome = exporter.export_item("ITEM1", &options).await.unwrap();

        let preview = outcome.preview.unwrap();
        assert!(preview.starts_with(&format!("Markdown: {}", outcome.markdown_path)));
        assert!(preview.contains("attachment/smith2020/image_2.png"));
        assert!(preview.contains("## Annotations"));
        assert!(source.image_requests.lock().unwrap().is_empty());
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_cite_key_falls_back_to_better_bibtex() {
        let mut source = FakeSource::default();
        source.items.insert("ITEM2".into(), paper("ITEM2", None));
        source.bbt_keys.insert("ITEM2".into(), "bbt2020".into());
        let temp = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(Arc::new(source));

        let outcome = exporter
            .export_item("ITEM2", &options_in(temp.path()))
            .await
            .unwrap();
        assert_eq!(outcome.cite_key, "bbt2020");
        assert_eq!(outcome.annotation_count, 0);
        assert!(temp.path().join("notes/@bbt2020.md").exists());
    }

    #[tokio::test]
    async fn test_missing_cite_key_is_terminal_for_item() {
        let mut source = FakeSource::default();
        source.items.insert("ITEM3".into(), paper("ITEM3", None));
        let temp = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(Arc::new(source));

        let err = exporter
            .export_item("ITEM3", &options_in(temp.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::CiteKey(CiteKeyError::Missing { .. })));
        assert!(err.to_string().contains("Better BibTeX"));
    }

    #[tokio::test]
    async fn test_export_items_collects_failures_and_continues() {
        let temp = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(Arc::new(source_with_images()));
        let keys = vec!["MISSING".to_string(), "ITEM1".to_string()];
        let mut seen = Vec::new();

        let summary = exporter
            .export_items(&keys, &options_in(temp.path()), |index, key| {
                seen.push((index, key.to_string()));
            })
            .await;

        assert_eq!(summary.completed(), 1);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.failures[0].item_key, "MISSING");
        assert!(summary.failures[0].message.contains("not found"));
        assert_eq!(seen, vec![(0, "MISSING".to_string()), (1, "ITEM1".to_string())]);
    }
}
