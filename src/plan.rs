//! Export planning: where files go and how annotations are grouped.
//!
//! Planning is pure. It decides the Markdown and image paths, orders the
//! annotations, assigns image ordinals, and groups by color; nothing is read
//! from or written to disk.

use serde::Serialize;

use crate::item::{Annotation, Item, extract_year, join_creators};
use crate::paths::{attachment_dir, join_path, markdown_path, relative_path};

/// Fields consulted in order for the company / venue line.
pub const COMPANY_FIELDS: [&str; 4] = ["publisher", "institution", "company", "university"];

/// Inputs of [`prepare_export_plan`].
#[derive(Debug, Clone, Copy)]
pub struct PlanInput<'a> {
    /// Directory receiving `@{cite_key}.md`.
    pub markdown_dir: &'a str,
    /// Base directory receiving `attachment/{cite_key}/`.
    pub attachment_base_dir: &'a str,
    /// Resolved citation key.
    pub cite_key: &'a str,
    /// The exported item.
    pub item: &'a Item,
    /// The item's annotations, deduplicated.
    pub annotations: &'a [Annotation],
}

/// An annotation prepared for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedAnnotation {
    /// Annotation key.
    pub key: String,
    /// Attachment key.
    pub attachment_key: String,
    /// Trimmed text.
    pub text: String,
    /// Trimmed comment.
    pub comment: String,
    /// Trimmed page label.
    pub page_label: String,
    /// Selected-area annotation.
    pub is_image: bool,
    /// Image path relative to the Markdown file's directory.
    pub image_path: Option<String>,
    /// Explanation shown when the image could not be obtained.
    pub missing_image: Option<String>,
}

/// Annotations sharing one color, in presentation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorGroup {
    /// Canonical color name.
    pub color_name: String,
    /// Annotations in ascending `sort_index` order.
    pub annotations: Vec<PlannedAnnotation>,
}

/// Destination of one selected-area image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImagePlan {
    /// Annotation key.
    pub annotation_key: String,
    /// Attachment key, used by the image endpoints.
    pub attachment_key: String,
    /// `image_{n}.png`.
    pub file_name: String,
    /// Full destination path.
    pub absolute_path: String,
    /// Path relative to the Markdown file's directory.
    pub relative_path: String,
}

/// Everything needed to render and write one item's note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportPlan {
    /// Zotero item key.
    pub item_key: String,
    /// Resolved citation key.
    pub cite_key: String,
    /// Destination of the Markdown file.
    pub markdown_path: String,
    /// Directory holding the item's images.
    pub attachment_dir: String,
    /// Item title.
    pub title: String,
    /// Creators joined with `"; "`.
    pub author: String,
    /// Four-digit year, or empty.
    pub year: String,
    /// Publisher or institution.
    pub company: String,
    /// Abstract, line breaks preserved.
    pub abstract_note: String,
    /// Color groups in first-occurrence order.
    pub groups: Vec<ColorGroup>,
    /// Images to fetch and write.
    pub images: Vec<ImagePlan>,
}

impl ExportPlan {
    /// Records that an image could not be obtained.
    ///
    /// The annotation keeps its place in the document; its image link is
    /// replaced by `message` and its entry leaves [`ExportPlan::images`].
    #[must_use]
    pub fn with_missing_image(mut self, annotation_key: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        for annotation in self
            .groups
            .iter_mut()
            .flat_map(|group| group.annotations.iter_mut())
            .filter(|annotation| annotation.key == annotation_key)
        {
            annotation.image_path = None;
            annotation.missing_image = Some(message.clone());
        }
        self.images
            .retain(|image| image.annotation_key != annotation_key);
        self
    }

    /// Total number of planned annotations.
    #[must_use]
    pub fn annotation_count(&self) -> usize {
        self.groups.iter().map(|group| group.annotations.len()).sum()
    }

    /// Number of annotations carrying a missing-image message.
    #[must_use]
    pub fn missing_image_count(&self) -> usize {
        self.groups
            .iter()
            .flat_map(|group| &group.annotations)
            .filter(|annotation| annotation.missing_image.is_some())
            .count()
    }
}

/// Builds the export plan for one item.
#[must_use]
pub fn prepare_export_plan(input: PlanInput<'_>) -> ExportPlan {
    let markdown_path = markdown_path(input.markdown_dir, input.cite_key);
    let attachment_dir = attachment_dir(input.attachment_base_dir, input.cite_key);

    let mut ordered: Vec<&Annotation> = input.annotations.iter().collect();
    ordered.sort_by_key(|annotation| annotation.sort_index);

    let mut groups: Vec<ColorGroup> = Vec::new();
    let mut images: Vec<ImagePlan> = Vec::new();

    for annotation in ordered {
        let mut planned = PlannedAnnotation {
            key: annotation.key.clone(),
            attachment_key: annotation.attachment_key.clone(),
            text: annotation.text.trim().to_string(),
            comment: annotation.comment.trim().to_string(),
            page_label: annotation.page_label.trim().to_string(),
            is_image: annotation.is_image,
            image_path: None,
            missing_image: None,
        };

        if annotation.is_image {
            let file_name = format!("image_{}.png", images.len() + 1);
            let absolute_path = join_path(&[&attachment_dir, &file_name]);
            let relative = relative_path(&markdown_path, &absolute_path);
            planned.image_path = Some(relative.clone());
            images.push(ImagePlan {
                annotation_key: annotation.key.clone(),
                attachment_key: annotation.attachment_key.clone(),
                file_name,
                absolute_path,
                relative_path: relative,
            });
        }

        match groups
            .iter_mut()
            .find(|group| group.color_name == annotation.color_name)
        {
            Some(group) => group.annotations.push(planned),
            None => groups.push(ColorGroup {
                color_name: annotation.color_name.clone(),
                annotations: vec![planned],
            }),
        }
    }

    let item = input.item;
    ExportPlan {
        item_key: item.key.clone(),
        cite_key: input.cite_key.to_string(),
        markdown_path,
        attachment_dir,
        title: collapse_whitespace(item.field("title").unwrap_or_default()),
        author: collapse_whitespace(&join_creators(&item.creators)),
        year: extract_year(item.field("date").unwrap_or_default()),
        company: collapse_whitespace(
            COMPANY_FIELDS
                .iter()
                .find_map(|name| item.field(name))
                .unwrap_or_default(),
        ),
        abstract_note: item.field("abstractNote").unwrap_or_default().to_string(),
        groups,
        images,
    }
}

/// Collapses runs of whitespace (including line breaks) to single spaces.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
