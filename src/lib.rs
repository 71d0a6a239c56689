//! Zotero Export Core Library
//!
//! Exports a Zotero item's PDF annotations into a deterministic Markdown note,
//! grouped by highlight color, with selected-area images saved alongside.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`color`] - Highlight color names and section order
//! - [`paths`] - Output path planning and relative paths
//! - [`item`] - Normalized items, creators, and annotations
//! - [`citekey`] - Citation key resolution from item metadata
//! - [`source`] - Zotero database and local API backends with fallback
//! - [`plan`] - Export planning (paths, image ordinals, color groups)
//! - [`template`] - Template settings and frontmatter codec
//! - [`render`] - Markdown rendering
//! - [`export`] - Per-item export orchestration
//! - [`settings`] - Persistent user settings

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod citekey;
pub mod color;
pub mod export;
pub mod item;
pub mod paths;
pub mod plan;
pub mod render;
pub mod settings;
pub mod source;
pub mod template;

// Re-export commonly used types
pub use citekey::{CiteKeyError, resolve_cite_key};
pub use color::{color_name, compare_color_names};
pub use export::{ExportError, ExportOptions, ExportSummary, Exporter, ItemFailure, ItemOutcome};
pub use item::{Annotation, Creator, Item, ItemSummary};
pub use plan::{ExportPlan, PlanInput, prepare_export_plan};
pub use render::render_markdown;
pub use settings::{AppSettings, SettingsError, default_settings_path};
pub use source::{
    AnnotationSource, HttpTimeouts, ItemSource, LivenessSignal, LocalApi, SourceError,
    ZoteroDatabase,
};
pub use template::{TemplateSettings, sanitize_property_order};
