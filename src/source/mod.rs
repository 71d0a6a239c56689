//! Zotero data access with ordered backend fallback.
//!
//! Two backends feed the export pipeline:
//!
//! - [`ZoteroDatabase`] - the local `zotero.sqlite`, opened read-only and
//!   immutable (primary)
//! - [`LocalApi`] - Zotero's local HTTP API (secondary)
//!
//! [`AnnotationSource`] combines them with [`first_success`]: each operation
//! tries the database first and the local API second, and reports every
//! underlying failure when both fail.
//!
//! # Example
//!
//! ```no_run
//! use zotero_export_core::source::{AnnotationSource, HttpTimeouts, LocalApi, ZoteroDatabase};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let api = LocalApi::new("http://127.0.0.1:23119", None, HttpTimeouts::default())?;
//! let source = AnnotationSource::new(ZoteroDatabase::locate().ok(), api);
//! let signal = source.check_liveness().await?;
//! println!("Zotero reachable via {signal}");
//! # Ok(())
//! # }
//! ```

mod database;
mod error;
mod fallback;
mod http_client;
mod local_api;
mod normalize;

pub use database::{
    BBT_SQLITE_ENV, LibraryScope, SEARCH_LIMIT, ZOTERO_SQLITE_ENV, ZoteroDatabase,
    cache_candidates,
};
pub use error::SourceError;
pub use fallback::{Strategy, first_success};
pub use http_client::{API_KEY_HEADER, HttpTimeouts, ReqwestTransport, Transport};
pub use local_api::{DEFAULT_BASE_URL, LocalApi};

use std::fmt;

use async_trait::async_trait;
use futures_util::FutureExt;
use indexmap::IndexMap;
use tracing::{debug, instrument};

use crate::item::{Annotation, Item, ItemSummary, filter_search_results};

/// Backend operations the export pipeline depends on.
///
/// # Object Safety
///
/// Uses `async_trait` so the exporter can hold `Arc<dyn ItemSource>`.
#[async_trait]
pub trait ItemSource: Send + Sync {
    /// Loads an item with its metadata fields and creators.
    async fn get_item(&self, item_key: &str) -> Result<Item, SourceError>;

    /// Loads the item's annotations, deduplicated, with reconciled sort indices.
    async fn get_annotations(&self, item_key: &str) -> Result<Vec<Annotation>, SourceError>;

    /// Fetches the rendered image of a selected-area annotation.
    ///
    /// `None` means no backend had the image; it is not an error.
    async fn annotation_image(
        &self,
        annotation_key: &str,
        attachment_key: Option<&str>,
    ) -> Option<Vec<u8>>;

    /// Looks up a citation key from a secondary service (Better BibTeX).
    async fn lookup_citation_key(&self, item_key: &str) -> Option<String>;
}

/// Which liveness probe succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessSignal {
    /// `connector/ping` answered.
    Ping,
    /// An `items?limit=1` listing answered.
    Listing,
    /// The local database answered `SELECT 1`.
    Database,
}

impl fmt::Display for LivenessSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Ping => "connector ping",
            Self::Listing => "local API item listing",
            Self::Database => "local database",
        };
        f.write_str(text)
    }
}

/// Merges annotations by key, keeping the first-discovered record.
///
/// `sort_index` is reassigned from first-seen order; later rediscoveries are
/// dropped without changing it.
#[must_use]
pub fn merge_annotations(discovered: impl IntoIterator<Item = Annotation>) -> Vec<Annotation> {
    let mut merged: IndexMap<String, Annotation> = IndexMap::new();
    for annotation in discovered {
        merged.entry(annotation.key.clone()).or_insert(annotation);
    }
    merged
        .into_values()
        .enumerate()
        .map(|(sort_index, mut annotation)| {
            annotation.sort_index = sort_index;
            annotation
        })
        .collect()
}

/// Database-first, local-API-second access to Zotero.
#[derive(Debug, Clone)]
pub struct AnnotationSource {
    database: Option<ZoteroDatabase>,
    local_api: LocalApi,
}

impl AnnotationSource {
    /// Creates a source; without a database only the local API is used.
    #[must_use]
    pub fn new(database: Option<ZoteroDatabase>, local_api: LocalApi) -> Self {
        Self {
            database,
            local_api,
        }
    }

    /// The local database backend, when configured.
    #[must_use]
    pub fn database(&self) -> Option<&ZoteroDatabase> {
        self.database.as_ref()
    }

    /// The local API backend.
    #[must_use]
    pub fn local_api(&self) -> &LocalApi {
        &self.local_api
    }

    /// Searches items by title, creators, or year.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::BackendUnavailable`] when every backend fails.
    #[instrument(skip(self))]
    pub async fn search_items(&self, query: &str) -> Result<Vec<ItemSummary>, SourceError> {
        let mut strategies = Vec::with_capacity(2);
        if let Some(db) = &self.database {
            strategies.push(Strategy::new("database", db.search_items(query).boxed()));
        }
        strategies.push(Strategy::new(
            "local api",
            self.local_api.search_items(query).boxed(),
        ));
        let results = first_success("search items", strategies).await?;
        Ok(filter_search_results(results))
    }

    /// Reports which probe shows Zotero is reachable.
    ///
    /// Tried in order: connector ping, item listing, database `SELECT 1`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::BackendUnavailable`] when every probe fails.
    #[instrument(skip(self))]
    pub async fn check_liveness(&self) -> Result<LivenessSignal, SourceError> {
        let mut strategies = vec![
            Strategy::new(
                "connector ping",
                self.local_api
                    .ping()
                    .map(|result| result.map(|()| LivenessSignal::Ping))
                    .boxed(),
            ),
            Strategy::new(
                "item listing",
                self.local_api
                    .probe_listing()
                    .map(|result| result.map(|()| LivenessSignal::Listing))
                    .boxed(),
            ),
        ];
        let database_probe = match &self.database {
            Some(db) => db
                .ping()
                .map(|result| result.map(|()| LivenessSignal::Database))
                .boxed(),
            None => async {
                Err::<LivenessSignal, _>(SourceError::database_unavailable(
                    "no database path configured",
                ))
            }
            .boxed(),
        };
        strategies.push(Strategy::new("database", database_probe));
        first_success("liveness check", strategies).await
    }
}

#[async_trait]
impl ItemSource for AnnotationSource {
    async fn get_item(&self, item_key: &str) -> Result<Item, SourceError> {
        let mut strategies = Vec::with_capacity(2);
        if let Some(db) = &self.database {
            strategies.push(Strategy::new("database", db.get_item(item_key).boxed()));
        }
        strategies.push(Strategy::new(
            "local api",
            self.local_api.get_item(item_key).boxed(),
        ));
        first_success("get item", strategies).await
    }

    async fn get_annotations(&self, item_key: &str) -> Result<Vec<Annotation>, SourceError> {
        let mut strategies = Vec::with_capacity(2);
        if let Some(db) = &self.database {
            strategies.push(Strategy::new(
                "database",
                db.get_annotations(item_key).boxed(),
            ));
        }
        strategies.push(Strategy::new(
            "local api",
            self.local_api.get_annotations(item_key).boxed(),
        ));
        first_success("get annotations", strategies).await
    }

    async fn annotation_image(
        &self,
        annotation_key: &str,
        attachment_key: Option<&str>,
    ) -> Option<Vec<u8>> {
        if let Some(bytes) = self
            .local_api
            .annotation_image(annotation_key, attachment_key)
            .await
        {
            return Some(bytes);
        }

        let db = self.database.as_ref()?;
        match db.cached_annotation_image(annotation_key).await {
            Ok(found) => found,
            Err(error) => {
                debug!(
                    annotation = annotation_key,
                    error = %error,
                    "Annotation image cache lookup failed"
                );
                None
            }
        }
    }

    async fn lookup_citation_key(&self, item_key: &str) -> Option<String> {
        let mut strategies = Vec::with_capacity(2);
        if let Some(db) = &self.database {
            strategies.push(Strategy::new(
                "better bibtex database",
                async move {
                    db.better_bibtex_key(item_key)
                        .await?
                        .ok_or_else(|| SourceError::not_found("citation key", item_key))
                }
                .boxed(),
            ));
        }
        strategies.push(Strategy::new(
            "better bibtex json-rpc",
            async move {
                self.local_api
                    .citation_key(item_key)
                    .await?
                    .ok_or_else(|| SourceError::not_found("citation key", item_key))
            }
            .boxed(),
        ));

        match first_success("citation key lookup", strategies).await {
            Ok(key) => Some(key),
            Err(error) => {
                debug!(item = item_key, error = %error, "No Better BibTeX citation key");
                None
            }
        }
    }
}
