//! Read-only access to the local Zotero SQLite database.
//!
//! The database is opened read-only with SQLite's `immutable` flag so reads
//! neither take nor wait for locks held by a running Zotero instance. Every
//! query excludes items in the trash (`deletedItems`).
//!
//! # Example
//!
//! ```no_run
//! use zotero_export_core::source::ZoteroDatabase;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = ZoteroDatabase::locate()?;
//! let annotations = db.get_annotations("ABCD2345").await?;
//! println!("{} annotations", annotations.len());
//! # Ok(())
//! # }
//! ```

use std::env;
use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, instrument};

use crate::item::{Annotation, Creator, Item, ItemSummary, extract_year};

use super::SourceError;

/// Environment variable overriding the `zotero.sqlite` location.
pub const ZOTERO_SQLITE_ENV: &str = "ZOTERO_SQLITE_PATH";
/// Environment variable overriding the `better-bibtex.sqlite` location.
pub const BBT_SQLITE_ENV: &str = "ZOTERO_BBT_SQLITE_PATH";

/// Maximum number of search rows returned.
pub const SEARCH_LIMIT: i64 = 75;

/// `itemAnnotations.type` value of selected-area annotations.
const IMAGE_ANNOTATION_TYPE: i64 = 3;

/// Zotero data directory names probed under `$HOME`.
const DATA_DIR_NAMES: [&str; 2] = ["Zotero", "Zotero Beta"];

const SEARCH_SQL: &str = r"
    WITH title_data AS (
        SELECT d.itemID AS itemID, CAST(v.value AS TEXT) AS value
        FROM itemData d
        JOIN fields f ON f.fieldID = d.fieldID
        JOIN itemDataValues v ON v.valueID = d.valueID
        WHERE f.fieldName = 'title'
    ),
    date_data AS (
        SELECT d.itemID AS itemID, CAST(v.value AS TEXT) AS value
        FROM itemData d
        JOIN fields f ON f.fieldID = d.fieldID
        JOIN itemDataValues v ON v.valueID = d.valueID
        WHERE f.fieldName = 'date'
    ),
    creator_data AS (
        SELECT
            ic.itemID AS itemID,
            GROUP_CONCAT(
                CASE
                    WHEN c.fieldMode = 1 THEN COALESCE(c.lastName, '')
                    ELSE TRIM(
                        COALESCE(c.lastName, '') ||
                        CASE WHEN COALESCE(c.firstName, '') <> '' THEN ', ' || c.firstName ELSE '' END
                    )
                END,
                '; '
            ) AS value
        FROM (SELECT * FROM itemCreators ORDER BY itemID, orderIndex) ic
        JOIN creators c ON c.creatorID = ic.creatorID
        GROUP BY ic.itemID
    )
    SELECT
        i.key,
        COALESCE(title_data.value, '') AS title,
        COALESCE(creator_data.value, '') AS creators,
        COALESCE(date_data.value, '') AS dateValue,
        it.typeName
    FROM items i
    JOIN itemTypes it ON it.itemTypeID = i.itemTypeID
    LEFT JOIN title_data ON title_data.itemID = i.itemID
    LEFT JOIN date_data ON date_data.itemID = i.itemID
    LEFT JOIN creator_data ON creator_data.itemID = i.itemID
    WHERE
        it.typeName NOT IN ('attachment', 'note', 'annotation')
        AND i.itemID NOT IN (SELECT itemID FROM deletedItems)
        AND (
            ?1 = ''
            OR LOWER(COALESCE(title_data.value, '')) LIKE '%' || LOWER(?1) || '%'
            OR LOWER(COALESCE(creator_data.value, '')) LIKE '%' || LOWER(?1) || '%'
            OR LOWER(COALESCE(date_data.value, '')) LIKE '%' || LOWER(?1) || '%'
        )
    ORDER BY LOWER(COALESCE(title_data.value, '')) ASC
    LIMIT ?2
";

const ITEM_SQL: &str = r"
    SELECT i.itemID, i.key, it.typeName
    FROM items i
    JOIN itemTypes it ON it.itemTypeID = i.itemTypeID
    WHERE i.key = ?1
      AND i.itemID NOT IN (SELECT itemID FROM deletedItems)
    LIMIT 1
";

const FIELDS_SQL: &str = r"
    SELECT f.fieldName, CAST(v.value AS TEXT) AS fieldValue
    FROM itemData d
    JOIN fields f ON f.fieldID = d.fieldID
    JOIN itemDataValues v ON v.valueID = d.valueID
    WHERE d.itemID = ?1
";

const CREATORS_SQL: &str = r"
    SELECT c.firstName, c.lastName, c.fieldMode
    FROM itemCreators ic
    JOIN creators c ON c.creatorID = ic.creatorID
    WHERE ic.itemID = ?1
    ORDER BY ic.orderIndex ASC
";

const ANNOTATIONS_SQL: &str = r"
    SELECT
        anno.key,
        att.key,
        COALESCE(ia.color, ''),
        COALESCE(ia.text, ''),
        COALESCE(ia.comment, ''),
        COALESCE(ia.pageLabel, ''),
        ia.type
    FROM items root
    JOIN itemAttachments iatt ON iatt.parentItemID = root.itemID
    JOIN items att ON att.itemID = iatt.itemID
    JOIN itemAnnotations ia ON ia.parentItemID = att.itemID
    JOIN items anno ON anno.itemID = ia.itemID
    WHERE root.key = ?1
      AND anno.itemID NOT IN (SELECT itemID FROM deletedItems)
    ORDER BY att.itemID ASC, ia.sortIndex ASC, anno.itemID ASC
";

const LIBRARY_SCOPE_SQL: &str = r"
    SELECT l.type, g.groupID
    FROM items i
    JOIN libraries l ON l.libraryID = i.libraryID
    LEFT JOIN groups g ON g.libraryID = l.libraryID
    WHERE i.key = ?1
    LIMIT 1
";

const CITATION_KEY_SQL: &str = r"
    SELECT citationKey
    FROM citationkey
    WHERE itemKey = ?1
    LIMIT 1
";

/// Library an item lives in, used to locate rendered-annotation cache files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryScope {
    /// The user's personal library.
    User,
    /// A group library.
    Group(i64),
}

/// Handle on the local Zotero database files.
#[derive(Debug, Clone)]
pub struct ZoteroDatabase {
    sqlite_path: PathBuf,
    better_bibtex_path: Option<PathBuf>,
}

impl ZoteroDatabase {
    /// Uses the given `zotero.sqlite`; Better BibTeX is looked up next to it.
    #[must_use]
    pub fn new(sqlite_path: impl Into<PathBuf>) -> Self {
        let sqlite_path = sqlite_path.into();
        let better_bibtex_path = sqlite_path
            .parent()
            .map(|dir| dir.join("better-bibtex.sqlite"));
        Self {
            sqlite_path,
            better_bibtex_path,
        }
    }

    /// Overrides the Better BibTeX database location.
    #[must_use]
    pub fn with_better_bibtex(mut self, path: impl Into<PathBuf>) -> Self {
        self.better_bibtex_path = Some(path.into());
        self
    }

    /// Locates the database from the environment or the default data directories.
    ///
    /// Priority:
    /// 1. `$ZOTERO_SQLITE_PATH`
    /// 2. `$HOME/Zotero/zotero.sqlite`
    /// 3. `$HOME/Zotero Beta/zotero.sqlite`
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::DatabaseUnavailable`] when no candidate exists.
    pub fn locate() -> Result<Self, SourceError> {
        let mut candidates = Vec::new();
        if let Some(path) = env_path(ZOTERO_SQLITE_ENV) {
            candidates.push(path);
        }
        if let Some(home) = env_path("HOME") {
            candidates.extend(
                DATA_DIR_NAMES
                    .iter()
                    .map(|dir| home.join(dir).join("zotero.sqlite")),
            );
        }

        let sqlite_path = candidates
            .into_iter()
            .find(|path| path.exists())
            .ok_or_else(|| SourceError::database_unavailable("could not locate zotero.sqlite"))?;

        let mut db = Self::new(sqlite_path);
        if let Some(bbt) = env_path(BBT_SQLITE_ENV).filter(|path| path.exists()) {
            db = db.with_better_bibtex(bbt);
        }
        Ok(db)
    }

    /// Path of `zotero.sqlite`.
    #[must_use]
    pub fn sqlite_path(&self) -> &Path {
        &self.sqlite_path
    }

    /// Zotero profile (data) directory containing `zotero.sqlite`.
    #[must_use]
    pub fn profile_dir(&self) -> PathBuf {
        self.sqlite_path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    }

    async fn connect(&self) -> Result<SqlitePool, SourceError> {
        open_immutable(&self.sqlite_path).await
    }

    /// Runs a trivial query to check the database can be read.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the database cannot be opened or queried.
    #[instrument(skip(self), fields(path = %self.sqlite_path.display()))]
    pub async fn ping(&self) -> Result<(), SourceError> {
        let pool = self.connect().await?;
        let result: Result<(i64,), sqlx::Error> =
            sqlx::query_as("SELECT 1").fetch_one(&pool).await;
        pool.close().await;
        result
            .map(|_| ())
            .map_err(|error| SourceError::database("ping", &error))
    }

    /// Searches top-level items by title, creators, or date.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the database cannot be opened or queried.
    #[instrument(skip(self))]
    pub async fn search_items(&self, query: &str) -> Result<Vec<ItemSummary>, SourceError> {
        let pool = self.connect().await?;
        let rows: Result<Vec<(String, String, String, String, String)>, sqlx::Error> =
            sqlx::query_as(SEARCH_SQL)
                .bind(query.trim())
                .bind(SEARCH_LIMIT)
                .fetch_all(&pool)
                .await;
        pool.close().await;
        let rows = rows.map_err(|error| SourceError::database("search items", &error))?;

        debug!(rows = rows.len(), "Database search complete");
        Ok(rows
            .into_iter()
            .map(|(key, title, creators, date, item_type)| ItemSummary {
                key,
                title,
                creators,
                year: extract_year(&date),
                item_type,
            })
            .collect())
    }

    /// Loads an item with its fields and creators.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::NotFound`] for unknown or trashed items, and
    /// other [`SourceError`] variants for database failures.
    #[instrument(skip(self))]
    pub async fn get_item(&self, item_key: &str) -> Result<Item, SourceError> {
        let pool = self.connect().await?;
        let result = load_item(&pool, item_key).await;
        pool.close().await;
        result
    }

    /// Loads all annotations of the item's attachments in presentation order.
    ///
    /// Rows are ordered by attachment, Zotero sort index, then annotation id,
    /// and numbered from zero in that order.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::NotFound`] when the parent item is unknown or
    /// trashed, so other backends get a chance to serve it.
    #[instrument(skip(self))]
    pub async fn get_annotations(&self, item_key: &str) -> Result<Vec<Annotation>, SourceError> {
        let pool = self.connect().await?;
        let rows = load_annotation_rows(&pool, item_key).await;
        pool.close().await;
        let rows = rows?;

        let annotations: Vec<Annotation> = rows
            .into_iter()
            .enumerate()
            .map(
                |(sort_index, (key, attachment_key, color, text, comment, page, kind))| {
                    let annotation = Annotation::new(key, attachment_key, &color, sort_index)
                        .with_text(text.trim())
                        .with_comment(comment.trim())
                        .with_page_label(page.trim());
                    if kind == IMAGE_ANNOTATION_TYPE {
                        annotation.as_image()
                    } else {
                        annotation
                    }
                },
            )
            .collect();

        debug!(count = annotations.len(), "Loaded annotations from database");
        Ok(annotations)
    }

    /// Returns the library an item belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the item is unknown or the query fails.
    pub async fn library_scope(&self, item_key: &str) -> Result<LibraryScope, SourceError> {
        let pool = self.connect().await?;
        let row: Result<Option<(String, Option<i64>)>, sqlx::Error> =
            sqlx::query_as(LIBRARY_SCOPE_SQL)
                .bind(item_key)
                .fetch_optional(&pool)
                .await;
        pool.close().await;

        match row.map_err(|error| SourceError::database("library scope", &error))? {
            Some((library_type, Some(group_id))) if library_type == "group" => {
                Ok(LibraryScope::Group(group_id))
            }
            Some(_) => Ok(LibraryScope::User),
            None => Err(SourceError::not_found("item", item_key)),
        }
    }

    /// Reads Zotero's rendered image for a selected-area annotation, if cached.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the library lookup fails or a cache file
    /// exists but cannot be read.
    #[instrument(skip(self))]
    pub async fn cached_annotation_image(
        &self,
        annotation_key: &str,
    ) -> Result<Option<Vec<u8>>, SourceError> {
        let scope = self.library_scope(annotation_key).await?;
        for candidate in cache_candidates(&self.profile_dir(), &scope, annotation_key) {
            if !candidate.exists() {
                continue;
            }
            let bytes = tokio::fs::read(&candidate).await.map_err(|error| {
                SourceError::database_unavailable(format!(
                    "failed to read cached annotation image {}: {error}",
                    candidate.display()
                ))
            })?;
            if !bytes.is_empty() {
                debug!(path = %candidate.display(), "Using cached annotation image");
                return Ok(Some(bytes));
            }
        }
        Ok(None)
    }

    /// Looks up the Better BibTeX citation key of an item.
    ///
    /// Returns `Ok(None)` when the Better BibTeX database is absent or has no
    /// entry for the item.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the database exists but cannot be queried.
    #[instrument(skip(self))]
    pub async fn better_bibtex_key(&self, item_key: &str) -> Result<Option<String>, SourceError> {
        let Some(path) = self
            .better_bibtex_path
            .as_deref()
            .filter(|path| path.exists())
        else {
            debug!("Better BibTeX database not found");
            return Ok(None);
        };

        let pool = open_immutable(path).await?;
        let row: Result<Option<(String,)>, sqlx::Error> = sqlx::query_as(CITATION_KEY_SQL)
            .bind(item_key)
            .fetch_optional(&pool)
            .await;
        pool.close().await;

        Ok(row
            .map_err(|error| SourceError::database("better bibtex key", &error))?
            .map(|(key,)| key.trim().to_string())
            .filter(|key| !key.is_empty()))
    }
}

async fn open_immutable(path: &Path) -> Result<SqlitePool, SourceError> {
    if !path.exists() {
        return Err(SourceError::database_unavailable(format!(
            "{} does not exist",
            path.display()
        )));
    }
    let options = SqliteConnectOptions::new()
        .filename(path)
        .read_only(true)
        .immutable(true);
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(|error| {
            SourceError::database_unavailable(format!(
                "failed to open {}: {error}",
                path.display()
            ))
        })
}

type AnnotationRow = (String, String, String, String, String, String, i64);

async fn load_annotation_rows(
    pool: &SqlitePool,
    item_key: &str,
) -> Result<Vec<AnnotationRow>, SourceError> {
    let header: Option<(i64, String, String)> = sqlx::query_as(ITEM_SQL)
        .bind(item_key)
        .fetch_optional(pool)
        .await
        .map_err(|error| SourceError::database("item", &error))?;
    if header.is_none() {
        return Err(SourceError::not_found("item", item_key));
    }

    sqlx::query_as(ANNOTATIONS_SQL)
        .bind(item_key)
        .fetch_all(pool)
        .await
        .map_err(|error| SourceError::database("annotations", &error))
}

async fn load_item(pool: &SqlitePool, item_key: &str) -> Result<Item, SourceError> {
    let header: Option<(i64, String, String)> = sqlx::query_as(ITEM_SQL)
        .bind(item_key)
        .fetch_optional(pool)
        .await
        .map_err(|error| SourceError::database("item", &error))?;
    let Some((item_id, key, item_type)) = header else {
        return Err(SourceError::not_found("item", item_key));
    };

    let mut item = Item::new(key, item_type);

    let fields: Vec<(String, Option<String>)> = sqlx::query_as(FIELDS_SQL)
        .bind(item_id)
        .fetch_all(pool)
        .await
        .map_err(|error| SourceError::database("item fields", &error))?;
    for (name, value) in fields {
        item.fields.insert(name, value.unwrap_or_default());
    }

    let creators: Vec<(Option<String>, Option<String>, i64)> = sqlx::query_as(CREATORS_SQL)
        .bind(item_id)
        .fetch_all(pool)
        .await
        .map_err(|error| SourceError::database("item creators", &error))?;
    item.creators = creators
        .into_iter()
        .map(|(first, last, field_mode)| {
            if field_mode == 1 {
                Creator::Single {
                    name: last.unwrap_or_default(),
                }
            } else {
                Creator::Structured {
                    last: last.unwrap_or_default(),
                    first: first.unwrap_or_default(),
                }
            }
        })
        .collect();

    Ok(item)
}

/// Cache file candidates for a rendered annotation image, in lookup order.
#[must_use]
pub fn cache_candidates(
    profile_dir: &Path,
    scope: &LibraryScope,
    annotation_key: &str,
) -> Vec<PathBuf> {
    let file_name = format!("{annotation_key}.png");
    let cache = profile_dir.join("cache");
    let mut candidates = vec![cache.join("library").join(&file_name)];
    if let LibraryScope::Group(group_id) = scope {
        let group_dir = cache.join("groups").join(group_id.to_string());
        candidates.push(group_dir.join(&file_name));
        candidates.push(group_dir.join("library").join(&file_name));
    }
    candidates
}

fn env_path(name: &str) -> Option<PathBuf> {
    env::var_os(name)
        .filter(|value| !value.is_empty())
        .map(|value| PathBuf::from(value.to_string_lossy().trim()))
}
