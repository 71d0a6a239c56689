//! Builds small Zotero and Better BibTeX databases on disk.

use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

const ZOTERO_SCHEMA: &str = r"
    CREATE TABLE libraries (libraryID INTEGER PRIMARY KEY, type TEXT NOT NULL);
    CREATE TABLE groups (groupID INTEGER PRIMARY KEY, libraryID INTEGER NOT NULL);
    CREATE TABLE itemTypes (itemTypeID INTEGER PRIMARY KEY, typeName TEXT NOT NULL);
    CREATE TABLE fields (fieldID INTEGER PRIMARY KEY, fieldName TEXT NOT NULL);
    CREATE TABLE items (
        itemID INTEGER PRIMARY KEY,
        itemTypeID INTEGER NOT NULL,
        libraryID INTEGER NOT NULL,
        key TEXT NOT NULL
    );
    CREATE TABLE deletedItems (itemID INTEGER PRIMARY KEY);
    CREATE TABLE itemDataValues (valueID INTEGER PRIMARY KEY, value);
    CREATE TABLE itemData (itemID INTEGER, fieldID INTEGER, valueID INTEGER);
    CREATE TABLE creators (
        creatorID INTEGER PRIMARY KEY,
        firstName TEXT,
        lastName TEXT,
        fieldMode INTEGER NOT NULL DEFAULT 0
    );
    CREATE TABLE itemCreators (
        itemID INTEGER,
        creatorID INTEGER,
        creatorTypeID INTEGER,
        orderIndex INTEGER
    );
    CREATE TABLE itemAttachments (itemID INTEGER PRIMARY KEY, parentItemID INTEGER);
    CREATE TABLE itemAnnotations (
        itemID INTEGER PRIMARY KEY,
        parentItemID INTEGER NOT NULL,
        type INTEGER NOT NULL,
        text TEXT,
        comment TEXT,
        color TEXT,
        pageLabel TEXT,
        sortIndex TEXT NOT NULL
    );

    INSERT INTO libraries VALUES (1, 'user'), (2, 'group');
    INSERT INTO groups VALUES (4242, 2);
    INSERT INTO itemTypes VALUES
        (1, 'journalArticle'), (2, 'attachment'), (3, 'annotation'), (4, 'note');
    INSERT INTO fields VALUES (1, 'title'), (2, 'date'), (3, 'extra'), (4, 'abstractNote');

    INSERT INTO items VALUES
        (1, 1, 1, 'ITEM0001'),
        (2, 2, 1, 'ATT00001'),
        (3, 1, 1, 'ITEM0002'),
        (4, 1, 1, 'ITEM0003'),
        (5, 1, 2, 'GRPITEM1'),
        (6, 2, 2, 'GRPATT01'),
        (10, 3, 1, 'ANN00001'),
        (11, 3, 1, 'ANN00002'),
        (12, 3, 1, 'ANN00003'),
        (13, 3, 1, 'ANN00004'),
        (20, 3, 2, 'GRPANN01');
    INSERT INTO deletedItems VALUES (4), (13);

    INSERT INTO itemDataValues VALUES
        (1, 'Attention Is All You Need'),
        (2, '2017-06-12'),
        (3, 'Deep Residual Learning'),
        (4, '2015'),
        (5, 'Attention In The Trash'),
        (6, 'Citation Key: vaswani2017attention'),
        (7, 'Zebra Group Paper');
    INSERT INTO itemData VALUES
        (1, 1, 1), (1, 2, 2), (1, 3, 6),
        (3, 1, 3), (3, 2, 4),
        (4, 1, 5),
        (5, 1, 7);

    INSERT INTO creators VALUES
        (1, 'Ashish', 'Vaswani', 0),
        (2, 'Noam', 'Shazeer', 0),
        (3, 'Kaiming', 'He', 0),
        (4, NULL, 'Google Brain', 1);
    INSERT INTO itemCreators VALUES
        (1, 1, 1, 0), (1, 2, 1, 1), (1, 4, 1, 2),
        (3, 3, 1, 0);

    INSERT INTO itemAttachments VALUES (2, 1), (6, 5);
    INSERT INTO itemAnnotations VALUES
        (10, 2, 1, ' second highlight ', '', '#5fb236', '4', '00001|000100|00200'),
        (11, 2, 1, 'first highlight', 'worth citing', '#FFD400', '3', '00000|000050|00100'),
        (12, 2, 3, NULL, '', '#2ea8e5', '5', '00002|000000|00000'),
        (13, 2, 1, 'trashed highlight', '', '#ffd400', '6', '00003|000000|00000'),
        (20, 6, 3, NULL, '', '#a28ae5', '1', '00000|000000|00000');
";

const BBT_SCHEMA: &str = r"
    CREATE TABLE citationkey (
        itemID INTEGER,
        itemKey TEXT NOT NULL,
        libraryID INTEGER,
        citationKey TEXT NOT NULL
    );
    INSERT INTO citationkey VALUES (3, 'ITEM0002', 1, 'he2016deep');
";

async fn build(path: &Path, script: &str) {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Delete);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();
    sqlx::raw_sql(script).execute(&pool).await.unwrap();
    pool.close().await;
}

/// Writes `zotero.sqlite` (and optionally `better-bibtex.sqlite`) into `profile_dir`.
///
/// Returns the `zotero.sqlite` path.
pub async fn build_profile(profile_dir: &Path, with_better_bibtex: bool) -> PathBuf {
    std::fs::create_dir_all(profile_dir).unwrap();
    let sqlite = profile_dir.join("zotero.sqlite");
    build(&sqlite, ZOTERO_SCHEMA).await;
    if with_better_bibtex {
        build(&profile_dir.join("better-bibtex.sqlite"), BBT_SCHEMA).await;
    }
    sqlite
}

/// Writes a rendered-annotation cache file relative to the profile's `cache/` directory.
pub fn write_cache_image(profile_dir: &Path, relative: &str, bytes: &[u8]) {
    let path = profile_dir.join("cache").join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, bytes).unwrap();
}
