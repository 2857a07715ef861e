//! SQLite-backed snippet store.
//!
//! The store is rebuilt from the markdown sources on every run and is only
//! read after [`ContentStore::populate`] returns.

use std::path::{Path, PathBuf};

use log::{debug, info};
use rusqlite::{ffi, params, Connection, Row};
use thiserror::Error;

use crate::metadata::{self, MetadataError, SnippetMetadata};

const SCHEMA: &str = "
    CREATE TABLE snips (
        snipName TEXT PRIMARY KEY,
        snipDate TEXT NOT NULL,
        longSnip INTEGER NOT NULL,
        published INTEGER NOT NULL,
        rawMd TEXT NOT NULL,
        upperMd TEXT
    );
    CREATE TABLE snipTags (
        snipName TEXT NOT NULL,
        snipTag TEXT NOT NULL,
        PRIMARY KEY (snipName, snipTag)
    );";

const PUBLISHED: &str = "
    SELECT snipName, longSnip, snipDate, COALESCE(upperMd, rawMd)
    FROM snips
    WHERE published = 1
    ORDER BY snipDate DESC, rowid ASC";

const PUBLISHED_BY_TAG: &str = "
    SELECT snips.snipName, snips.longSnip, snips.snipDate, COALESCE(snips.upperMd, snips.rawMd)
    FROM snips
    JOIN snipTags ON snips.snipName = snipTags.snipName
    WHERE snips.published = 1 AND snipTags.snipTag = ?1
    ORDER BY snips.snipDate DESC, snips.rowid ASC";

const DISTINCT_PUBLISHED_TAGS: &str = "
    SELECT DISTINCT snipTags.snipTag
    FROM snipTags
    JOIN snips ON snipTags.snipName = snips.snipName
    WHERE snips.published = 1
    ORDER BY snipTags.snipTag";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("while reading {path:?}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: MetadataError,
    },
    #[error("duplicate snippet name: {0}")]
    DuplicateName(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// One stored snippet: its metadata plus the raw markdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetRecord {
    pub meta: SnippetMetadata,
    pub full_body: String,
    /// Only set for long-form snippets.
    pub preview_body: Option<String>,
}

impl SnippetRecord {
    pub fn new(meta: SnippetMetadata, full_body: String) -> Self {
        let preview_body = meta
            .long_snip
            .then(|| metadata::preview_of(&full_body).to_string());
        Self {
            meta,
            full_body,
            preview_body,
        }
    }
}

/// Row shape shared by the home feed and tag pages. `body` is the preview for
/// long-form snippets and the full body otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedSnippet {
    pub name: String,
    pub long_snip: bool,
    pub date: String,
    pub body: String,
}

fn published_from_row(row: &Row<'_>) -> rusqlite::Result<PublishedSnippet> {
    Ok(PublishedSnippet {
        name: row.get(0)?,
        long_snip: row.get(1)?,
        date: row.get(2)?,
        body: row.get(3)?,
    })
}

pub struct ContentStore {
    conn: Connection,
}

impl ContentStore {
    /// Deletes whatever lives at `path` and creates an empty store there.
    pub fn create(path: &Path) -> Result<Self> {
        if path.exists() {
            debug!("Removing previous store {path:?}");
            std::fs::remove_file(path)?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Loads every `.md` file directly under `source_dir`. Nothing is kept if
    /// any of them fails.
    pub fn populate(&mut self, source_dir: &Path) -> Result<()> {
        let mut paths = vec![];
        for entry in std::fs::read_dir(source_dir)? {
            let entry = entry?;
            let path = entry.path();
            // follows symlinks; a dangling one is an error
            if std::fs::metadata(&path)?.is_file()
                && path.extension().is_some_and(|ext| ext == "md")
            {
                paths.push(path);
            }
        }
        // directory order is platform dependent
        paths.sort();

        let tx = self.conn.transaction()?;
        for path in paths.iter() {
            debug!("Loading {path:?}");
            let content = std::fs::read(path)?;
            let meta = metadata::extract(&metadata::snippet_name(path), &content).map_err(
                |source| StoreError::Metadata {
                    path: path.clone(),
                    source,
                },
            )?;
            let full_body = String::from_utf8(content)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            insert_record(&tx, &SnippetRecord::new(meta, full_body))?;
        }
        tx.commit()?;

        info!(
            "Loaded {} snippets with {} tag associations from {source_dir:?}",
            self.snippet_count()?,
            self.tag_association_count()?
        );
        Ok(())
    }

    pub fn insert(&self, record: &SnippetRecord) -> Result<()> {
        insert_record(&self.conn, record)
    }

    pub fn query_published(&self) -> Result<Vec<PublishedSnippet>> {
        let mut stmt = self.conn.prepare(PUBLISHED)?;
        let rows = stmt
            .query_map([], published_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn query_published_by_tag(&self, tag: &str) -> Result<Vec<PublishedSnippet>> {
        let mut stmt = self.conn.prepare(PUBLISHED_BY_TAG)?;
        let rows = stmt
            .query_map(params![tag], published_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Tags of one snippet, in header order.
    pub fn query_tags(&self, name: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT snipTag FROM snipTags WHERE snipName = ?1 ORDER BY rowid")?;
        let tags = stmt
            .query_map(params![name], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(tags)
    }

    /// Tags carried by at least one published snippet, sorted.
    pub fn query_distinct_published_tags(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(DISTINCT_PUBLISHED_TAGS)?;
        let tags = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(tags)
    }

    pub fn query_full_body(&self, name: &str) -> Result<String> {
        Ok(self.conn.query_row(
            "SELECT rawMd FROM snips WHERE snipName = ?1",
            params![name],
            |row| row.get(0),
        )?)
    }

    /// Every stored snippet in insertion order.
    pub fn records(&self) -> Result<Vec<SnippetRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT snipName, snipDate, longSnip, published, rawMd, upperMd
             FROM snips ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, bool>(2)?,
                    row.get::<_, bool>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut records = Vec::with_capacity(rows.len());
        for (name, date, long_snip, published, full_body, preview_body) in rows {
            let tags = self.query_tags(&name)?;
            records.push(SnippetRecord {
                meta: SnippetMetadata {
                    name,
                    date,
                    long_snip,
                    published,
                    tags,
                },
                full_body,
                preview_body,
            });
        }
        Ok(records)
    }

    pub fn snippet_count(&self) -> Result<usize> {
        count(&self.conn, "SELECT COUNT(*) FROM snips")
    }

    pub fn tag_association_count(&self) -> Result<usize> {
        count(&self.conn, "SELECT COUNT(*) FROM snipTags")
    }
}

fn count(conn: &Connection, sql: &str) -> Result<usize> {
    let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
    Ok(n as usize)
}

fn insert_record(conn: &Connection, record: &SnippetRecord) -> Result<()> {
    let meta = &record.meta;
    let inserted = conn.execute(
        "INSERT INTO snips (snipName, snipDate, longSnip, published, rawMd, upperMd)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            meta.name,
            meta.date,
            meta.long_snip,
            meta.published,
            record.full_body,
            record.preview_body,
        ],
    );
    match inserted {
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            return Err(StoreError::DuplicateName(meta.name.clone()));
        }
        other => {
            other?;
        }
    }

    for tag in meta.tags.iter() {
        conn.execute(
            "INSERT INTO snipTags (snipName, snipTag) VALUES (?1, ?2)",
            params![meta.name, tag],
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, date: &str, long_snip: bool, published: bool, tags: &[&str]) -> SnippetRecord {
        SnippetRecord::new(
            SnippetMetadata {
                name: name.to_string(),
                date: date.to_string(),
                long_snip,
                published,
                tags: tags.iter().map(|t| t.to_string()).collect(),
            },
            format!("[//]: # ({{}})\nbody of {name}\n[//]: # (break)\nrest of {name}\n"),
        )
    }

    fn names(rows: &[PublishedSnippet]) -> Vec<&str> {
        rows.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn preview_only_for_long_form() {
        let short = record("short", "2024-01-01", false, true, &[]);
        assert_eq!(short.preview_body, None);

        let long = record("long", "2024-01-01", true, true, &[]);
        assert_eq!(
            long.preview_body.as_deref(),
            Some("[//]: # ({})\nbody of long\n")
        );
    }

    #[test]
    fn published_sorted_by_date_desc() {
        let store = ContentStore::in_memory().unwrap();
        store.insert(&record("old", "2024-01-01", false, true, &[])).unwrap();
        store.insert(&record("draft", "2024-06-01", false, false, &[])).unwrap();
        store.insert(&record("new", "2024-01-02", false, true, &[])).unwrap();
        store.insert(&record("tie", "2024-01-01", false, true, &[])).unwrap();

        let rows = store.query_published().unwrap();
        assert_eq!(names(&rows), vec!["new", "old", "tie"]);
    }

    #[test]
    fn body_falls_back_to_full_body() {
        let store = ContentStore::in_memory().unwrap();
        let short = record("short", "2024-01-01", false, true, &[]);
        let long = record("long", "2024-01-02", true, true, &[]);
        store.insert(&short).unwrap();
        store.insert(&long).unwrap();

        let rows = store.query_published().unwrap();
        assert_eq!(rows[0].body, long.preview_body.unwrap());
        assert!(rows[0].long_snip);
        assert_eq!(rows[1].body, short.full_body);
        assert_eq!(store.query_full_body("long").unwrap(), long.full_body);
    }

    #[test]
    fn tags_keep_insertion_order() {
        let store = ContentStore::in_memory().unwrap();
        store
            .insert(&record("a", "2024-01-01", false, true, &["zeta", "alpha", "mid"]))
            .unwrap();
        assert_eq!(store.query_tags("a").unwrap(), vec!["zeta", "alpha", "mid"]);
        assert!(store.query_tags("missing").unwrap().is_empty());
    }

    #[test]
    fn distinct_tags_skip_unpublished() {
        let store = ContentStore::in_memory().unwrap();
        store.insert(&record("a", "2024-01-01", false, true, &["rust", "go"])).unwrap();
        store.insert(&record("b", "2024-01-02", false, true, &["rust"])).unwrap();
        store
            .insert(&record("c", "2024-01-03", false, false, &["secret", "rust"]))
            .unwrap();

        assert_eq!(
            store.query_distinct_published_tags().unwrap(),
            vec!["go", "rust"]
        );
    }

    #[test]
    fn published_by_tag() {
        let store = ContentStore::in_memory().unwrap();
        store.insert(&record("a", "2024-01-01", false, true, &["rust"])).unwrap();
        store.insert(&record("b", "2024-01-03", false, true, &["rust", "go"])).unwrap();
        store.insert(&record("c", "2024-01-02", false, false, &["rust"])).unwrap();
        store.insert(&record("d", "2024-01-04", false, true, &["go"])).unwrap();

        assert_eq!(names(&store.query_published_by_tag("rust").unwrap()), vec!["b", "a"]);
        assert_eq!(names(&store.query_published_by_tag("go").unwrap()), vec!["d", "b"]);
        assert!(store.query_published_by_tag("none").unwrap().is_empty());
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let store = ContentStore::in_memory().unwrap();
        store.insert(&record("a", "2024-01-01", false, true, &[])).unwrap();
        let err = store
            .insert(&record("a", "2024-02-01", false, true, &[]))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName(name) if name == "a"));
        assert_eq!(store.snippet_count().unwrap(), 1);
    }

    #[test]
    fn populate_counts_rows() {
        let dir = tempfile::tempdir().unwrap();
        let docs = [
            ("one", r#"{"Date":"2024-01-01","Published":true,"Tags":["a","b"]}"#),
            ("two", r#"{"Date":"2024-01-02","LongSnip":true,"Published":true,"Tags":["b"]}"#),
            ("three", r#"{"Date":"2024-01-03","Published":false,"Tags":["a","c","d"]}"#),
        ];
        for (name, header) in docs {
            std::fs::write(
                dir.path().join(format!("{name}.md")),
                format!("[//]: # ({header})\ntext\n"),
            )
            .unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "not a snippet").unwrap();

        let mut store = ContentStore::in_memory().unwrap();
        store.populate(dir.path()).unwrap();

        assert_eq!(store.snippet_count().unwrap(), 3);
        assert_eq!(store.tag_association_count().unwrap(), 6);
        let records = store.records().unwrap();
        let record_names: Vec<_> = records.iter().map(|r| r.meta.name.as_str()).collect();
        assert_eq!(record_names, vec!["one", "three", "two"]);
        assert_eq!(records[2].preview_body.as_deref(), Some(records[2].full_body.as_str()));
    }

    #[cfg(unix)]
    #[test]
    fn populate_follows_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("elsewhere.txt");
        std::fs::write(
            &target,
            "[//]: # ({\"Date\":\"2024-01-01\",\"Published\":true,\"Tags\":[\"x\"]})\nlinked\n",
        )
        .unwrap();
        let md = dir.path().join("md");
        std::fs::create_dir(&md).unwrap();
        std::os::unix::fs::symlink(&target, md.join("linked.md")).unwrap();

        let mut store = ContentStore::in_memory().unwrap();
        store.populate(&md).unwrap();
        assert_eq!(store.snippet_count().unwrap(), 1);
        assert_eq!(store.query_published().unwrap()[0].name, "linked");
        assert_eq!(store.query_tags("linked").unwrap(), vec!["x"]);
    }

    #[test]
    fn populate_aborts_on_bad_header() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("good.md"),
            "[//]: # ({\"Date\":\"2024-01-01\",\"Published\":true})\nok\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("bad.md"), "no header here").unwrap();

        let mut store = ContentStore::in_memory().unwrap();
        let err = store.populate(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Metadata {
                source: MetadataError::MissingLineBreak,
                ..
            }
        ));
        assert_eq!(store.snippet_count().unwrap(), 0);
    }

    #[test]
    fn create_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snips.db");
        {
            let store = ContentStore::create(&path).unwrap();
            store.insert(&record("a", "2024-01-01", false, true, &["x"])).unwrap();
        }
        let store = ContentStore::create(&path).unwrap();
        assert_eq!(store.snippet_count().unwrap(), 0);
        assert_eq!(store.tag_association_count().unwrap(), 0);
    }
}
