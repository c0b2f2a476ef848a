//! Metadata cache: a local SQLite mirror of scanned items.
//!
//! One row per item key. A rescan replaces the metadata columns but never
//! clears `embedded`; only `destroy` resets it. Every statement runs in autocommit mode,
//! so an interrupted batch leaves the rows written so far committed.
//!
//! The cache assumes a single writer process at a time.

pub mod schema;
pub mod table;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OpenFlags};
use thiserror::Error;

use crate::domain::{split_set, Item, RawRecord};
use schema::Schema;

pub use table::LibraryTable;

/// Metadata cache errors
#[derive(Debug, Error)]
pub enum MetaStoreError {
    #[error("Invalid item '{key}': {reason}")]
    Validation { key: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for metadata cache operations
pub type Result<T> = std::result::Result<T, MetaStoreError>;

/// One cache row with its sets and blobs decoded
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryRecord {
    pub key: String,
    pub title: String,
    pub tags: BTreeSet<String>,
    pub creators: BTreeSet<String>,
    pub url: Option<String>,
    pub path: PathBuf,
    pub item: RawRecord,
    pub parent_item: Option<RawRecord>,
    pub embedded: bool,
}

/// Result of a full-table read
#[derive(Debug, Clone, PartialEq)]
pub enum Listing {
    Table(LibraryTable),
    Records(Vec<LibraryRecord>),
}

impl Listing {
    pub fn len(&self) -> usize {
        match self {
            Listing::Table(table) => table.len(),
            Listing::Records(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Row as stored, before blob decoding
struct StoredRow {
    key: String,
    title: Option<String>,
    tags: Option<String>,
    creators: Option<String>,
    url: Option<String>,
    path: Option<String>,
    item: Option<Vec<u8>>,
    parent_item: Option<Vec<u8>>,
    embedded: bool,
}

impl StoredRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            key: row.get(0)?,
            title: row.get(1)?,
            tags: row.get(2)?,
            creators: row.get(3)?,
            url: row.get(4)?,
            path: row.get(5)?,
            item: row.get(6)?,
            parent_item: row.get(7)?,
            embedded: row.get::<_, Option<bool>>(8)?.unwrap_or(false),
        })
    }

    fn decode(self) -> Result<LibraryRecord> {
        let item = match self.item {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => RawRecord::new(serde_json::Value::Null),
        };
        let parent_item = match self.parent_item {
            Some(bytes) => Some(serde_json::from_slice(&bytes)?),
            None => None,
        };

        Ok(LibraryRecord {
            key: self.key,
            title: self.title.unwrap_or_default(),
            tags: split_set(self.tags.as_deref().unwrap_or_default()),
            creators: split_set(self.creators.as_deref().unwrap_or_default()),
            url: self.url.filter(|u| !u.is_empty()),
            path: PathBuf::from(self.path.unwrap_or_default()),
            item,
            parent_item,
            embedded: self.embedded,
        })
    }
}

/// Handle to the cache database file
#[derive(Debug, Clone)]
pub struct MetaStore {
    path: PathBuf,
}

impl MetaStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Ensure the containing directory, the database and the table exist
    pub fn create(&self) -> Result<()> {
        if let Some(dir) = self.containing_dir() {
            std::fs::create_dir_all(dir)?;
        }

        let conn = Connection::open(&self.path)?;
        conn.execute_batch(Schema::create_tables())?;

        tracing::debug!("Metadata cache ready at {}", self.path.display());
        Ok(())
    }

    /// Remove the database and its whole containing directory.
    ///
    /// A missing database or directory is not an error. Callers confirm
    /// with the user before calling this.
    pub fn destroy(&self) -> Result<()> {
        let Some(dir) = self.containing_dir() else {
            return match std::fs::remove_file(&self.path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            };
        };

        match std::fs::remove_dir_all(dir) {
            Ok(()) => {
                tracing::info!("Removed {}", dir.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Insert or replace one row per item.
    ///
    /// Every item is validated before the first write. Rows are then
    /// committed one by one.
    pub fn upsert_many(&self, items: &[Item]) -> Result<usize> {
        for item in items {
            validate(item)?;
        }

        let conn = self.open()?;
        let mut stmt = conn.prepare(Schema::upsert())?;

        for item in items {
            let blob = serde_json::to_vec(&item.attachment)?;
            let parent_blob = item.parent.as_ref().map(serde_json::to_vec).transpose()?;

            stmt.execute(params![
                item.key,
                item.title,
                item.joined_tags(),
                item.joined_creators(),
                item.url,
                item.pdf_path.to_string_lossy().into_owned(),
                blob,
                parent_blob,
                item.embedded,
            ])?;
        }

        tracing::info!("Wrote {} rows to {}", items.len(), self.path.display());
        Ok(items.len())
    }

    /// Read every row, as a table or as records
    pub fn read_all(&self, as_table: bool) -> Result<Listing> {
        let records = self.query(Schema::select_all())?;

        Ok(if as_table {
            Listing::Table(records.into_iter().collect())
        } else {
            Listing::Records(records)
        })
    }

    /// Rows not yet embedded, in key order
    pub fn pending(&self) -> Result<Vec<LibraryRecord>> {
        self.query(Schema::select_pending())
    }

    /// Set `embedded` for the given keys; unknown keys are ignored.
    ///
    /// Returns the number of rows updated.
    pub fn mark_embedded<I, S>(&self, keys: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let conn = self.open()?;
        let mut stmt = conn.prepare("UPDATE library SET embedded = 1 WHERE key = ?1")?;

        let mut updated = 0;
        for key in keys {
            let changed = stmt.execute([key.as_ref()])?;
            if changed == 0 {
                tracing::debug!("mark_embedded: no row for {}", key.as_ref());
            }
            updated += changed;
        }

        Ok(updated)
    }

    /// Number of rows
    pub fn count(&self) -> Result<usize> {
        let conn = self.open()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM library", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Open an existing database; never creates the file
    fn open(&self) -> Result<Connection> {
        let flags = OpenFlags::default().difference(OpenFlags::SQLITE_OPEN_CREATE);
        Ok(Connection::open_with_flags(&self.path, flags)?)
    }

    fn query(&self, sql: &str) -> Result<Vec<LibraryRecord>> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map([], StoredRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(StoredRow::decode).collect()
    }

    fn containing_dir(&self) -> Option<&Path> {
        self.path.parent().filter(|p| !p.as_os_str().is_empty())
    }
}

/// Check an item carries everything a row needs
fn validate(item: &Item) -> Result<()> {
    let invalid = |reason: &str| MetaStoreError::Validation {
        key: item.key.clone(),
        reason: reason.to_string(),
    };

    if item.key.trim().is_empty() {
        return Err(invalid("empty key"));
    }
    if !item.attachment.as_value().is_object() {
        return Err(invalid("attachment record is not an object"));
    }
    if item.attachment.key() != Some(item.key.as_str()) {
        return Err(invalid("key does not match the attachment record"));
    }
    if item.pdf_path.as_os_str().is_empty() {
        return Err(invalid("empty PDF path"));
    }
    if let Some(parent) = &item.parent {
        if !parent.as_value().is_object() {
            return Err(invalid("parent record is not an object"));
        }
    }

    Ok(())
}
