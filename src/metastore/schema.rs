//! SQLite schema for the metadata cache

/// Table holding one row per scanned item
pub const LIBRARY_TABLE: &str = "library";

/// Column names, in storage order
pub const COLUMNS: [&str; 9] = [
    "key",
    "title",
    "tags",
    "creators",
    "url",
    "path",
    "item",
    "parent_item",
    "embedded",
];

/// SQLite schema definition
pub struct Schema;

impl Schema {
    /// Get the complete schema SQL
    pub fn create_tables() -> &'static str {
        r#"
CREATE TABLE IF NOT EXISTS library (
    key TEXT PRIMARY KEY,
    title TEXT,
    tags TEXT,
    creators TEXT,
    url TEXT,
    path TEXT,
    item BLOB,
    parent_item BLOB,
    embedded BOOL DEFAULT 0
);
"#
    }

    /// Replace the metadata columns by key; `embedded` only ever turns on
    pub fn upsert() -> &'static str {
        r#"
INSERT INTO library
(key, title, tags, creators, url, path, item, parent_item, embedded)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
ON CONFLICT(key) DO UPDATE SET
    title = excluded.title,
    tags = excluded.tags,
    creators = excluded.creators,
    url = excluded.url,
    path = excluded.path,
    item = excluded.item,
    parent_item = excluded.parent_item,
    embedded = library.embedded OR excluded.embedded
"#
    }

    /// Select every column, ordered by key
    pub fn select_all() -> &'static str {
        "SELECT key, title, tags, creators, url, path, item, parent_item, embedded FROM library ORDER BY key"
    }

    /// Select rows not yet embedded, ordered by key
    pub fn select_pending() -> &'static str {
        "SELECT key, title, tags, creators, url, path, item, parent_item, embedded FROM library WHERE embedded = 0 ORDER BY key"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_lists_every_column() {
        let sql = Schema::create_tables();
        for column in COLUMNS {
            assert!(sql.contains(&format!("    {} ", column)), "missing {}", column);
        }
        assert!(sql.contains(LIBRARY_TABLE));
        assert!(!sql.contains("CREATE INDEX"));
    }

    #[test]
    fn test_upsert_never_clears_embedded() {
        let sql = Schema::upsert();
        assert!(sql.contains("ON CONFLICT(key) DO UPDATE"));
        assert!(sql.contains("embedded = library.embedded OR excluded.embedded"));
    }
}
