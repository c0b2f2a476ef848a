//! Column-major view of the metadata cache.

use std::collections::BTreeSet;
use std::path::PathBuf;

use super::schema::COLUMNS;
use super::LibraryRecord;
use crate::domain::{join_set, RawRecord};

/// The `library` table as parallel columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibraryTable {
    pub key: Vec<String>,
    pub title: Vec<String>,
    pub tags: Vec<BTreeSet<String>>,
    pub creators: Vec<BTreeSet<String>>,
    pub url: Vec<Option<String>>,
    pub path: Vec<PathBuf>,
    pub item: Vec<RawRecord>,
    pub parent_item: Vec<Option<RawRecord>>,
    pub embedded: Vec<bool>,
}

impl LibraryTable {
    pub fn columns(&self) -> &'static [&'static str] {
        &COLUMNS
    }

    pub fn len(&self) -> usize {
        self.key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }

    /// Append one row
    pub fn push(&mut self, record: LibraryRecord) {
        self.key.push(record.key);
        self.title.push(record.title);
        self.tags.push(record.tags);
        self.creators.push(record.creators);
        self.url.push(record.url);
        self.path.push(record.path);
        self.item.push(record.item);
        self.parent_item.push(record.parent_item);
        self.embedded.push(record.embedded);
    }

    /// Plain-text rendering of the scalar columns
    pub fn render(&self) -> String {
        let mut out = format!(
            "{:<10} {:<8} {:<48} {}\n",
            "KEY", "EMBEDDED", "TITLE", "CREATORS"
        );

        for i in 0..self.len() {
            out.push_str(&format!(
                "{:<10} {:<8} {:<48} {}\n",
                self.key[i],
                if self.embedded[i] { "yes" } else { "no" },
                truncate(&self.title[i], 48),
                join_set(&self.creators[i]),
            ));
        }

        out
    }
}

impl FromIterator<LibraryRecord> for LibraryTable {
    fn from_iter<I: IntoIterator<Item = LibraryRecord>>(iter: I) -> Self {
        let mut table = LibraryTable::default();
        for record in iter {
            table.push(record);
        }
        table
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let cut: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
