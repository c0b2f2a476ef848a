//! Zotero collections and the per-session collection registry.

use std::collections::BTreeMap;

use serde_json::Value;

use super::item::Item;
use super::record::RawRecord;

/// A Zotero collection
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    /// Collection key
    pub key: String,

    /// Display name
    pub name: String,

    /// Item count as reported by Zotero
    pub number_of_items: u64,

    /// Key of the enclosing collection, if nested
    pub parent_collection: Option<String>,

    /// Resolved PDF-bearing items, added after a scan
    pub items: Vec<Item>,
}

impl Collection {
    /// Create an empty collection
    pub fn new(key: impl Into<String>, name: impl Into<String>, number_of_items: u64) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            number_of_items,
            parent_collection: None,
            items: Vec::new(),
        }
    }

    /// Build a collection from a raw listing record
    pub fn from_record(record: &RawRecord) -> Option<Self> {
        let key = record.key()?;
        let name = record.data_str("name").unwrap_or_default();
        let number_of_items = record
            .meta("numItems")
            .and_then(Value::as_u64)
            .unwrap_or(0);

        // Top-level collections report `parentCollection: false`
        let parent_collection = record.data_nonempty("parentCollection").map(str::to_string);

        Some(Self {
            parent_collection,
            ..Self::new(key, name, number_of_items)
        })
    }

    pub fn add_item(&mut self, item: Item) {
        self.items.push(item);
    }

    pub fn add_items(&mut self, items: impl IntoIterator<Item = Item>) {
        self.items.extend(items);
    }

    /// Number of resolved PDF-bearing items
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Items Zotero reports that carry no usable PDF attachment
    pub fn missing_pdf_count(&self) -> u64 {
        self.number_of_items.saturating_sub(self.items.len() as u64)
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Collection {} ({}) - {} items",
            self.key, self.name, self.number_of_items
        )
    }
}

/// Ordered registry of collections, built once per session
#[derive(Debug, Clone, Default)]
pub struct Collections {
    collections: Vec<Collection>,
}

impl Collections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, collection: Collection) {
        self.collections.push(collection);
    }

    /// Look up a collection by key
    pub fn by_key(&self, key: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.key == key)
    }

    /// Look up a collection by exact name (first match)
    pub fn by_name(&self, name: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Collection> {
        self.collections.iter()
    }

    /// Key -> name map
    pub fn key_name_map(&self) -> BTreeMap<String, String> {
        self.collections
            .iter()
            .map(|c| (c.key.clone(), c.name.clone()))
            .collect()
    }
}

impl FromIterator<Collection> for Collections {
    fn from_iter<I: IntoIterator<Item = Collection>>(iter: I) -> Self {
        Self {
            collections: iter.into_iter().collect(),
        }
    }
}
