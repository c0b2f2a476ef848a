//! Resolved library items.
//!
//! An `Item` is a flattened, self-contained view of one PDF attachment and
//! its bibliographic parent. Bibliographic fields come from the parent when
//! one resolved, otherwise from the attachment itself.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::record::RawRecord;

/// Fields that only exist when the parent record resolved
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParentDetails {
    /// Parent key
    pub key: Option<String>,

    /// Zotero item type (journalArticle, book, ...)
    pub item_type: Option<String>,

    /// Publication date as entered in Zotero
    pub date: Option<String>,

    /// Parent title
    pub title: Option<String>,

    /// Parent URL
    pub url: Option<String>,

    /// Abstract
    pub abstract_note: Option<String>,

    /// DOI
    pub doi: Option<String>,

    /// Collections the parent belongs to
    #[serde(default)]
    pub collections: Vec<String>,
}

impl ParentDetails {
    /// Extract the detail block from a parent record
    pub fn from_record(parent: &RawRecord) -> Self {
        let owned = |field: &str| parent.data_nonempty(field).map(str::to_string);

        Self {
            key: parent.key().map(str::to_string),
            item_type: owned("itemType"),
            date: owned("date"),
            title: owned("title"),
            url: owned("url"),
            abstract_note: owned("abstractNote"),
            doi: owned("DOI"),
            collections: parent
                .data("collections")
                .and_then(Value::as_array)
                .map(|keys| {
                    keys.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// A PDF-bearing library entry with its resolved parent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Attachment key (primary key in the metadata cache)
    pub key: String,

    /// Display title
    pub title: String,

    /// Tag names
    pub tags: BTreeSet<String>,

    /// Creator display names, deduplicated
    pub creators: BTreeSet<String>,

    /// Attachment URL, falling back to the parent URL
    pub url: Option<String>,

    /// Local path of the PDF file
    pub pdf_path: PathBuf,

    /// Whether the parent lookup succeeded
    pub has_parent: bool,

    /// Key of the parent as referenced by the attachment
    pub parent_key: Option<String>,

    /// Stored filename of the attachment
    pub filename: Option<String>,

    pub access_date: Option<String>,
    pub date_added: Option<String>,
    pub date_modified: Option<String>,

    /// Parent-only fields, unset when no parent resolved
    pub parent_details: Option<ParentDetails>,

    /// Raw attachment record
    pub attachment: RawRecord,

    /// Raw parent record
    pub parent: Option<RawRecord>,

    /// Whether the content has been indexed into the vector store
    #[serde(default)]
    pub embedded: bool,
}

impl Item {
    /// Assemble an item from an attachment record and its (optional) parent.
    ///
    /// Returns `None` when the attachment carries no key.
    pub fn from_records(
        attachment: RawRecord,
        parent: Option<RawRecord>,
        storage_root: &Path,
    ) -> Option<Self> {
        let key = attachment.key()?.to_string();
        let owned = |field: &str| attachment.data_nonempty(field).map(str::to_string);

        let filename = owned("filename");
        let parent_details = parent.as_ref().map(ParentDetails::from_record);

        // Bibliographic source: parent if resolved, else the attachment
        let source = parent.as_ref().unwrap_or(&attachment);

        // An untitled parent still shows the attachment title
        let title = parent_details
            .as_ref()
            .and_then(|d| d.title.clone())
            .or_else(|| owned("title"))
            .unwrap_or_default();

        let url = owned("url").or_else(|| parent_details.as_ref().and_then(|d| d.url.clone()));

        let pdf_dir = storage_root.join(&key);
        let pdf_path = match &filename {
            Some(name) => pdf_dir.join(name),
            None => pdf_dir,
        };

        Some(Self {
            tags: tag_names(source.data("tags")),
            creators: creator_names(source.data("creators")),
            title,
            url,
            pdf_path,
            has_parent: parent.is_some(),
            parent_key: owned("parentItem"),
            filename,
            access_date: owned("accessDate"),
            date_added: owned("dateAdded"),
            date_modified: owned("dateModified"),
            parent_details,
            attachment,
            parent,
            embedded: false,
            key,
        })
    }

    /// Directory holding the attachment in Zotero storage
    pub fn pdf_dir(&self) -> &Path {
        if self.filename.is_some() {
            self.pdf_path.parent().unwrap_or(&self.pdf_path)
        } else {
            &self.pdf_path
        }
    }

    /// Comma-joined tags, as stored in the metadata cache
    pub fn joined_tags(&self) -> String {
        join_set(&self.tags)
    }

    /// Comma-joined creators, as stored in the metadata cache
    pub fn joined_creators(&self) -> String {
        join_set(&self.creators)
    }
}

impl std::fmt::Display for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Item {} (has_parent: {}) {}",
            self.key, self.has_parent, self.title
        )
    }
}

/// Creator display names from a Zotero `creators` array.
///
/// A creator contributes its single `name` field, or `firstName lastName`
/// when both parts are present. Anything else is skipped.
pub fn creator_names(creators: Option<&Value>) -> BTreeSet<String> {
    let Some(entries) = creators.and_then(Value::as_array) else {
        return BTreeSet::new();
    };

    entries
        .iter()
        .filter_map(|creator| {
            if let Some(name) = creator.get("name").and_then(Value::as_str) {
                return Some(name.to_string());
            }
            let first = creator.get("firstName").and_then(Value::as_str)?;
            let last = creator.get("lastName").and_then(Value::as_str)?;
            Some(format!("{} {}", first, last))
        })
        .collect()
}

/// Tag names from a Zotero `tags` array
pub fn tag_names(tags: Option<&Value>) -> BTreeSet<String> {
    tags.and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|t| t.get("tag").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Join a set with commas
pub fn join_set(values: &BTreeSet<String>) -> String {
    values.iter().map(String::as_str).collect::<Vec<_>>().join(",")
}

/// Split a comma-joined column back into a set, dropping empty entries
pub fn split_set(joined: &str) -> BTreeSet<String> {
    joined
        .split(',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// How often a creator appears across items, and where
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreatorWork {
    pub count: usize,
    pub keys: Vec<String>,
}

/// Index items by creator display name
pub fn creator_index<'a>(items: impl IntoIterator<Item = &'a Item>) -> BTreeMap<String, CreatorWork> {
    let mut index: BTreeMap<String, CreatorWork> = BTreeMap::new();

    for item in items {
        for creator in &item.creators {
            let work = index.entry(creator.clone()).or_default();
            work.count += 1;
            work.keys.push(item.key.clone());
        }
    }

    index
}
