//! Metadata Cache Integration Tests
//!
//! Create/destroy lifecycle, idempotent upserts, the embedded flag and
//! round-tripping of denormalized columns.

use std::collections::BTreeSet;
use std::path::Path;

use serde_json::json;
use tempfile::TempDir;
use zotrag::domain::{Item, RawRecord};
use zotrag::metastore::{LibraryRecord, Listing, MetaStore, MetaStoreError};

fn item_with_parent(key: &str, tags: &[&str], creators: &[(&str, &str)]) -> Item {
    let attachment = RawRecord::new(json!({
        "key": key,
        "data": {
            "key": key,
            "parentItem": format!("P{}", key),
            "title": "attachment title",
            "filename": "paper.pdf",
            "contentType": "application/pdf"
        }
    }));
    let creators: Vec<_> = creators
        .iter()
        .map(|(first, last)| json!({"firstName": first, "lastName": last}))
        .collect();
    let tags: Vec<_> = tags.iter().map(|t| json!({"tag": t})).collect();
    let parent = RawRecord::new(json!({
        "key": format!("P{}", key),
        "data": {
            "key": format!("P{}", key),
            "title": format!("Paper {}", key),
            "url": "https://example.org/paper",
            "creators": creators,
            "tags": tags
        }
    }));

    Item::from_records(attachment, Some(parent), Path::new("/zotero/storage")).unwrap()
}

fn store_in(temp: &TempDir) -> MetaStore {
    MetaStore::new(temp.path().join("library").join("sqlite.db"))
}

fn records(store: &MetaStore) -> Vec<LibraryRecord> {
    match store.read_all(false).unwrap() {
        Listing::Records(records) => records,
        Listing::Table(_) => panic!("expected records"),
    }
}

#[test]
fn test_create_twice_then_destroy() {
    let temp = TempDir::new().unwrap();
    let store = store_in(&temp);

    store.create().unwrap();
    store.create().unwrap();
    assert!(store.exists());

    store.destroy().unwrap();
    assert!(!store.exists());
    assert!(!temp.path().join("library").exists());
}

#[test]
fn test_destroy_without_database_is_noop() {
    let temp = TempDir::new().unwrap();
    let store = store_in(&temp);

    store.destroy().unwrap();
    store.destroy().unwrap();
    assert!(temp.path().exists());
}

#[test]
fn test_destroy_removes_directory_with_other_files() {
    let temp = TempDir::new().unwrap();
    let store = store_in(&temp);
    store.create().unwrap();
    std::fs::write(temp.path().join("library").join("other"), "stale").unwrap();

    store.destroy().unwrap();

    assert!(!store.exists());
    assert!(!temp.path().join("library").exists());
    assert!(temp.path().exists());
}

#[test]
fn test_upsert_twice_keeps_one_row() {
    let temp = TempDir::new().unwrap();
    let store = store_in(&temp);
    store.create().unwrap();

    let item = item_with_parent("AAAA0001", &["nlp"], &[("Alan", "Turing")]);
    store.upsert_many(&[item.clone()]).unwrap();
    store.upsert_many(&[item]).unwrap();

    assert_eq!(store.count().unwrap(), 1);
}

#[test]
fn test_rescan_replaces_metadata_and_keeps_embedded() {
    let temp = TempDir::new().unwrap();
    let store = store_in(&temp);
    store.create().unwrap();

    store
        .upsert_many(&[item_with_parent("AAAA0001", &["old"], &[])])
        .unwrap();
    store.mark_embedded(["AAAA0001"]).unwrap();
    store
        .upsert_many(&[item_with_parent("AAAA0001", &["new"], &[])])
        .unwrap();

    let rows = records(&store);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].tags, BTreeSet::from(["new".to_string()]));
    assert!(rows[0].embedded);
    assert!(store.pending().unwrap().is_empty());
}

#[test]
fn test_destroy_then_create_resets_embedded() {
    let temp = TempDir::new().unwrap();
    let store = store_in(&temp);
    store.create().unwrap();
    store
        .upsert_many(&[item_with_parent("AAAA0001", &[], &[])])
        .unwrap();
    store.mark_embedded(["AAAA0001"]).unwrap();

    store.destroy().unwrap();
    store.create().unwrap();
    store
        .upsert_many(&[item_with_parent("AAAA0001", &[], &[])])
        .unwrap();

    assert!(!records(&store)[0].embedded);
}

#[test]
fn test_sets_and_blobs_round_trip() {
    let temp = TempDir::new().unwrap();
    let store = store_in(&temp);
    store.create().unwrap();

    let item = item_with_parent(
        "AAAA0001",
        &["transformers", "attention", "nlp"],
        &[("Ada", "Lovelace"), ("Alan", "Turing"), ("Ada", "Lovelace")],
    );
    store.upsert_many(&[item.clone()]).unwrap();

    let rows = records(&store);
    let row = &rows[0];

    assert_eq!(row.key, "AAAA0001");
    assert_eq!(row.title, "Paper AAAA0001");
    assert_eq!(row.tags, item.tags);
    assert_eq!(row.creators, item.creators);
    assert_eq!(row.creators.len(), 2);
    assert_eq!(row.url.as_deref(), Some("https://example.org/paper"));
    assert_eq!(row.path, item.pdf_path);
    assert_eq!(row.item, item.attachment);
    assert_eq!(row.parent_item, item.parent);
    assert!(!row.embedded);
}

#[test]
fn test_item_without_parent_stores_null_parent() {
    let temp = TempDir::new().unwrap();
    let store = store_in(&temp);
    store.create().unwrap();

    let attachment = RawRecord::new(json!({
        "key": "ORPHAN01",
        "data": {"key": "ORPHAN01", "title": "Loose PDF", "contentType": "application/pdf"}
    }));
    let item = Item::from_records(attachment, None, Path::new("/s")).unwrap();
    store.upsert_many(&[item]).unwrap();

    let rows = records(&store);
    assert!(rows[0].parent_item.is_none());
    assert!(rows[0].tags.is_empty());
    assert!(rows[0].creators.is_empty());
    assert_eq!(rows[0].url, None);
}

#[test]
fn test_mark_embedded_missing_key_is_ignored() {
    let temp = TempDir::new().unwrap();
    let store = store_in(&temp);
    store.create().unwrap();
    store
        .upsert_many(&[item_with_parent("AAAA0001", &[], &[])])
        .unwrap();

    let before = records(&store);
    assert_eq!(store.mark_embedded(["NOPE0000"]).unwrap(), 0);
    assert_eq!(records(&store), before);
}

#[test]
fn test_mark_embedded_many() {
    let temp = TempDir::new().unwrap();
    let store = store_in(&temp);
    store.create().unwrap();
    store
        .upsert_many(&[
            item_with_parent("AAAA0001", &[], &[]),
            item_with_parent("BBBB0002", &[], &[]),
            item_with_parent("CCCC0003", &[], &[]),
        ])
        .unwrap();

    let keys = vec!["AAAA0001".to_string(), "CCCC0003".to_string()];
    assert_eq!(store.mark_embedded(&keys).unwrap(), 2);

    let pending: Vec<_> = store.pending().unwrap().into_iter().map(|r| r.key).collect();
    assert_eq!(pending, vec!["BBBB0002".to_string()]);
}

#[test]
fn test_malformed_item_rejects_whole_batch() {
    let temp = TempDir::new().unwrap();
    let store = store_in(&temp);
    store.create().unwrap();

    let good = item_with_parent("AAAA0001", &[], &[]);
    let mut bad = item_with_parent("BBBB0002", &[], &[]);
    bad.attachment = RawRecord::new(json!("not an object"));

    let err = store.upsert_many(&[good, bad]).unwrap_err();

    assert!(matches!(err, MetaStoreError::Validation { .. }));
    assert_eq!(store.count().unwrap(), 0);
}

#[test]
fn test_table_listing() {
    let temp = TempDir::new().unwrap();
    let store = store_in(&temp);
    store.create().unwrap();
    store
        .upsert_many(&[
            item_with_parent("BBBB0002", &[], &[("Alan", "Turing")]),
            item_with_parent("AAAA0001", &[], &[]),
        ])
        .unwrap();

    let Listing::Table(table) = store.read_all(true).unwrap() else {
        panic!("expected table");
    };

    assert_eq!(table.len(), 2);
    assert_eq!(table.key, vec!["AAAA0001".to_string(), "BBBB0002".to_string()]);
    assert!(table.render().contains("Alan Turing"));
}
