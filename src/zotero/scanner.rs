//! Paginated collection scan.
//!
//! The scanner walks a collection page by page, keeps the records that look
//! like PDF attachments, and resolves each one against its bibliographic
//! parent. A failed parent lookup never fails the scan: the item is kept
//! with `has_parent = false`.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{RetryPolicy, ZoteroApi, ZoteroError, ZoteroResult};
use crate::domain::{Collection, Collections, Item, RawRecord};

/// Tuning knobs for a scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Records requested per page (default: 100)
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Hard ceiling on non-empty pages per listing (default: 1000)
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Retry policy for transient faults
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_page_size() -> usize {
    100
}
fn default_max_pages() -> usize {
    1000
}
fn default_timeout() -> u64 {
    30
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            timeout_seconds: default_timeout(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ScanOptions {
    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Outcome of a collection scan
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub collection_key: String,

    /// Listing requests issued (including the final empty page)
    pub pages_requested: usize,

    /// Raw records seen across all pages
    pub records_seen: usize,

    /// PDF records skipped because they carried no key
    pub skipped_without_key: usize,

    /// Whether the page ceiling stopped the listing early
    pub truncated: bool,

    /// Resolved items, in upstream order
    pub items: Vec<Item>,

    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl ScanReport {
    /// Items whose parent lookup failed
    pub fn orphaned(&self) -> usize {
        self.items.iter().filter(|i| !i.has_parent).count()
    }
}

/// Result of walking a listing
struct Listing {
    records: Vec<RawRecord>,
    pages_requested: usize,
    records_seen: usize,
    truncated: bool,
}

/// Collection scanner over any `ZoteroApi`
pub struct LibraryScanner<'a> {
    client: &'a dyn ZoteroApi,
    storage_root: PathBuf,
    options: ScanOptions,
}

impl<'a> LibraryScanner<'a> {
    /// Create a scanner; PDF paths are resolved below `storage_root`
    pub fn new(client: &'a dyn ZoteroApi, storage_root: impl Into<PathBuf>, options: ScanOptions) -> Self {
        Self {
            client,
            storage_root: storage_root.into(),
            options,
        }
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    fn page_size(&self) -> usize {
        self.options.page_size.max(1)
    }

    /// Build the collection registry from the full listing
    pub async fn collections(&self) -> ZoteroResult<Collections> {
        let limit = self.page_size();
        let mut collections = Collections::new();
        let mut start = 0;

        for page in 1..=self.options.max_pages {
            let records = self
                .options
                .retry
                .run("collections listing", || self.client.collections(start, limit))
                .await?;

            tracing::debug!("collections page {} - {} records", page, records.len());

            if records.is_empty() {
                return Ok(collections);
            }

            for record in &records {
                match Collection::from_record(record) {
                    Some(collection) => collections.add(collection),
                    None => tracing::warn!("Skipping collection record without key"),
                }
            }

            start += limit;
        }

        tracing::warn!(
            "Collections listing stopped at the {}-page ceiling",
            self.options.max_pages
        );
        Ok(collections)
    }

    /// Enumerate a collection and resolve every PDF-bearing item
    pub async fn scan(&self, collection_key: &str) -> ZoteroResult<Vec<Item>> {
        Ok(self.scan_with_report(collection_key).await?.items)
    }

    /// Same as `scan`, with counters for status output
    pub async fn scan_with_report(&self, collection_key: &str) -> ZoteroResult<ScanReport> {
        let started_at = Utc::now();
        let clock = Instant::now();

        let listing = self.pdf_records(collection_key).await?;
        tracing::info!(
            "Listed {} PDF records out of {} in {:.2?}",
            listing.records.len(),
            listing.records_seen,
            clock.elapsed()
        );

        let resolve_clock = Instant::now();
        let mut items = Vec::with_capacity(listing.records.len());
        let mut skipped_without_key = 0;

        for record in listing.records {
            match self.resolve(record).await {
                Some(item) => items.push(item),
                None => {
                    skipped_without_key += 1;
                    tracing::warn!("Skipping PDF record without key in {}", collection_key);
                }
            }
        }
        tracing::info!(
            "Resolved parents for {} items in {:.2?}",
            items.len(),
            resolve_clock.elapsed()
        );

        Ok(ScanReport {
            collection_key: collection_key.to_string(),
            pages_requested: listing.pages_requested,
            records_seen: listing.records_seen,
            skipped_without_key,
            truncated: listing.truncated,
            items,
            started_at,
            elapsed: clock.elapsed(),
        })
    }

    /// Resolve a single item by key; it must be a PDF attachment
    pub async fn resolve_single(&self, item_key: &str) -> ZoteroResult<Item> {
        let record = self
            .options
            .retry
            .run("item lookup", || self.client.item(item_key))
            .await?;

        if !record.is_pdf_attachment() {
            return Err(ZoteroError::NotAPdf(item_key.to_string()));
        }

        self.resolve(record)
            .await
            .ok_or_else(|| ZoteroError::Decode(format!("item {} has no key", item_key)))
    }

    /// Page through a collection, keeping PDF attachment records
    async fn pdf_records(&self, collection_key: &str) -> ZoteroResult<Listing> {
        let limit = self.page_size();
        let mut listing = Listing {
            records: Vec::new(),
            pages_requested: 0,
            records_seen: 0,
            truncated: false,
        };
        let mut start = 0;

        loop {
            let page = listing.pages_requested + 1;
            if page > self.options.max_pages {
                tracing::warn!(
                    "Stopping {} after {} pages without an empty page",
                    collection_key,
                    self.options.max_pages
                );
                listing.truncated = true;
                break;
            }

            tracing::info!(
                "page {} - querying {} items {}..{}",
                page,
                collection_key,
                start,
                start + limit
            );
            let records = self
                .options
                .retry
                .run("collection listing", || {
                    self.client.collection_items(collection_key, start, limit)
                })
                .await?;
            listing.pages_requested = page;

            if records.is_empty() {
                tracing::info!(
                    "Finished {}: {} PDF records",
                    collection_key,
                    listing.records.len()
                );
                break;
            }

            listing.records_seen += records.len();
            listing
                .records
                .extend(records.into_iter().filter(RawRecord::is_pdf_attachment));

            tracing::info!(
                "page {} - {} PDF records so far",
                page,
                listing.records.len()
            );
            start += limit;
        }

        Ok(listing)
    }

    /// Attach the parent record, degrading to `has_parent = false` on failure
    async fn resolve(&self, attachment: RawRecord) -> Option<Item> {
        let parent = match attachment.data_nonempty("parentItem") {
            Some(parent_key) => self.lookup_parent(parent_key).await,
            None => None,
        };

        Item::from_records(attachment, parent, &self.storage_root)
    }

    async fn lookup_parent(&self, parent_key: &str) -> Option<RawRecord> {
        match self
            .options
            .retry
            .run("parent lookup", || self.client.item(parent_key))
            .await
        {
            Ok(parent) => Some(parent),
            Err(e) => {
                let error = ZoteroError::UpstreamLookup {
                    key: parent_key.to_string(),
                    reason: e.to_string(),
                };
                tracing::warn!("{}; keeping item without parent", error);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory library serving one collection
    #[derive(Default)]
    struct MemoryLibrary {
        items: Vec<RawRecord>,
        by_key: HashMap<String, RawRecord>,
        page_calls: Mutex<Vec<(usize, usize)>>,
    }

    impl MemoryLibrary {
        fn with_items(items: Vec<RawRecord>) -> Self {
            Self {
                items,
                ..Default::default()
            }
        }

        fn with_parent(mut self, parent: RawRecord) -> Self {
            let key = parent.key().unwrap().to_string();
            self.by_key.insert(key, parent);
            self
        }
    }

    #[async_trait]
    impl ZoteroApi for MemoryLibrary {
        async fn collections(&self, _start: usize, _limit: usize) -> ZoteroResult<Vec<RawRecord>> {
            Ok(Vec::new())
        }

        async fn collection_items(
            &self,
            _collection_key: &str,
            start: usize,
            limit: usize,
        ) -> ZoteroResult<Vec<RawRecord>> {
            self.page_calls.lock().unwrap().push((start, limit));
            Ok(self.items.iter().skip(start).take(limit).cloned().collect())
        }

        async fn item(&self, item_key: &str) -> ZoteroResult<RawRecord> {
            self.by_key
                .get(item_key)
                .cloned()
                .or_else(|| self.items.iter().find(|r| r.key() == Some(item_key)).cloned())
                .ok_or_else(|| ZoteroError::Status {
                    status: 404,
                    url: item_key.to_string(),
                })
        }
    }

    fn pdf(key: &str, parent: Option<&str>) -> RawRecord {
        RawRecord::new(json!({
            "key": key,
            "data": {
                "key": key,
                "itemType": "attachment",
                "parentItem": parent,
                "title": format!("{} attachment", key),
                "filename": format!("{}.pdf", key),
                "contentType": "application/pdf"
            }
        }))
    }

    fn note(key: &str) -> RawRecord {
        RawRecord::new(json!({"key": key, "data": {"key": key, "itemType": "note"}}))
    }

    fn options(page_size: usize) -> ScanOptions {
        ScanOptions {
            page_size,
            retry: RetryPolicy::none(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_full_page_then_empty_page() {
        let records = (0..4).map(|i| pdf(&format!("K{}", i), None)).collect();
        let library = MemoryLibrary::with_items(records);
        let scanner = LibraryScanner::new(&library, "/storage", options(4));

        let items = scanner.scan("COLL").await.unwrap();

        let keys: Vec<_> = items.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["K0", "K1", "K2", "K3"]);
        assert_eq!(*library.page_calls.lock().unwrap(), vec![(0, 4), (4, 4)]);
    }

    #[tokio::test]
    async fn test_non_pdf_records_dropped() {
        let records = vec![pdf("A", None), note("B"), pdf("C", None)];
        let library = MemoryLibrary::with_items(records);
        let scanner = LibraryScanner::new(&library, "/storage", options(100));

        let report = scanner.scan_with_report("COLL").await.unwrap();

        assert_eq!(report.records_seen, 3);
        assert_eq!(report.items.len(), 2);
        assert_eq!(report.pages_requested, 2);
    }

    #[tokio::test]
    async fn test_missing_parent_degrades() {
        let parent = RawRecord::new(json!({
            "key": "P1",
            "data": {"key": "P1", "title": "Parent Title", "creators": [{"name": "Org"}]}
        }));
        let records = vec![pdf("A", Some("P1")), pdf("B", Some("GONE"))];
        let library = MemoryLibrary::with_items(records).with_parent(parent);
        let scanner = LibraryScanner::new(&library, "/storage", options(100));

        let report = scanner.scan_with_report("COLL").await.unwrap();

        assert_eq!(report.items.len(), 2);
        assert!(report.items[0].has_parent);
        assert_eq!(report.items[0].title, "Parent Title");
        assert!(!report.items[1].has_parent);
        assert_eq!(report.items[1].title, "B attachment");
        assert_eq!(report.orphaned(), 1);
    }

    #[tokio::test]
    async fn test_page_ceiling_stops_listing() {
        let records = (0..10).map(|i| pdf(&format!("K{}", i), None)).collect();
        let library = MemoryLibrary::with_items(records);
        let scanner = LibraryScanner::new(
            &library,
            "/storage",
            ScanOptions {
                max_pages: 2,
                ..options(3)
            },
        );

        let report = scanner.scan_with_report("COLL").await.unwrap();

        assert!(report.truncated);
        assert_eq!(report.items.len(), 6);
        assert_eq!(library.page_calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_resolve_single_rejects_non_pdf() {
        let library = MemoryLibrary::with_items(vec![note("N1"), pdf("A", None)]);
        let scanner = LibraryScanner::new(&library, "/storage", options(100));

        let err = scanner.resolve_single("N1").await.unwrap_err();
        assert!(matches!(err, ZoteroError::NotAPdf(key) if key == "N1"));

        let item = scanner.resolve_single("A").await.unwrap();
        assert_eq!(item.pdf_path, PathBuf::from("/storage/A/A.pdf"));
    }
}
