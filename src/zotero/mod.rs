//! Zotero Web API access and collection scanning.
//!
//! - `ZoteroApi`: the three upstream calls the scanner needs
//! - `ZoteroClient`: HTTP implementation against the Zotero Web API v3
//! - `LibraryScanner`: paginated collection scan and parent resolution

pub mod client;
pub mod retry;
pub mod scanner;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::RawRecord;

pub use client::{LibraryType, ZoteroClient, ZoteroSettings};
pub use retry::RetryPolicy;
pub use scanner::{LibraryScanner, ScanOptions, ScanReport};

/// Errors from the Zotero side of the pipeline
#[derive(Debug, Error)]
pub enum ZoteroError {
    #[error("Item with key {0} is not a PDF")]
    NotAPdf(String),

    #[error("Lookup of {key} failed: {reason}")]
    UpstreamLookup { key: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Zotero API returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Unexpected response shape: {0}")]
    Decode(String),
}

impl ZoteroError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ZoteroError::Http(e) => e.is_timeout() || e.is_connect(),
            ZoteroError::Status { status, .. } => *status == 429 || *status >= 500,
            ZoteroError::UpstreamLookup { .. }
            | ZoteroError::NotAPdf(_)
            | ZoteroError::Decode(_) => false,
        }
    }
}

/// Result type for Zotero operations
pub type ZoteroResult<T> = Result<T, ZoteroError>;

/// Read-only access to a Zotero library
#[async_trait]
pub trait ZoteroApi: Send + Sync {
    /// One page of the library's collections
    async fn collections(&self, start: usize, limit: usize) -> ZoteroResult<Vec<RawRecord>>;

    /// One page of a collection's items
    async fn collection_items(
        &self,
        collection_key: &str,
        start: usize,
        limit: usize,
    ) -> ZoteroResult<Vec<RawRecord>>;

    /// A single item by key
    async fn item(&self, item_key: &str) -> ZoteroResult<RawRecord>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let status = |status| ZoteroError::Status {
            status,
            url: "https://api.zotero.org/users/1/items/X".to_string(),
        };

        assert!(status(503).is_transient());
        assert!(status(429).is_transient());
        assert!(!status(404).is_transient());
        assert!(!status(403).is_transient());
        assert!(!ZoteroError::NotAPdf("X".to_string()).is_transient());
    }
}
