//! zotrag - Zotero PDF library scanner and metadata cache
//!
//! Scans a Zotero collection for PDF attachments, resolves each one against
//! its bibliographic parent, and mirrors the result into a local SQLite
//! cache that tracks which documents have been indexed for retrieval.
//!
//! # Modules
//!
//! - `zotero`: Web API client, retry policy and collection scanner
//! - `domain`: Data structures (RawRecord, Item, Collection)
//! - `metastore`: SQLite metadata cache
//! - `providers`: Embeddings and vector store selection
//! - `rag`: Indexing and answering seams
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # List collections
//! zotrag collections
//!
//! # Scan a collection into the cache
//! zotrag scan IBWXQ7U3
//!
//! # Show items waiting to be embedded
//! zotrag cache pending
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod metastore;
pub mod providers;
pub mod rag;
pub mod session;
pub mod zotero;

// Re-export main types at crate root for convenience
pub use config::{ConfigurationError, ResolvedConfig};
pub use domain::{Collection, Collections, Item, RawRecord};
pub use metastore::{LibraryRecord, Listing, MetaStore, MetaStoreError};
pub use session::Session;
pub use zotero::{LibraryScanner, ZoteroApi, ZoteroClient, ZoteroError};
