//! Domain types for zotrag.
//!
//! This module contains the core data structures:
//! - RawRecord: a Zotero API record as received
//! - Item: a PDF attachment resolved against its parent
//! - Collection: a Zotero collection and the items scanned from it

pub mod collection;
pub mod item;
pub mod record;

// Re-export commonly used types
pub use collection::{Collection, Collections};
pub use item::{
    creator_index, creator_names, join_set, split_set, tag_names, CreatorWork, Item, ParentDetails,
};
pub use record::{RawRecord, PDF_CONTENT_TYPE};
