//! Indexing and question answering over the metadata cache.
//!
//! The heavy lifting (PDF text extraction, embedding, vector search, answer
//! generation) belongs to external services. This module defines the seams
//! they plug into and the glue that drives them from cache rows.

pub mod indexer;
pub mod retriever;

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::metastore::MetaStoreError;

pub use indexer::{document_metadata, IndexReport, Indexer};
pub use retriever::{ask, Retriever};

/// Errors raised by the indexing and answering collaborators
#[derive(Debug, Error)]
pub enum RagError {
    #[error("Failed to load {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("Embedding failed: {0}")]
    Embed(String),

    #[error("Vector index error: {0}")]
    Index(String),

    #[error("Answering failed: {0}")]
    Answer(String),

    #[error(transparent)]
    MetaStore(#[from] MetaStoreError),
}

/// Result type for indexing and answering
pub type RagResult<T> = Result<T, RagError>;

/// Free-form metadata attached to chunks and passages
pub type Metadata = BTreeMap<String, Value>;

/// Text splitting parameters, in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingParams {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}

impl Default for ChunkingParams {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// A piece of extracted document text
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub text: String,
    /// Zero-based page number the chunk starts on
    pub page: usize,
    pub metadata: Metadata,
}

/// A chunk ready for the vector index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub text: String,
    pub metadata: Metadata,
    pub vector: Vec<f32>,
}

/// A retrieved chunk with its metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Passage {
    pub text: String,
    pub metadata: Metadata,
}

impl Passage {
    /// Item key the passage was indexed under
    pub fn key(&self) -> Option<&str> {
        self.metadata.get("key").and_then(Value::as_str)
    }
}

/// Restricts a similarity search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchFilter {
    /// Only passages whose `key` metadata is one of these
    KeyIn(Vec<String>),
}

impl SearchFilter {
    pub fn matches(&self, metadata: &Metadata) -> bool {
        match self {
            SearchFilter::KeyIn(keys) => metadata
                .get("key")
                .and_then(Value::as_str)
                .map(|key| keys.iter().any(|k| k == key))
                .unwrap_or(false),
        }
    }
}

/// One prior question and its answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

/// A generated answer with the passages it was grounded on
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<Passage>,
}

/// Extracts and splits the text of a document
pub trait DocumentLoader: Send + Sync {
    fn load(&self, path: &Path, params: &ChunkingParams) -> RagResult<Vec<Chunk>>;
}

/// Turns text into fixed-length vectors
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed several texts, preserving order
    async fn embed_batch(&self, texts: &[&str]) -> RagResult<Vec<Vec<f32>>>;

    /// Embed one text
    async fn embed(&self, text: &str) -> RagResult<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .pop()
            .ok_or_else(|| RagError::Embed("provider returned no vector".to_string()))
    }

    fn dimension(&self) -> usize;
}

/// Nearest-neighbour index over embedded chunks
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn add(&self, entries: Vec<IndexEntry>) -> RagResult<()>;

    async fn similarity_search(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&SearchFilter>,
    ) -> RagResult<Vec<Passage>>;
}

/// Conversational answering over a retriever
#[async_trait]
pub trait Answerer: Send + Sync {
    async fn answer(
        &self,
        query: &str,
        history: &[Turn],
        retriever: &Retriever<'_>,
    ) -> RagResult<Answer>;
}
