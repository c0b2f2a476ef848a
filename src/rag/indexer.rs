//! Drives pending cache rows through load, embed and index.

use serde_json::Value;

use super::{
    ChunkingParams, DocumentLoader, Embedder, IndexEntry, Metadata, RagError, RagResult,
    VectorIndex,
};
use crate::domain::join_set;
use crate::metastore::{LibraryRecord, MetaStore};

/// Outcome of an indexing pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// Keys marked as embedded
    pub indexed: Vec<String>,

    /// Keys that failed, with the reason; they stay pending
    pub failed: Vec<(String, String)>,

    /// Chunks added to the index
    pub chunks: usize,
}

/// Metadata every chunk of a document carries
pub fn document_metadata(record: &LibraryRecord) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("key".to_string(), Value::from(record.key.clone()));
    metadata.insert("title".to_string(), Value::from(record.title.clone()));
    metadata.insert("creators".to_string(), Value::from(join_set(&record.creators)));
    metadata.insert("tags".to_string(), Value::from(join_set(&record.tags)));
    metadata.insert(
        "url".to_string(),
        Value::from(record.url.clone().unwrap_or_default()),
    );
    metadata.insert(
        "path".to_string(),
        Value::from(record.path.to_string_lossy().into_owned()),
    );
    metadata
}

/// Indexes unembedded documents and records progress in the cache
pub struct Indexer<'a> {
    store: &'a MetaStore,
    loader: &'a dyn DocumentLoader,
    embedder: &'a dyn Embedder,
    index: &'a dyn VectorIndex,
    params: ChunkingParams,
}

impl<'a> Indexer<'a> {
    pub fn new(
        store: &'a MetaStore,
        loader: &'a dyn DocumentLoader,
        embedder: &'a dyn Embedder,
        index: &'a dyn VectorIndex,
    ) -> Self {
        Self {
            store,
            loader,
            embedder,
            index,
            params: ChunkingParams::default(),
        }
    }

    pub fn with_params(mut self, params: ChunkingParams) -> Self {
        self.params = params;
        self
    }

    /// Index every pending row, one document at a time.
    ///
    /// A failing document is logged and left pending; cache errors abort.
    pub async fn index_pending(&self) -> RagResult<IndexReport> {
        let pending = self.store.pending()?;
        tracing::info!("{} documents pending", pending.len());

        let mut report = IndexReport::default();

        for record in &pending {
            match self.index_record(record).await {
                Ok(chunks) => {
                    self.store.mark_embedded([record.key.as_str()])?;
                    tracing::info!("Indexed {} ({} chunks)", record.key, chunks);
                    report.chunks += chunks;
                    report.indexed.push(record.key.clone());
                }
                Err(RagError::MetaStore(e)) => return Err(e.into()),
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", record.key, e);
                    report.failed.push((record.key.clone(), e.to_string()));
                }
            }
        }

        Ok(report)
    }

    /// Load, embed and add one document; returns the chunk count
    pub async fn index_record(&self, record: &LibraryRecord) -> RagResult<usize> {
        let chunks = self.loader.load(&record.path, &self.params)?;
        tracing::debug!("Loaded {} chunks from {}", chunks.len(), record.path.display());

        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        if vectors.len() != chunks.len() {
            return Err(RagError::Embed(format!(
                "expected {} vectors, got {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let dimension = self.embedder.dimension();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(RagError::Embed(format!(
                "expected dimension {}, got {}",
                dimension,
                bad.len()
            )));
        }

        let shared = document_metadata(record);
        let entries: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| {
                let mut metadata = chunk.metadata;
                metadata.insert("page".to_string(), Value::from(chunk.page));
                metadata.extend(shared.clone());
                IndexEntry {
                    text: chunk.text,
                    metadata,
                    vector,
                }
            })
            .collect();

        let count = entries.len();
        self.index.add(entries).await?;
        Ok(count)
    }
}
