//! Similarity retrieval and answering.

use super::{Answer, Answerer, Embedder, Passage, RagResult, SearchFilter, Turn, VectorIndex};

/// Default number of passages per query
pub const DEFAULT_TOP_K: usize = 4;

/// Embeds a query and searches the index
pub struct Retriever<'a> {
    embedder: &'a dyn Embedder,
    index: &'a dyn VectorIndex,
    filter: Option<SearchFilter>,
    k: usize,
}

impl<'a> Retriever<'a> {
    pub fn new(embedder: &'a dyn Embedder, index: &'a dyn VectorIndex) -> Self {
        Self {
            embedder,
            index,
            filter: None,
            k: DEFAULT_TOP_K,
        }
    }

    /// Only search documents with these keys
    pub fn with_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter = Some(SearchFilter::KeyIn(keys.into_iter().map(Into::into).collect()));
        self
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k.max(1);
        self
    }

    pub fn filter(&self) -> Option<&SearchFilter> {
        self.filter.as_ref()
    }

    pub async fn retrieve(&self, query: &str) -> RagResult<Vec<Passage>> {
        let vector = self.embedder.embed(query).await?;
        let passages = self
            .index
            .similarity_search(&vector, self.k, self.filter.as_ref())
            .await?;

        tracing::debug!("Retrieved {} passages for query", passages.len());
        Ok(passages)
    }
}

/// Answer `query` in the context of `history`
pub async fn ask(
    answerer: &dyn Answerer,
    query: &str,
    history: &[Turn],
    retriever: &Retriever<'_>,
) -> RagResult<Answer> {
    tracing::info!("Answering with {} prior turns", history.len());
    answerer.answer(query, history, retriever).await
}
