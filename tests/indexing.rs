//! Indexing and Retrieval Integration Tests
//!
//! Drives pending cache rows through in-memory loader, embedder and index
//! fakes, then answers a question over the result.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;
use zotrag::domain::{Item, RawRecord};
use zotrag::metastore::MetaStore;
use zotrag::rag::{
    ask, Answer, Answerer, Chunk, ChunkingParams, DocumentLoader, Embedder, IndexEntry, Indexer,
    Metadata, Passage, RagError, RagResult, Retriever, SearchFilter, Turn, VectorIndex,
};

/// Serves pre-split pages per file path
#[derive(Default)]
struct FakeLoader {
    documents: HashMap<PathBuf, Vec<&'static str>>,
    seen_params: Mutex<Vec<ChunkingParams>>,
}

impl DocumentLoader for FakeLoader {
    fn load(&self, path: &Path, params: &ChunkingParams) -> RagResult<Vec<Chunk>> {
        self.seen_params.lock().unwrap().push(*params);

        let pages = self.documents.get(path).ok_or_else(|| RagError::Load {
            path: path.display().to_string(),
            reason: "file not found".to_string(),
        })?;

        Ok(pages
            .iter()
            .enumerate()
            .map(|(page, text)| Chunk {
                text: text.to_string(),
                page,
                metadata: Metadata::from([("source".to_string(), json!(path.display().to_string()))]),
            })
            .collect())
    }
}

/// Bag-of-keywords embedding over a tiny vocabulary
struct KeywordEmbedder;

const VOCABULARY: [&str; 3] = ["attention", "entropy", "graph"];

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> RagResult<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                VOCABULARY
                    .iter()
                    .map(|word| lower.matches(word).count() as f32)
                    .collect()
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        VOCABULARY.len()
    }
}

/// Brute-force dot-product index
#[derive(Default)]
struct MemoryIndex {
    entries: Mutex<Vec<IndexEntry>>,
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn add(&self, entries: Vec<IndexEntry>) -> RagResult<()> {
        self.entries.lock().unwrap().extend(entries);
        Ok(())
    }

    async fn similarity_search(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&SearchFilter>,
    ) -> RagResult<Vec<Passage>> {
        let entries = self.entries.lock().unwrap();
        let mut scored: Vec<(f32, &IndexEntry)> = entries
            .iter()
            .filter(|e| filter.map_or(true, |f| f.matches(&e.metadata)))
            .map(|e| (e.vector.iter().zip(vector).map(|(a, b)| a * b).sum(), e))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(_, e)| Passage {
                text: e.text.clone(),
                metadata: e.metadata.clone(),
            })
            .collect())
    }
}

/// Answers with the key of the best passage
struct EchoAnswerer;

#[async_trait]
impl Answerer for EchoAnswerer {
    async fn answer(
        &self,
        query: &str,
        history: &[Turn],
        retriever: &Retriever<'_>,
    ) -> RagResult<Answer> {
        let sources = retriever.retrieve(query).await?;
        let best = sources
            .first()
            .and_then(Passage::key)
            .unwrap_or("nothing")
            .to_string();

        Ok(Answer {
            text: format!("{} (after {} turns)", best, history.len()),
            sources,
        })
    }
}

fn item(key: &str, title: &str) -> Item {
    let attachment = RawRecord::new(json!({
        "key": key,
        "data": {
            "key": key,
            "title": title,
            "filename": "paper.pdf",
            "contentType": "application/pdf",
            "tags": [{"tag": "reading"}]
        }
    }));
    Item::from_records(attachment, None, Path::new("/storage")).unwrap()
}

fn pdf(key: &str) -> PathBuf {
    PathBuf::from(format!("/storage/{}/paper.pdf", key))
}

fn populated_store(temp: &TempDir) -> MetaStore {
    let store = MetaStore::new(temp.path().join("sqlite.db"));
    store.create().unwrap();
    store
        .upsert_many(&[
            item("ATTN0001", "Attention Is All You Need"),
            item("ENTR0002", "A Mathematical Theory of Communication"),
            item("MISS0003", "Lost PDF"),
        ])
        .unwrap();
    store
}

fn loader() -> FakeLoader {
    FakeLoader {
        documents: HashMap::from([
            (pdf("ATTN0001"), vec!["Self attention layers", "Multi-head attention"]),
            (pdf("ENTR0002"), vec!["Entropy of a source", "Graph of channel states"]),
        ]),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_index_pending_marks_embedded_and_skips_failures() {
    let temp = TempDir::new().unwrap();
    let store = populated_store(&temp);
    let loader = loader();
    let embedder = KeywordEmbedder;
    let index = MemoryIndex::default();

    let report = Indexer::new(&store, &loader, &embedder, &index)
        .index_pending()
        .await
        .unwrap();

    assert_eq!(report.indexed, vec!["ATTN0001".to_string(), "ENTR0002".to_string()]);
    assert_eq!(report.chunks, 4);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "MISS0003");

    let pending: Vec<_> = store.pending().unwrap().into_iter().map(|r| r.key).collect();
    assert_eq!(pending, vec!["MISS0003".to_string()]);

    assert_eq!(
        *loader.seen_params.lock().unwrap(),
        vec![ChunkingParams::default(); 3]
    );
}

#[tokio::test]
async fn test_chunks_carry_document_metadata() {
    let temp = TempDir::new().unwrap();
    let store = populated_store(&temp);
    let loader = loader();
    let index = MemoryIndex::default();

    Indexer::new(&store, &loader, &KeywordEmbedder, &index)
        .index_pending()
        .await
        .unwrap();

    let entries = index.entries.lock().unwrap();
    let first = &entries[0];

    assert_eq!(first.metadata["key"], "ATTN0001");
    assert_eq!(first.metadata["title"], "Attention Is All You Need");
    assert_eq!(first.metadata["tags"], "reading");
    assert_eq!(first.metadata["creators"], "");
    assert_eq!(first.metadata["path"], "/storage/ATTN0001/paper.pdf");
    assert_eq!(first.metadata["page"], Value::from(0));
    assert_eq!(entries[1].metadata["page"], Value::from(1));
    assert!(first.metadata.contains_key("source"));
    assert_eq!(first.vector, vec![1.0, 0.0, 0.0]);
}

#[tokio::test]
async fn test_second_pass_has_nothing_new() {
    let temp = TempDir::new().unwrap();
    let store = populated_store(&temp);
    let loader = loader();
    let index = MemoryIndex::default();
    let indexer = Indexer::new(&store, &loader, &KeywordEmbedder, &index);

    indexer.index_pending().await.unwrap();
    let again = indexer.index_pending().await.unwrap();

    assert!(again.indexed.is_empty());
    assert_eq!(again.chunks, 0);
    assert_eq!(index.entries.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn test_ask_with_and_without_key_filter() {
    let temp = TempDir::new().unwrap();
    let store = populated_store(&temp);
    let loader = loader();
    let embedder = KeywordEmbedder;
    let index = MemoryIndex::default();
    Indexer::new(&store, &loader, &embedder, &index)
        .index_pending()
        .await
        .unwrap();

    let retriever = Retriever::new(&embedder, &index).with_k(2);
    let answer = ask(&EchoAnswerer, "What is attention?", &[], &retriever)
        .await
        .unwrap();
    assert_eq!(answer.text, "ATTN0001 (after 0 turns)");
    assert_eq!(answer.sources.len(), 2);

    let history = vec![Turn {
        question: "What is attention?".to_string(),
        answer: answer.text.clone(),
    }];
    let restricted = Retriever::new(&embedder, &index).with_keys(["ENTR0002"]);
    let answer = ask(&EchoAnswerer, "attention again", &history, &restricted)
        .await
        .unwrap();

    assert_eq!(answer.text, "ENTR0002 (after 1 turns)");
    let keys: BTreeSet<_> = answer.sources.iter().filter_map(Passage::key).collect();
    assert_eq!(keys, BTreeSet::from(["ENTR0002"]));
}
