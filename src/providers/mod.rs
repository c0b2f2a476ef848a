//! Embeddings and vector store selection.
//!
//! Each supported backend is an enum variant that validates its own
//! parameters on construction. Nothing here talks to the network.

pub mod embeddings;
pub mod vector_store;

pub use embeddings::{CohereModel, EmbeddingsProvider, EmbeddingsSettings, OpenAiModel};
pub use vector_store::VectorStoreSettings;
