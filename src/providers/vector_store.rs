//! Vector store selection.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::{ConfigurationError, Credentials};

/// A validated vector store backend
#[derive(Clone, PartialEq, Eq)]
pub enum VectorStoreSettings {
    /// Local index persisted on disk
    Chroma {
        collection: String,
        persist_directory: PathBuf,
    },
    /// Hosted index
    Pinecone {
        index: String,
        api_key: String,
        environment: String,
        dimension: usize,
    },
}

impl VectorStoreSettings {
    /// Accepted values for `VECTOR_STORE_TYPE`
    pub const TYPES: [&'static str; 2] = ["chroma", "pinecone"];

    /// Validate a backend selection; `dimension` comes from the embeddings model
    pub fn new(
        store_type: &str,
        collection: &str,
        persist_directory: Option<&Path>,
        credentials: &Credentials,
        environment: &str,
        dimension: usize,
    ) -> Result<Self, ConfigurationError> {
        if !Self::TYPES.contains(&store_type) {
            return Err(ConfigurationError::UnknownProvider {
                setting: "VECTOR_STORE_TYPE",
                value: store_type.to_string(),
                allowed: Self::TYPES.to_vec(),
            });
        }

        if collection.is_empty() {
            return Err(ConfigurationError::Missing("VECTOR_STORE_INDEX".to_string()));
        }

        match store_type {
            "chroma" => {
                let persist_directory = persist_directory
                    .filter(|p| !p.as_os_str().is_empty())
                    .ok_or_else(|| {
                        ConfigurationError::Missing("VECTOR_STORE_PERSIST_DIR".to_string())
                    })?;

                Ok(VectorStoreSettings::Chroma {
                    collection: collection.to_string(),
                    persist_directory: persist_directory.to_path_buf(),
                })
            }
            _ => {
                let api_key = credentials
                    .get("PINECONE_API_KEY")
                    .filter(|k| !k.is_empty())
                    .ok_or_else(|| {
                        ConfigurationError::MissingCredential("PINECONE_API_KEY".to_string())
                    })?;

                if dimension == 0 {
                    return Err(ConfigurationError::Invalid {
                        name: "dimension".to_string(),
                        reason: "must be positive for a Pinecone index".to_string(),
                    });
                }

                Ok(VectorStoreSettings::Pinecone {
                    index: collection.to_string(),
                    api_key: api_key.to_string(),
                    environment: environment.to_string(),
                    dimension,
                })
            }
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            VectorStoreSettings::Chroma { .. } => "chroma",
            VectorStoreSettings::Pinecone { .. } => "pinecone",
        }
    }

    /// Collection (Chroma) or index (Pinecone) name
    pub fn collection_name(&self) -> &str {
        match self {
            VectorStoreSettings::Chroma { collection, .. } => collection,
            VectorStoreSettings::Pinecone { index, .. } => index,
        }
    }

    /// Create the local persist directory when the backend needs one
    pub fn prepare(&self) -> std::io::Result<()> {
        if let VectorStoreSettings::Chroma {
            persist_directory, ..
        } = self
        {
            if !persist_directory.exists() {
                std::fs::create_dir_all(persist_directory)?;
                tracing::info!("Created directory: {}", persist_directory.display());
            }
        }
        Ok(())
    }
}

impl fmt::Debug for VectorStoreSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VectorStoreSettings::Chroma {
                collection,
                persist_directory,
            } => f
                .debug_struct("Chroma")
                .field("collection", collection)
                .field("persist_directory", persist_directory)
                .finish(),
            VectorStoreSettings::Pinecone {
                index,
                environment,
                dimension,
                ..
            } => f
                .debug_struct("Pinecone")
                .field("index", index)
                .field("api_key", &"<redacted>")
                .field("environment", environment)
                .field("dimension", dimension)
                .finish(),
        }
    }
}
