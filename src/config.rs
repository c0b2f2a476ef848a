//! Configuration for zotrag.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (ZOTERO_*, EMBEDDINGS_*, VECTOR_STORE_*, ...)
//! 2. A `.env` file in the current directory (loaded once by `main`)
//! 3. Config file (.zotrag/config.yaml)
//! 4. Defaults (~/Zotero/storage, ~/.zotrag/library/sqlite.db)
//!
//! Config file discovery:
//! - Searches current directory and parents for .zotrag/config.yaml
//! - Paths in config file are relative to the project root (parent of .zotrag/)
//!
//! API keys are only read from the environment.
//!
//! The configuration is resolved once at startup and passed down explicitly;
//! there is no process-wide cache to reset.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

use crate::providers::{EmbeddingsSettings, VectorStoreSettings};
use crate::zotero::client::DEFAULT_API_URL;
use crate::zotero::{LibraryType, ScanOptions, ZoteroSettings};

/// Invalid or incomplete configuration, raised before any network or disk access
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("{setting} must be one of {allowed:?}, got '{value}'")]
    UnknownProvider {
        setting: &'static str,
        value: String,
        allowed: Vec<&'static str>,
    },

    #[error("Invalid model for {provider}: '{model}'. Must be one of: {allowed:?}")]
    UnknownModel {
        provider: String,
        model: String,
        allowed: Vec<&'static str>,
    },

    #[error("Missing required environment variable: {0}")]
    MissingCredential(String),

    #[error("Missing required setting: {0}")]
    Missing(String),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: String, reason: String },
}

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub zotero: ZoteroSection,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub embeddings: EmbeddingsSection,
    #[serde(default)]
    pub vector_store: VectorStoreSection,
    #[serde(default)]
    pub scan: Option<ScanOptions>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ZoteroSection {
    pub library_id: Option<String>,
    pub library_type: Option<String>,
    pub api_url: Option<String>,
    /// Zotero storage directory (relative to project root)
    pub storage_root: Option<String>,
    pub default_collection: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheSection {
    /// Metadata cache database (relative to project root)
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmbeddingsSection {
    pub provider: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VectorStoreSection {
    pub provider: Option<String>,
    pub index: Option<String>,
    /// Local index directory (relative to project root)
    pub persist_directory: Option<String>,
    pub environment: Option<String>,
}

/// API keys for the hosted services
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub openai_api_key: Option<String>,
    pub cohere_api_key: Option<String>,
    pub pinecone_api_key: Option<String>,
}

impl Credentials {
    /// Look up a key by its environment variable name
    pub fn get(&self, env_name: &str) -> Option<&str> {
        match env_name {
            "OPENAI_API_KEY" => self.openai_api_key.as_deref(),
            "COHERE_API_KEY" => self.cohere_api_key.as_deref(),
            "PINECONE_API_KEY" => self.pinecone_api_key.as_deref(),
            _ => None,
        }
    }
}

/// Resolved Zotero settings
#[derive(Debug, Clone)]
pub struct ZoteroConfig {
    pub library_id: Option<String>,
    pub library_type: LibraryType,
    pub api_key: Option<String>,
    pub api_url: String,
    pub storage_root: PathBuf,
    pub default_collection: Option<String>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub zotero: ZoteroConfig,

    /// Path of the metadata cache database
    pub cache_path: PathBuf,

    /// Embeddings provider and model names, validated on demand
    pub embeddings_provider: Option<String>,
    pub embeddings_model: Option<String>,

    /// Vector store selection, validated on demand
    pub vector_store_provider: Option<String>,
    pub vector_store_index: Option<String>,
    pub vector_store_persist_directory: Option<PathBuf>,
    pub pinecone_environment: String,

    pub credentials: Credentials,

    pub scan: ScanOptions,

    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl ResolvedConfig {
    /// Zotero connection settings; the library id is required
    pub fn zotero_settings(&self) -> Result<ZoteroSettings, ConfigurationError> {
        let library_id = self
            .zotero
            .library_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ConfigurationError::Missing("ZOTERO_LIBRARY_ID".to_string()))?;

        Ok(ZoteroSettings {
            library_id,
            library_type: self.zotero.library_type,
            api_key: self.zotero.api_key.clone(),
            api_url: self.zotero.api_url.clone(),
            timeout: self.scan.timeout(),
        })
    }

    /// Validated embeddings provider selection
    pub fn embeddings_settings(&self) -> Result<EmbeddingsSettings, ConfigurationError> {
        let provider = self
            .embeddings_provider
            .as_deref()
            .ok_or_else(|| ConfigurationError::Missing("EMBEDDINGS_TYPE".to_string()))?;
        let model = self
            .embeddings_model
            .as_deref()
            .ok_or_else(|| ConfigurationError::Missing("EMBEDDINGS_MODEL".to_string()))?;

        EmbeddingsSettings::new(provider, model, &self.credentials)
    }

    /// Validated vector store selection for the given embeddings
    pub fn vector_store_settings(
        &self,
        embeddings: &EmbeddingsSettings,
    ) -> Result<VectorStoreSettings, ConfigurationError> {
        let provider = self
            .vector_store_provider
            .as_deref()
            .ok_or_else(|| ConfigurationError::Missing("VECTOR_STORE_TYPE".to_string()))?;

        VectorStoreSettings::new(
            provider,
            self.vector_store_index.as_deref().unwrap_or_default(),
            self.vector_store_persist_directory.as_deref(),
            &self.credentials,
            &self.pinecone_environment,
            embeddings.dimension(),
        )
    }

    /// Collection to scan when none is given
    pub fn default_collection(&self) -> Option<&str> {
        self.zotero.default_collection.as_deref()
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".zotrag").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the project root or start with `~`
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    if let Some(rest) = path_str.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }

    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Load configuration from the process environment and the config file.
///
/// `.env` is read once at startup in `main`, so its values are already in
/// the process environment here.
pub fn load_config() -> Result<ResolvedConfig> {
    let config_file = find_config_file();
    let env: HashMap<String, String> = std::env::vars().collect();
    resolve_config(config_file, |name| env.get(name).cloned())
}

/// Resolve configuration from an optional config file and an environment lookup
pub fn resolve_config<F>(config_file: Option<PathBuf>, env: F) -> Result<ResolvedConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let home = dirs::home_dir().context("Failed to determine home directory")?;
    let env = |name: &str| env(name).filter(|v| !v.is_empty());

    let (file, base_dir) = match &config_file {
        Some(path) => {
            let file = load_config_file(path)?;
            // Base directory is the parent of .zotrag/ (i.e., grandparent of config.yaml)
            let base_dir = path
                .parent()
                .and_then(|p| p.parent())
                .unwrap_or(Path::new("."))
                .to_path_buf();
            (file, base_dir)
        }
        None => (ConfigFile::default(), std::env::current_dir().unwrap_or_default()),
    };

    let library_type = match env("ZOTERO_LIBRARY_TYPE").or(file.zotero.library_type.clone()) {
        Some(value) => value.parse()?,
        None => LibraryType::User,
    };

    let storage_root = env("ZOTERO_STORAGE_ROOT")
        .or(file.zotero.storage_root.clone())
        .map(|p| resolve_path(&base_dir, &p))
        .unwrap_or_else(|| home.join("Zotero").join("storage"));

    let cache_path = env("ZOTERO_APP_SQLITE")
        .or(file.cache.path.clone())
        .map(|p| resolve_path(&base_dir, &p))
        .unwrap_or_else(|| home.join(".zotrag").join("library").join("sqlite.db"));

    let vector_store_persist_directory = env("VECTOR_STORE_PERSIST_DIR")
        .or(file.vector_store.persist_directory.clone())
        .map(|p| resolve_path(&base_dir, &p));

    Ok(ResolvedConfig {
        zotero: ZoteroConfig {
            library_id: env("ZOTERO_LIBRARY_ID").or(file.zotero.library_id),
            library_type,
            api_key: env("ZOTERO_API_KEY"),
            api_url: env("ZOTERO_API_URL")
                .or(file.zotero.api_url)
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            storage_root,
            default_collection: env("ZOTERO_DEFAULT_COLLECTION").or(file.zotero.default_collection),
        },
        cache_path,
        embeddings_provider: env("EMBEDDINGS_TYPE").or(file.embeddings.provider),
        embeddings_model: env("EMBEDDINGS_MODEL").or(file.embeddings.model),
        vector_store_provider: env("VECTOR_STORE_TYPE").or(file.vector_store.provider),
        vector_store_index: env("VECTOR_STORE_INDEX").or(file.vector_store.index),
        vector_store_persist_directory,
        pinecone_environment: env("PINECONE_ENVIRONMENT")
            .or(file.vector_store.environment)
            .unwrap_or_else(|| "gcp-starter".to_string()),
        credentials: Credentials {
            openai_api_key: env("OPENAI_API_KEY"),
            cohere_api_key: env("COHERE_API_KEY"),
            pinecone_api_key: env("PINECONE_API_KEY"),
        },
        scan: file.scan.unwrap_or_default(),
        config_file,
    })
}
