//! Per-process state built once at startup.
//!
//! A `Session` owns the resolved configuration, the Zotero client and the
//! metadata cache handle. Commands borrow it; nothing is initialised lazily
//! behind their back.

use anyhow::Result;

use crate::config::{load_config, ConfigurationError, ResolvedConfig};
use crate::metastore::MetaStore;
use crate::zotero::{LibraryScanner, ZoteroClient};

pub struct Session {
    config: ResolvedConfig,
    client: Option<ZoteroClient>,
    store: MetaStore,
}

impl Session {
    /// Build a session from a resolved configuration.
    ///
    /// The Zotero client is only created when a library id is configured,
    /// so cache-only commands work without Zotero credentials.
    pub fn new(config: ResolvedConfig) -> Result<Self> {
        let client = match config.zotero_settings() {
            Ok(settings) => Some(ZoteroClient::new(settings)?),
            Err(e) => {
                tracing::debug!("Zotero client not configured: {}", e);
                None
            }
        };
        let store = MetaStore::new(&config.cache_path);

        Ok(Self {
            config,
            client,
            store,
        })
    }

    /// Load configuration from the environment and build a session
    pub fn from_env() -> Result<Self> {
        Self::new(load_config()?)
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn store(&self) -> &MetaStore {
        &self.store
    }

    pub fn client(&self) -> Result<&ZoteroClient, ConfigurationError> {
        match &self.client {
            Some(client) => Ok(client),
            None => Err(self
                .config
                .zotero_settings()
                .err()
                .unwrap_or_else(|| ConfigurationError::Missing("ZOTERO_LIBRARY_ID".to_string()))),
        }
    }

    /// Scanner over the configured library
    pub fn scanner(&self) -> Result<LibraryScanner<'_>, ConfigurationError> {
        Ok(LibraryScanner::new(
            self.client()?,
            self.config.zotero.storage_root.clone(),
            self.config.scan.clone(),
        ))
    }
}
