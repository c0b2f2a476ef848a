//! HTTP client for the Zotero Web API v3.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ZoteroApi, ZoteroError, ZoteroResult};
use crate::config::ConfigurationError;
use crate::domain::RawRecord;

/// Default Zotero Web API base URL
pub const DEFAULT_API_URL: &str = "https://api.zotero.org";

/// Owner of a Zotero library
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryType {
    #[default]
    User,
    Group,
}

impl LibraryType {
    /// URL path segment for this library type
    pub fn path_segment(&self) -> &'static str {
        match self {
            LibraryType::User => "users",
            LibraryType::Group => "groups",
        }
    }
}

impl std::fmt::Display for LibraryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LibraryType::User => write!(f, "user"),
            LibraryType::Group => write!(f, "group"),
        }
    }
}

impl std::str::FromStr for LibraryType {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(LibraryType::User),
            "group" => Ok(LibraryType::Group),
            _ => Err(ConfigurationError::Invalid {
                name: "ZOTERO_LIBRARY_TYPE".to_string(),
                reason: format!("'{}' must be one of [user, group]", s),
            }),
        }
    }
}

/// Connection settings for a Zotero library
#[derive(Debug, Clone)]
pub struct ZoteroSettings {
    pub library_id: String,
    pub library_type: LibraryType,
    pub api_key: Option<String>,
    pub api_url: String,
    pub timeout: Duration,
}

/// Zotero Web API client
pub struct ZoteroClient {
    client: Client,
    settings: ZoteroSettings,
}

impl ZoteroClient {
    /// Create a client; each request is bounded by `settings.timeout`
    pub fn new(settings: ZoteroSettings) -> ZoteroResult<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("zotrag/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, settings })
    }

    /// Build a URL below the library root
    fn library_url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.settings.api_url.trim_end_matches('/'),
            self.settings.library_type.path_segment(),
            self.settings.library_id,
            path
        )
    }

    /// GET a JSON document
    async fn get_json(&self, url: &str, query: &[(&str, usize)]) -> ZoteroResult<Value> {
        let mut request = self
            .client
            .get(url)
            .header("Zotero-API-Version", "3")
            .query(&[("format", "json")])
            .query(query);

        if let Some(api_key) = &self.settings.api_key {
            request = request.header("Zotero-API-Key", api_key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(ZoteroError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.json().await?)
    }

    /// GET a page of records
    async fn get_page(&self, url: &str, start: usize, limit: usize) -> ZoteroResult<Vec<RawRecord>> {
        match self.get_json(url, &[("start", start), ("limit", limit)]).await? {
            Value::Array(records) => Ok(records.into_iter().map(RawRecord::new).collect()),
            other => Err(ZoteroError::Decode(format!(
                "expected a JSON array from {}, got {}",
                url,
                type_name(&other)
            ))),
        }
    }
}

#[async_trait::async_trait]
impl ZoteroApi for ZoteroClient {
    async fn collections(&self, start: usize, limit: usize) -> ZoteroResult<Vec<RawRecord>> {
        let url = self.library_url("collections");
        self.get_page(&url, start, limit).await
    }

    async fn collection_items(
        &self,
        collection_key: &str,
        start: usize,
        limit: usize,
    ) -> ZoteroResult<Vec<RawRecord>> {
        let url = self.library_url(&format!("collections/{}/items", collection_key));
        self.get_page(&url, start, limit).await
    }

    async fn item(&self, item_key: &str) -> ZoteroResult<RawRecord> {
        let url = self.library_url(&format!("items/{}", item_key));
        match self.get_json(&url, &[]).await? {
            record @ Value::Object(_) => Ok(RawRecord::new(record)),
            other => Err(ZoteroError::Decode(format!(
                "expected a JSON object from {}, got {}",
                url,
                type_name(&other)
            ))),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
