//! Runtime configuration for the sync engine.
//!
//! A `ShelfConfig` is read from a JSON file and then overridden by `SHELF_*`
//! environment variables. Locating the file is the client's concern.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";
const DEFAULT_DATABASE: &str = "(default)";
const DEFAULT_COLLECTION: &str = "products";
const DEFAULT_PAGE_SIZE: u32 = 300;
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CONCURRENCY: usize = 8;

/// Environment variables that override file values
pub const ENV_DB_PATH: &str = "SHELF_DB_PATH";
pub const ENV_REMOTE_URL: &str = "SHELF_REMOTE_URL";
pub const ENV_PROJECT_ID: &str = "SHELF_PROJECT_ID";
pub const ENV_COLLECTION: &str = "SHELF_COLLECTION";
pub const ENV_AUTH_TOKEN: &str = "SHELF_AUTH_TOKEN";
pub const ENV_CONCURRENCY: &str = "SHELF_CONCURRENCY";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ShelfConfig {
    /// Local SQLite file; clients pick a default when unset
    #[serde(default)]
    pub local_db_path: Option<PathBuf>,
    #[serde(default)]
    pub remote: RemoteConfig,
    /// Upper bound on records reconciled at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

/// Remote document collection settings.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RemoteConfig {
    /// API root, e.g. `https://firestore.googleapis.com/v1` or an emulator
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Passed through as a bearer token when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

const fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

const fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

impl Default for ShelfConfig {
    fn default() -> Self {
        Self {
            local_db_path: None,
            remote: RemoteConfig::default(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            project_id: None,
            database: default_database(),
            collection: default_collection(),
            auth_token: None,
            page_size: DEFAULT_PAGE_SIZE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RemoteConfig")
            .field("base_url", &self.base_url)
            .field("project_id", &self.project_id)
            .field("database", &self.database)
            .field("collection", &self.collection)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("page_size", &self.page_size)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl RemoteConfig {
    /// URL of the collection holding product documents
    pub fn collection_url(&self) -> Result<String> {
        self.validate()?;
        let project_id = self.project_id.as_deref().unwrap_or_default();
        Ok(format!(
            "{}/projects/{}/databases/{}/documents/{}",
            self.base_url.trim_end_matches('/'),
            project_id,
            self.database,
            self.collection
        ))
    }

    /// Per-request timeout
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check that the remote store can be addressed
    pub fn validate(&self) -> Result<()> {
        if !is_http_url(&self.base_url) {
            return Err(Error::Config(
                "remote.base_url must include http:// or https://".to_string(),
            ));
        }
        if normalize_text_option(self.project_id.clone()).is_none() {
            return Err(Error::Config(format!(
                "remote.project_id is required (set it in the config file or {ENV_PROJECT_ID})"
            )));
        }
        if self.database.trim().is_empty() || self.collection.trim().is_empty() {
            return Err(Error::Config(
                "remote.database and remote.collection must not be empty".to_string(),
            ));
        }
        if self.collection.contains('/') {
            return Err(Error::Config(
                "remote.collection must be a top-level collection id".to_string(),
            ));
        }
        if self.page_size == 0 || self.timeout_secs == 0 {
            return Err(Error::Config(
                "remote.page_size and remote.timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl ShelfConfig {
    /// Load from `path`; a missing file yields the defaults
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let mut config = serde_json::from_str::<Self>(&raw).map_err(|error| {
            Error::Config(format!("failed to parse {}: {error}", path.display()))
        })?;
        config.normalize();
        Ok(config)
    }

    /// Write to `path`, creating parent directories
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        std::fs::write(path, serde_json::to_string_pretty(&normalized)?)?;
        Ok(())
    }

    /// Apply `SHELF_*` overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable lookup
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let var = |name: &str| normalize_text_option(lookup(name));

        if let Some(path) = var(ENV_DB_PATH) {
            self.local_db_path = Some(PathBuf::from(path));
        }
        if let Some(url) = var(ENV_REMOTE_URL) {
            self.remote.base_url = url;
        }
        if let Some(project_id) = var(ENV_PROJECT_ID) {
            self.remote.project_id = Some(project_id);
        }
        if let Some(collection) = var(ENV_COLLECTION) {
            self.remote.collection = collection;
        }
        if let Some(token) = var(ENV_AUTH_TOKEN) {
            self.remote.auth_token = Some(token);
        }
        if let Some(concurrency) = var(ENV_CONCURRENCY) {
            self.concurrency = concurrency.parse().map_err(|_| {
                Error::Config(format!("{ENV_CONCURRENCY} must be a positive integer"))
            })?;
        }

        self.normalize();
        self.validate_local()
    }

    /// Check settings that do not involve the remote store
    pub fn validate_local(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::Config("concurrency must be at least 1".to_string()));
        }
        Ok(())
    }

    fn normalize(&mut self) {
        self.remote.base_url = self.remote.base_url.trim().trim_end_matches('/').to_string();
        self.remote.project_id = normalize_text_option(self.remote.project_id.take());
        self.remote.auth_token = normalize_text_option(self.remote.auth_token.take());
        self.remote.database = self.remote.database.trim().to_string();
        self.remote.collection = self.remote.collection.trim().to_string();
    }
}
