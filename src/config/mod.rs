//! Configuration module
//!
//! Settings come from a TOML file (explicit path, else the per-user config
//! directory) and are then overridden by environment variables.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Environment variable pointing at an explicit config file
pub const CONFIG_ENV: &str = "RAGDOCS_CONFIG";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub query: QueryConfig,
}

/// Where the vector database lives and where it comes from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Local artifact directory (default: `<data dir>/vector_db`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Archive download URL (e.g. "https://host/database/download")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,

    /// Version endpoint; derived from `download_url` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_url: Option<String>,

    /// Install newer versions automatically on startup
    #[serde(default = "default_auto_update")]
    pub auto_update: bool,

    /// Name of the directory inside the archive holding the database
    #[serde(default = "default_payload_dir")]
    pub payload_dir: String,

    /// Primary database file that must stay writable
    #[serde(default = "default_critical_file")]
    pub critical_file: String,

    #[serde(default = "default_version_timeout")]
    pub version_timeout_secs: u64,

    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            download_url: None,
            version_url: None,
            auto_update: default_auto_update(),
            payload_dir: default_payload_dir(),
            critical_file: default_critical_file(),
            version_timeout_secs: default_version_timeout(),
            download_timeout_secs: default_download_timeout(),
        }
    }
}

fn default_auto_update() -> bool {
    true
}

fn default_payload_dir() -> String {
    "vector_db".to_string()
}

fn default_critical_file() -> String {
    "index.sqlite3".to_string()
}

fn default_version_timeout() -> u64 {
    10
}

fn default_download_timeout() -> u64 {
    300
}

/// Embedding API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            endpoint: default_endpoint(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

fn default_model() -> String {
    "voyage-code-3".to_string()
}

fn default_endpoint() -> String {
    "https://api.voyageai.com/v1/embeddings".to_string()
}

fn default_embedding_timeout() -> u64 {
    30
}

/// Query defaults exposed through the MCP tools
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Version reported when the database holds no versions
    #[serde(default = "default_version")]
    pub default_version: String,

    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            default_version: default_version(),
            languages: default_languages(),
        }
    }
}

fn default_top_k() -> usize {
    8
}

fn default_version() -> String {
    "2025".to_string()
}

fn default_languages() -> Vec<String> {
    ["Java", "Python", "C++", "cpp", "API Reference"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Config {
    /// Load config from an explicit file or the default location, then
    /// apply environment overrides
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_from(path)?,
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Self::load_from(&path)?,
                _ => Self::default(),
            },
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load config from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production). Empty values count as unset.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = get("RAGDOCS_DB_PATH") {
            self.database.path = Some(PathBuf::from(path));
        }
        if let Some(url) = get("RAGDOCS_DB_URL") {
            self.database.download_url = Some(url);
        }
        if let Some(flag) = get("RAGDOCS_AUTO_UPDATE") {
            self.database.auto_update = parse_bool(&flag);
        }
        if let Some(key) = get("VOYAGE_API_KEY").or_else(|| get("RAGDOCS_VOYAGE_API_KEY")) {
            self.embedding.api_key = Some(key);
        }
        if let Some(model) = get("VOYAGE_MODEL") {
            self.embedding.model = model;
        }
        if let Some(version) = get("RAGDOCS_DEFAULT_VERSION") {
            self.query.default_version = version;
        }
    }

    /// Per-user config file (`<config dir>/config.toml`)
    pub fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Local artifact directory
    pub fn database_path(&self) -> PathBuf {
        if let Some(path) = &self.database.path {
            return path.clone();
        }

        project_dirs()
            .map(|dirs| dirs.data_dir().join("vector_db"))
            .unwrap_or_else(|| PathBuf::from("vector_db"))
    }

    /// Archive download URL, if one is configured
    pub fn download_url(&self) -> Option<&str> {
        self.database
            .download_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Version endpoint: explicit setting, else derived from the download URL
    pub fn version_url(&self) -> Option<String> {
        if let Some(url) = self
            .database
            .version_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
        {
            return Some(url.to_string());
        }

        self.download_url().and_then(crate::remote::version_url_for)
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "ragdocs")
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}
