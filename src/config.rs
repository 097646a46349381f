//! Configuration management for query-batch.
//!
//! Handles loading configuration from TOML files and environment variables:
//! the store connection, batch-wide defaults and the query type definitions
//! that make up the registry.

use crate::batch::BatchOptions;
use crate::error::{BatchError, Result};
use crate::query::{QueryDefinition, QueryRegistry};
use crate::store::StoreBackend;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Store connection settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Defaults applied to every batch.
    #[serde(default)]
    pub defaults: Defaults,

    /// Query type definitions, keyed by query type.
    #[serde(default)]
    pub queries: BTreeMap<String, QueryDefinition>,
}

/// Batch-wide defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Defaults {
    /// Timezone for requests that do not set one.
    pub timezone: Option<String>,

    /// Website domain passed to post-processing plugins.
    pub website_domain: Option<String>,
}

/// Store connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    /// Store backend.
    #[serde(default)]
    pub backend: StoreBackend,

    /// HTTP endpoint, e.g. `http://localhost:8123`.
    pub url: Option<String>,

    /// Database name.
    pub database: Option<String>,

    /// Store user.
    pub user: Option<String>,

    /// Store password (prefer CLICKHOUSE_PASSWORD over the config file).
    pub password: Option<String>,

    /// Per-query timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: None,
            database: None,
            user: None,
            password: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl StoreConfig {
    /// Applies environment variables (CLICKHOUSE_URL, etc.) to unset fields.
    pub fn apply_env_defaults(&mut self) {
        self.apply_defaults_from(|key| std::env::var(key).ok());
    }

    fn apply_defaults_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.url.is_none() {
            self.url = lookup("CLICKHOUSE_URL");
        }
        if self.database.is_none() {
            self.database = lookup("CLICKHOUSE_DATABASE");
        }
        if self.user.is_none() {
            self.user = lookup("CLICKHOUSE_USER");
        }
        if self.password.is_none() {
            self.password = lookup("CLICKHOUSE_PASSWORD");
        }
    }

    /// Returns a display-safe string (no password) for logs.
    pub fn display_string(&self) -> String {
        let url = self.url.as_deref().unwrap_or("http://localhost:8123");
        let database = self.database.as_deref().unwrap_or("default");
        format!("{} {database} @ {url}", self.backend.as_str())
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("query-batch")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| BatchError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            BatchError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Builds the query registry from the configured definitions.
    pub fn registry(&self) -> Result<QueryRegistry> {
        QueryRegistry::from_definitions(&self.queries)
    }

    /// Batch options derived from the configured defaults.
    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            website_domain: self.defaults.website_domain.clone(),
            timezone: self.defaults.timezone.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Plugin;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
[store]
url = "http://clickhouse:8123"
database = "analytics"
user = "reader"

[defaults]
timezone = "UTC"
website_domain = "example.com"

[queries.pageviews]
sql = "SELECT toDate(time) AS date, count() AS value FROM events WHERE time >= {start_date:String} GROUP BY date"
output_fields = [{ name = "date", type = "String" }, { name = "value", type = "UInt64" }]

[queries.top_pages]
sql = "SELECT path, count() AS visitors FROM events WHERE 1 {{filters}} GROUP BY path"
allowed_filters = ["country"]
plugins = [{ kind = "strip_domain", field = "path" }]
"#;

    #[test]
    fn test_parse_valid_config() {
        let config: Config = toml::from_str(SAMPLE).unwrap();

        assert_eq!(config.store.url.as_deref(), Some("http://clickhouse:8123"));
        assert_eq!(config.store.backend, StoreBackend::ClickHouse);
        assert_eq!(config.store.timeout_secs, 30);
        assert_eq!(config.defaults.website_domain.as_deref(), Some("example.com"));
        assert_eq!(config.queries.len(), 2);

        let top = &config.queries["top_pages"];
        assert_eq!(top.output_fields, None);
        assert_eq!(
            top.plugins,
            vec![Plugin::StripDomain {
                field: "path".to_string()
            }]
        );
    }

    #[test]
    fn test_registry_from_config() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        let registry = config.registry().unwrap();
        assert_eq!(registry.types().collect::<Vec<_>>(), vec!["pageviews", "top_pages"]);
    }

    #[test]
    fn test_batch_options_from_defaults() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        let options = config.batch_options();
        assert_eq!(options.timezone.as_deref(), Some("UTC"));
        assert_eq!(options.website_domain.as_deref(), Some("example.com"));
    }

    #[test]
    fn test_empty_config_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.queries.is_empty());
        assert_eq!(config.store, StoreConfig::default());
    }

    #[test]
    fn test_mock_backend() {
        let config: Config = toml::from_str("[store]\nbackend = \"mock\"\n").unwrap();
        assert_eq!(config.store.backend, StoreBackend::Mock);
    }

    #[test]
    fn test_env_defaults_only_fill_gaps() {
        let env: HashMap<&str, &str> = [
            ("CLICKHOUSE_URL", "http://env:8123"),
            ("CLICKHOUSE_PASSWORD", "secret"),
        ]
        .into_iter()
        .collect();

        let mut store = StoreConfig {
            url: Some("http://file:8123".to_string()),
            ..Default::default()
        };
        store.apply_defaults_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(store.url.as_deref(), Some("http://file:8123"));
        assert_eq!(store.password.as_deref(), Some("secret"));
        assert_eq!(store.user, None);
    }

    #[test]
    fn test_display_string_hides_password() {
        let store = StoreConfig {
            url: Some("http://ch:8123".to_string()),
            database: Some("analytics".to_string()),
            password: Some("secret".to_string()),
            ..Default::default()
        };
        assert_eq!(store.display_string(), "clickhouse analytics @ http://ch:8123");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.store.database.as_deref(), Some("analytics"));
        assert_eq!(config.queries.len(), 2);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from_file(&dir.path().join("absent.toml")).unwrap();
        assert!(config.queries.is_empty());
    }

    #[test]
    fn test_invalid_toml_reports_path() {
        let err = Config::parse_toml("[store\n", Path::new("/tmp/qb.toml")).unwrap_err();
        assert!(err.to_string().contains("/tmp/qb.toml"));
    }
}
