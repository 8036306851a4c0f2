//! # Configuration Management Module
//!
//! ## Purpose
//! Centralized configuration for the case search service: server binding,
//! Elasticsearch connection tuning, offline indexing parameters, and logging.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration files (TOML), environment variables
//! - **Output**: Validated configuration structs with defaults and overrides
//! - **Validation**: Type checking, range validation
//!
//! ## Configuration Sources (in order of precedence)
//! 1. Environment variables
//! 2. Configuration file
//! 3. Default values

use crate::errors::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure containing all system settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server and API configuration
    pub server: ServerConfig,
    /// Elasticsearch connection settings
    pub elasticsearch: ElasticsearchConfig,
    /// Offline indexing settings
    pub indexing: IndexingConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server and API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Enable CORS for web frontends
    pub enable_cors: bool,
}

/// Elasticsearch connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticsearchConfig {
    /// Cluster base URL
    pub url: String,
    /// Index holding the case corpus
    pub index: String,
    /// Request timeout in seconds
    pub request_timeout_seconds: u64,
    /// Automatic retries on transient failures
    pub max_retries: u32,
    /// Retry requests that timed out
    pub retry_on_timeout: bool,
}

/// Offline indexing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Bulk submission batch size
    pub batch_size: usize,
    /// Where the ID-mapping artifact is written and read from
    pub mappings_path: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Emit JSON-formatted log lines
    pub json_format: bool,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| SearchError::Config {
            message: format!("Failed to read config file {:?}: {}", path, e),
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|e| SearchError::Config {
            message: format!("Failed to parse config file {:?}: {}", path, e),
        })?;

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is
    /// absent. Runs before logging is initialized, so the caller is
    /// responsible for reporting the fallback once a subscriber exists.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            let mut config = Config::default();
            config.apply_env_overrides()?;
            config.validate()?;
            Ok(config)
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("CASE_SEARCH_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("CASE_SEARCH_PORT") {
            self.server.port = port.parse().map_err(|_| SearchError::Config {
                message: "Invalid port number in CASE_SEARCH_PORT".to_string(),
            })?;
        }
        if let Ok(url) = std::env::var("CASE_SEARCH_ES_URL") {
            self.elasticsearch.url = url;
        }
        if let Ok(index) = std::env::var("CASE_SEARCH_ES_INDEX") {
            self.elasticsearch.index = index;
        }
        if let Ok(path) = std::env::var("CASE_SEARCH_MAPPINGS_PATH") {
            self.indexing.mappings_path = PathBuf::from(path);
        }

        Ok(())
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(SearchError::Config {
                message: "server.port cannot be zero".to_string(),
            });
        }

        if self.elasticsearch.url.is_empty() {
            return Err(SearchError::Config {
                message: "elasticsearch.url cannot be empty".to_string(),
            });
        }

        if self.elasticsearch.index.is_empty() {
            return Err(SearchError::Config {
                message: "elasticsearch.index cannot be empty".to_string(),
            });
        }

        if self.elasticsearch.request_timeout_seconds == 0 {
            return Err(SearchError::Config {
                message: "elasticsearch.request_timeout_seconds must be greater than zero"
                    .to_string(),
            });
        }

        if self.indexing.batch_size == 0 {
            return Err(SearchError::Config {
                message: "indexing.batch_size must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5000,
                enable_cors: true,
            },
            elasticsearch: ElasticsearchConfig {
                url: "http://localhost:9200".to_string(),
                index: "legal_documents".to_string(),
                request_timeout_seconds: 60,
                max_retries: 5,
                retry_on_timeout: true,
            },
            indexing: IndexingConfig {
                batch_size: 100,
                mappings_path: PathBuf::from("id_mappings.json"),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json_format: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.elasticsearch.index, "legal_documents");
        assert_eq!(config.indexing.batch_size, 100);
    }

    #[test]
    fn test_parse_config_file() {
        let toml_src = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            enable_cors = false

            [elasticsearch]
            url = "http://es:9200"
            index = "cases"
            request_timeout_seconds = 30
            max_retries = 2
            retry_on_timeout = true

            [indexing]
            batch_size = 50
            mappings_path = "/tmp/id_mappings.json"

            [logging]
            level = "debug"
            json_format = true
        "#;

        let config: Config = toml::from_str(toml_src).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.elasticsearch.index, "cases");
        assert_eq!(config.indexing.batch_size, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.port, Config::default().server.port);
        assert_eq!(config.elasticsearch.index, "legal_documents");
    }

    #[test]
    fn test_rejects_zero_batch_size() {
        let mut config = Config::default();
        config.indexing.batch_size = 0;
        assert!(config.validate().is_err());
    }
}
