//! Configuration management for the crawler binaries.
//!
//! Configuration is loaded from a TOML file with sensible defaults for every
//! setting, so a missing file is not an error.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory settings
    pub data: DataConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// AniList API settings
    pub anilist: AnilistConfig,

    /// Ratings collector settings
    #[serde(default)]
    pub collector: CollectorConfig,

    /// User discovery settings
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

/// Data directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Root data directory path
    pub root_dir: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log directory path (relative to data directory or absolute)
    pub log_dir: String,

    /// Default log level (trace, debug, info, warn, error)
    pub default_level: String,

    /// Enable console output
    pub console: bool,

    /// Enable file output
    pub file: bool,

    /// Enable JSON formatting for file logs
    pub json_format: bool,
}

/// AniList API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnilistConfig {
    /// GraphQL endpoint URL
    pub endpoint: String,

    /// Rate limiting settings
    pub rate_limit: RateLimitConfig,

    /// Total attempts for a request before giving up
    pub max_attempts: u32,

    /// Base retry delay in seconds; the n-th failure waits n times this
    pub retry_backoff_secs: u64,

    /// Entries requested per completer page
    pub per_page: i64,

    /// Completer pages fetched per request window
    pub pages_per_request: i64,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Minimum spacing between consecutive requests, in milliseconds
    pub min_interval_ms: u64,
}

/// Ratings collector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Users per batched completed-list request
    pub batch_size: usize,

    /// Batches between checkpoint writes
    pub checkpoint_interval: usize,
}

/// User discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Cap on rated completers collected per media id
    pub completers_per_media: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            checkpoint_interval: 20,
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            completers_per_media: 100,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig {
                root_dir: "data".to_string(),
            },
            logging: LoggingConfig {
                log_dir: "logs".to_string(),
                default_level: "info".to_string(),
                console: true,
                file: true,
                json_format: false,
            },
            anilist: AnilistConfig {
                endpoint: "https://graphql.anilist.co".to_string(),
                rate_limit: RateLimitConfig {
                    min_interval_ms: 1000,
                },
                max_attempts: 10,
                retry_backoff_secs: 60,
                per_page: 50,
                pages_per_request: 5,
            },
            collector: CollectorConfig::default(),
            discovery: DiscoveryConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// If the file doesn't exist, returns the default configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Get the absolute path for the data directory
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data.root_dir)
    }

    /// Get the absolute path for the log directory
    pub fn log_dir(&self) -> PathBuf {
        let log_path = Path::new(&self.logging.log_dir);
        if log_path.is_absolute() {
            log_path.to_path_buf()
        } else {
            self.data_dir().join(log_path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.anilist.endpoint, "https://graphql.anilist.co");
        assert_eq!(config.anilist.rate_limit.min_interval_ms, 1000);
        assert_eq!(config.anilist.max_attempts, 10);
        assert_eq!(config.anilist.retry_backoff_secs, 60);
        assert_eq!(config.collector.batch_size, 10);
        assert_eq!(config.collector.checkpoint_interval, 20);
        assert_eq!(config.discovery.completers_per_media, 100);
    }

    #[test]
    fn test_save_and_load_config() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.toml");

        let original_config = Config::default();
        original_config.save(&config_path)?;

        assert!(config_path.exists());

        let loaded_config = Config::from_file(&config_path)?;
        assert_eq!(loaded_config.data.root_dir, original_config.data.root_dir);
        assert_eq!(
            loaded_config.anilist.endpoint,
            original_config.anilist.endpoint
        );
        assert_eq!(
            loaded_config.collector.batch_size,
            original_config.collector.batch_size
        );

        Ok(())
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        // Should return default config without error
        assert_eq!(config.data.root_dir, "data");
    }

    #[test]
    fn test_partial_config_falls_back_to_section_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[data]
root_dir = "crawl-data"

[logging]
log_dir = "logs"
default_level = "debug"
console = true
file = false
json_format = false

[anilist]
endpoint = "https://graphql.anilist.co"
max_attempts = 3
retry_backoff_secs = 1
per_page = 50
pages_per_request = 2

[anilist.rate_limit]
min_interval_ms = 250
"#,
        )?;

        let config = Config::from_file(&config_path)?;
        assert_eq!(config.data.root_dir, "crawl-data");
        assert_eq!(config.anilist.pages_per_request, 2);
        // Sections that were omitted keep their defaults
        assert_eq!(config.collector.batch_size, 10);
        assert_eq!(config.discovery.completers_per_media, 100);

        Ok(())
    }

    #[test]
    fn test_path_resolution() {
        let config = Config::default();

        let log_dir = config.log_dir();
        assert!(log_dir.ends_with("data/logs"));
    }
}
