//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::agent::AgentConfig;
use crate::api::ApiConfig;
use crate::monitor::MonitorConfig;
use crate::source::TableConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub table: TableConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    /// Whether structured JSON output was requested
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("sentinel").join("config.toml")),
            Some(PathBuf::from("/etc/sentinel/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Table overrides
        if let Some(url) = lookup("SENTINEL_TABLE_URL") {
            self.table.url = url;
        }
        if let Some(key) = lookup("SENTINEL_TABLE_KEY") {
            self.table.api_key = key;
        }
        if let Some(name) = lookup("SENTINEL_TABLE_NAME") {
            self.table.name = name;
        }

        // Monitor overrides
        if let Some(timeout) = lookup("SENTINEL_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                self.monitor.timeout_ms = ms;
            }
        }

        // API overrides
        if let Some(host) = lookup("SENTINEL_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = lookup("SENTINEL_API_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }

        // Logging overrides
        if let Some(level) = lookup("SENTINEL_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("SENTINEL_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Sentinel Configuration
#
# Environment variables override these settings:
# - SENTINEL_TABLE_URL
# - SENTINEL_TABLE_KEY
# - SENTINEL_TABLE_NAME
# - SENTINEL_TIMEOUT_MS
# - SENTINEL_API_HOST
# - SENTINEL_API_PORT
# - SENTINEL_LOG_LEVEL
# - SENTINEL_LOG_FORMAT

[table]
# Base URL of the telemetry table service (leave empty for demo mode)
url = ""

# API key for the table service
api_key = ""

# Table holding telemetry rows
name = "telemetry"

# Request timeout (ms)
request_timeout_ms = 5000

# How often the live feed polls for new rows (ms)
poll_interval_ms = 1000

[monitor]
# Silence after which the agent is reported offline (ms)
timeout_ms = 5000

# Readings kept for display
history_capacity = 20

# Buffered live readings awaiting processing
channel_capacity = 64

[api]
# Dashboard API host
host = "0.0.0.0"

# Dashboard API port
port = 8090

[agent]
# Time between simulated uploads (ms)
interval_ms = 2000

# Samples in the scorer's baseline window
window = 10

# Anomaly score threshold
threshold = 3.0

# Probability of a simulated spike
spike_probability = 0.05

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config_round_trips() {
        let config = Config::parse(&generate_default_config()).unwrap();
        assert_eq!(config.table.name, "telemetry");
        assert!(!config.table.is_configured());
        assert_eq!(config.monitor.timeout_ms, 5000);
        assert_eq!(config.monitor.history_capacity, 20);
        assert_eq!(config.api.port, 8090);
        assert_eq!(config.agent.window, 10);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::parse("[monitor]\ntimeout_ms = 10000\n").unwrap();
        assert_eq!(config.monitor.timeout_ms, 10000);
        assert_eq!(config.monitor.history_capacity, 20);
        assert_eq!(config.monitor.channel_capacity, 64);
        assert_eq!(config.table.poll_interval_ms, 1000);
        assert!(!config.logging.is_json());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[table]\nurl = \"https://project.example.co\"\napi_key = \"anon\"\n\n[logging]\nformat = \"json\""
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert!(config.table.is_configured());
        assert_eq!(config.table.api_key, "anon");
        assert!(config.logging.is_json());
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/sentinel.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[monitor]\ntimeout_ms = \"soon\"").unwrap();

        let result = Config::load(file.path());
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("SENTINEL_TABLE_URL", "https://override.example.co"),
            ("SENTINEL_TIMEOUT_MS", "2500"),
            ("SENTINEL_API_PORT", "not-a-port"),
            ("SENTINEL_LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.table.url, "https://override.example.co");
        assert_eq!(config.monitor.timeout_ms, 2500);
        assert_eq!(config.api.port, 8090);
        assert_eq!(config.logging.level, "debug");
    }
}
