//! Configuration for the batch retouch service

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable naming a TOML config file to load
pub const CONFIG_PATH_ENV: &str = "BATCH_RETOUCH_CONFIG";

/// Environment variable holding the Gemini API key
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetouchConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Gemini image API configuration
    #[serde(default)]
    pub gemini: GeminiConfig,
}

impl RetouchConfig {
    /// Load configuration from the file named by `BATCH_RETOUCH_CONFIG`,
    /// falling back to defaults when unset. The Gemini API key is taken
    /// from `GEMINI_API_KEY` when the file doesn't provide one.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };

        if config.gemini.api_key.is_none() {
            if let Ok(key) = std::env::var(API_KEY_ENV) {
                config.gemini.api_key = Some(key);
            }
        }

        Ok(config)
    }

    /// Parse configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number
    #[serde(default = "default_port")]
    pub port: u16,
    /// Enable CORS
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 100MB)
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            max_upload_size: 100 * 1024 * 1024, // 100MB
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_enable_cors() -> bool {
    true
}
fn default_max_upload_size() -> usize {
    100 * 1024 * 1024
}

/// Gemini image API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key; falls back to the GEMINI_API_KEY environment variable
    #[serde(default)]
    pub api_key: Option<String>,
    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Image editing model name
    #[serde(default = "default_model")]
    pub model: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-flash-image".to_string(),
            timeout_secs: 120, // generative edits are slow on large images
        }
    }
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_model() -> String {
    "gemini-2.5-flash-image".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RetouchConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.max_upload_size, 100 * 1024 * 1024);
        assert!(config.server.enable_cors);
        assert_eq!(config.gemini.model, "gemini-2.5-flash-image");
        assert!(config.gemini.api_key.is_none());
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config: RetouchConfig = toml::from_str(
            r#"
            [server]
            port = 9000

            [gemini]
            model = "gemini-exp"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.gemini.model, "gemini-exp");
        assert_eq!(
            config.gemini.base_url,
            "https://generativelanguage.googleapis.com/v1beta"
        );
    }

    #[test]
    fn test_empty_toml_is_all_defaults() {
        let config: RetouchConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.gemini.timeout_secs, 120);
    }
}
