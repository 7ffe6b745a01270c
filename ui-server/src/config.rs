//! Configuration for the UI server.

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

/// Main configuration structure for the UI server.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Extra model definitions loaded on top of the built-in catalog.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CatalogConfig {
    /// Directory of `*.json` model definitions.
    #[serde(default)]
    pub dir: Option<String>,
}

// Default values
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    5000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (INVEST__SECTION__KEY format)
    /// 2. config.toml file (if present)
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            .set_default("api.host", default_host())?
            .set_default("api.port", default_port() as i64)?
            .set_default("logging.level", default_log_level())?
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("INVEST")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_api_config() {
        let api = ApiConfig::default();
        assert_eq!(api.host, "127.0.0.1");
        assert_eq!(api.port, 5000);
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert!(config.catalog.dir.is_none());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: Config = ConfigLoader::builder()
            .set_override("api.port", 56789)
            .unwrap()
            .set_override("catalog.dir", "/opt/models")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.api.port, 56789);
        assert_eq!(config.api.host, "127.0.0.1");
        assert_eq!(config.catalog.dir.as_deref(), Some("/opt/models"));
    }
}
