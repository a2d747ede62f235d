//! Configuration module
//!
//! Loaded from TOML. Every field has a default, so an empty file (or a
//! partial one) is a valid configuration.

use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infrastructure::DatabaseConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// `~/.config/csms/config.toml` (platform equivalent), or `./config.toml`
/// when the platform has no config directory.
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .map(|dir| dir.join("csms").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub ocpp: OcppConfig,
    pub tariff: TariffConfig,
    pub database: DatabaseSettings,
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tariff.price_per_kwh.is_sign_negative() {
            return Err(ConfigError::Invalid(
                "tariff.price_per_kwh must not be negative".into(),
            ));
        }
        if self.database.backend == StorageBackend::Sqlite && self.database.url.is_empty() {
            return Err(ConfigError::Invalid(
                "database.url is required for the sqlite backend".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Seconds to wait for sessions to close after a shutdown signal
    pub shutdown_timeout: u64,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9000,
            shutdown_timeout: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcppConfig {
    /// Heartbeat interval in seconds, sent in BootNotification replies
    pub heartbeat_interval: u32,
}

impl Default for OcppConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TariffConfig {
    pub price_per_kwh: Decimal,
}

impl Default for TariffConfig {
    fn default() -> Self {
        Self {
            price_per_kwh: Decimal::from(1500),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub backend: StorageBackend,
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseSettings {
    pub fn to_database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
        }
    }

    /// What `--check` and the startup log print
    pub fn describe(&self) -> String {
        match self.backend {
            StorageBackend::Memory => "memory".to_string(),
            StorageBackend::Sqlite => format!("sqlite ({})", self.url),
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        let db = DatabaseConfig::default();
        Self {
            backend: StorageBackend::Memory,
            url: db.url,
            max_connections: db.max_connections,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, overridden by RUST_LOG
    pub level: String,
    /// `text` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}
