//! Configuration management
//!
//! This module handles loading and parsing configuration for the Keygate service.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults. The auth section
//! has no usable default: a real signing secret must be configured before the
//! service will start.

use serde::{Deserialize, Serialize};

use crate::services::token::MIN_SECRET_BYTES;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Token cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8888
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Pool acquire timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

fn default_database_url() -> String {
    "data/keygate.db".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Token cache configuration
///
/// Entry lifetimes are not configured here: every cache write carries the TTL
/// derived from the token expiry configured in [`AuthConfig`], so the cache
/// window and the token validity window cannot drift apart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache driver (memory or redis)
    #[serde(default)]
    pub driver: CacheDriver,
    /// Redis connection URL (required for the redis driver)
    #[serde(default)]
    pub redis_url: Option<String>,
}

/// Cache driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheDriver {
    /// In-memory cache (default)
    #[default]
    Memory,
    /// Redis cache
    Redis,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Symmetric signing secret for session tokens
    #[serde(default)]
    pub access_secret: String,
    /// Token lifetime in seconds; also drives the cache TTL
    #[serde(default = "default_expire_seconds")]
    pub expire_seconds: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_secret: String::new(),
            expire_seconds: default_expire_seconds(),
        }
    }
}

fn default_expire_seconds() -> i64 {
    3600
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file.
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: format_yaml_error(&e),
        })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides.
    ///
    /// Environment variables follow the pattern:
    /// - KEYGATE_SERVER_HOST / KEYGATE_SERVER_PORT
    /// - KEYGATE_DATABASE_DRIVER / KEYGATE_DATABASE_URL
    /// - KEYGATE_CACHE_DRIVER / KEYGATE_CACHE_REDIS_URL
    /// - KEYGATE_AUTH_ACCESS_SECRET / KEYGATE_AUTH_EXPIRE_SECONDS
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("KEYGATE_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("KEYGATE_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }

        if let Ok(driver) = std::env::var("KEYGATE_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("KEYGATE_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(driver) = std::env::var("KEYGATE_CACHE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "memory" => self.cache.driver = CacheDriver::Memory,
                "redis" => self.cache.driver = CacheDriver::Redis,
                _ => {}
            }
        }
        if let Ok(redis_url) = std::env::var("KEYGATE_CACHE_REDIS_URL") {
            self.cache.redis_url = Some(redis_url);
        }

        if let Ok(secret) = std::env::var("KEYGATE_AUTH_ACCESS_SECRET") {
            self.auth.access_secret = secret;
        }
        if let Ok(expire) = std::env::var("KEYGATE_AUTH_EXPIRE_SECONDS") {
            if let Ok(expire) = expire.parse::<i64>() {
                self.auth.expire_seconds = expire;
            }
        }
    }

    /// Validate the configuration before the service starts.
    ///
    /// The signing secret and token lifetime have no usable defaults, so a
    /// misconfigured auth section fails fast here instead of at the first login.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.access_secret.len() < MIN_SECRET_BYTES {
            return Err(ConfigError::ValidationError(format!(
                "auth.access_secret must be at least {} bytes, got {}",
                MIN_SECRET_BYTES,
                self.auth.access_secret.len()
            )));
        }
        if self.auth.expire_seconds <= 0 {
            return Err(ConfigError::ValidationError(format!(
                "auth.expire_seconds must be positive, got {}",
                self.auth.expire_seconds
            )));
        }
        if self.cache.driver == CacheDriver::Redis && self.cache.redis_url.is_none() {
            return Err(ConfigError::ValidationError(
                "cache.redis_url is required when cache.driver is redis".to_string(),
            ));
        }
        Ok(())
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared mutex for config tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
