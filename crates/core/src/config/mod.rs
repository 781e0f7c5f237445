//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SNIPSHELF_*)
//! 2. TOML config file (if SNIPSHELF_CONFIG_FILE set)
//! 3. Built-in defaults

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::CacheVersion;
use crate::store::Database;

mod validation;

pub use validation::ConfigError;

/// Deployment environment the client runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Production-like environments register the worker by default.
    pub fn is_production_like(self) -> bool {
        matches!(self, Environment::Staging | Environment::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SNIPSHELF_*)
/// 2. TOML config file (if SNIPSHELF_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL the app is deployed at; manifest paths resolve against it.
    ///
    /// Set via SNIPSHELF_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to the offline record database.
    ///
    /// Set via SNIPSHELF_STORE_PATH environment variable.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Declared schema version of the offline record database.
    ///
    /// Set via SNIPSHELF_STORE_VERSION environment variable.
    #[serde(default = "default_store_version")]
    pub store_version: i64,

    /// Path to the precache database.
    ///
    /// Set via SNIPSHELF_CACHE_PATH environment variable.
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,

    /// Explicit cache version tag. Derived from the manifest when unset.
    ///
    /// Set via SNIPSHELF_CACHE_VERSION environment variable.
    #[serde(default)]
    pub cache_version: Option<String>,

    /// Deployment environment.
    ///
    /// Set via SNIPSHELF_ENVIRONMENT environment variable.
    #[serde(default = "default_environment")]
    pub environment: Environment,

    /// Register the worker even outside production-like environments.
    ///
    /// Set via SNIPSHELF_ENABLE_WORKER environment variable.
    #[serde(default)]
    pub enable_worker: bool,

    /// User-Agent string for network requests.
    ///
    /// Set via SNIPSHELF_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Transport timeout in milliseconds.
    ///
    /// Set via SNIPSHELF_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_origin() -> String {
    "http://localhost:5173".into()
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./snipshelf-offline.sqlite")
}

fn default_store_version() -> i64 {
    1
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("./snipshelf-precache.sqlite")
}

fn default_environment() -> Environment {
    Environment::Development
}

fn default_user_agent() -> String {
    "snipshelf/0.1".into()
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            store_path: default_store_path(),
            store_version: default_store_version(),
            cache_path: default_cache_path(),
            cache_version: None,
            environment: default_environment(),
            enable_worker: false,
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The declared offline database.
    pub fn database(&self) -> Database {
        Database::new(self.store_path.clone(), self.store_version)
    }

    /// The configured cache version, or one derived from the manifest URLs.
    pub fn cache_version<'a>(&self, manifest_urls: impl IntoIterator<Item = &'a str>) -> CacheVersion {
        match &self.cache_version {
            Some(tag) => CacheVersion::new(tag.clone()),
            None => CacheVersion::from_manifest(manifest_urls),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SNIPSHELF_`
    /// 2. TOML file from `SNIPSHELF_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SNIPSHELF_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SNIPSHELF_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
