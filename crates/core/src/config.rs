//! Catalog configuration
//!
//! Loaded from an optional YAML file, then overridden by environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides the backing file path
pub const DATA_FILE_ENV: &str = "CATALOG_DATA_FILE";

/// Config loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

impl CatalogConfig {
    /// Reads a YAML config file. Missing sections fall back to their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    /// Loads `path` when given, otherwise defaults, then applies env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// `CATALOG_DATA_FILE` replaces the storage path; an empty value is ignored.
    pub fn apply_env(&mut self) {
        if let Ok(value) = std::env::var(DATA_FILE_ENV) {
            let path = PathBuf::from(value);
            if !path.as_os_str().is_empty() {
                tracing::debug!("storage path overridden by {}: {}", DATA_FILE_ENV, path.display());
                self.storage.path = path;
            }
        }
    }
}

/// Backing file configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON file holding the product array
    #[serde(default = "default_path")]
    pub path: PathBuf,

    /// Pretty-print the file on every write
    #[serde(default = "default_true")]
    pub pretty: bool,
}

fn default_path() -> PathBuf {
    PathBuf::from("data.json")
}

fn default_true() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            pretty: default_true(),
        }
    }
}

impl StorageConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }
}
