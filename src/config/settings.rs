//! Configuration settings for repograph.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub resolver: ResolverConfig,
    pub metadata: MetadataConfig,
    pub access: AccessConfig,
    pub broadcast: BroadcastConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::ReadFile)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations or use defaults.
    pub fn load() -> Result<Self> {
        let config_paths = [
            PathBuf::from("repograph.toml"),
            dirs::config_dir()
                .map(|p| p.join("repograph/config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.is_file() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Config::default())
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<()> {
        if self.store.backend == StoreBackendType::File && self.store.data_dir.is_empty() {
            return Err(ConfigError::MissingField("store.data_dir".to_string()).into());
        }

        if self.resolver.max_depth == 0 {
            return Err(ConfigError::Invalid("resolver.max_depth must be > 0".to_string()).into());
        }

        if self.resolver.max_elements == 0 {
            return Err(
                ConfigError::Invalid("resolver.max_elements must be > 0".to_string()).into(),
            );
        }

        if self.broadcast.capacity == 0 {
            return Err(ConfigError::Invalid("broadcast.capacity must be > 0".to_string()).into());
        }

        Ok(())
    }

    /// Expand the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.store.data_dir);
        PathBuf::from(expanded.as_ref())
    }
}

/// Document store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend type: "memory" or "file"
    pub backend: StoreBackendType,
    /// Data directory for the file backend
    pub data_dir: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackendType::File,
            data_dir: "~/.local/share/repograph".to_string(),
        }
    }
}

/// Store backend type enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackendType {
    Memory,
    File,
}

/// Reference resolution limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Recurse into the reference fields of fetched documents
    pub deep: bool,
    /// Maximum nesting depth followed in deep mode
    pub max_depth: usize,
    /// Maximum number of documents fetched per call
    pub max_elements: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            deep: false,
            max_depth: 4,
            max_elements: 1000,
        }
    }
}

/// Relation-map edit settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Attempts made when a relation edit loses a revision race
    pub max_retries: usize,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self { max_retries: 5 }
    }
}

/// Access disclosure settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Roles that receive precise denial reasons
    pub privileged_roles: Vec<String>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            privileged_roles: vec!["admin".to_string()],
        }
    }
}

/// Event channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Buffered events per subscriber before lagging
    pub capacity: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}
