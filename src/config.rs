//! Runtime configuration: an optional TOML file plus `DEPOSIT_DESK_*` overrides.
//!
//! ```toml
//! buffer_size = 64
//! poll_interval_ms = 1000
//!
//! [storage]
//! backend = "file"
//! data_dir = "./data"
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_CONFIG_PATH: &str = "DEPOSIT_DESK_CONFIG";
pub const ENV_STORAGE: &str = "DEPOSIT_DESK_STORAGE";
pub const ENV_DATA_DIR: &str = "DEPOSIT_DESK_DATA_DIR";
pub const ENV_BUFFER_SIZE: &str = "DEPOSIT_DESK_BUFFER_SIZE";
pub const ENV_POLL_INTERVAL_MS: &str = "DEPOSIT_DESK_POLL_INTERVAL_MS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Configuration error: {0}")]
    Parse(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

/// Where the actors keep their entities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    /// Lost on shutdown.
    #[default]
    Memory,
    /// One JSON snapshot per entity kind under `data_dir`.
    File { data_dir: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Mailbox capacity of every actor.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    #[serde(default)]
    pub storage: StorageConfig,
    /// How often order watchers re-read their order.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_buffer_size() -> usize {
    32
}

fn default_poll_interval_ms() -> u64 {
    3000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            storage: StorageConfig::default(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        content.parse()
    }

    /// Reads the file named by `DEPOSIT_DESK_CONFIG` (defaults when unset),
    /// then applies the environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(ENV_CONFIG_PATH) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Applies `DEPOSIT_DESK_*` overrides read through `lookup`, then revalidates.
    ///
    /// A data dir without an explicit backend selects the file backend.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = lookup(ENV_DATA_DIR).map(PathBuf::from);

        match lookup(ENV_STORAGE).map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("memory") => self.storage = StorageConfig::Memory,
            Some("file") => {
                let dir = data_dir
                    .or_else(|| match &self.storage {
                        StorageConfig::File { data_dir } => Some(data_dir.clone()),
                        StorageConfig::Memory => None,
                    })
                    .ok_or_else(|| {
                        ConfigError::Validation(format!("file storage needs {ENV_DATA_DIR}"))
                    })?;
                self.storage = StorageConfig::File { data_dir: dir };
            }
            Some(other) => {
                return Err(ConfigError::Validation(format!(
                    "{ENV_STORAGE}: unknown backend '{other}'"
                )))
            }
            None => {
                if let Some(dir) = data_dir {
                    self.storage = StorageConfig::File { data_dir: dir };
                }
            }
        }

        if let Some(raw) = lookup(ENV_BUFFER_SIZE) {
            self.buffer_size = parse_var(ENV_BUFFER_SIZE, &raw)?;
        }
        if let Some(raw) = lookup(ENV_POLL_INTERVAL_MS) {
            self.poll_interval_ms = parse_var(ENV_POLL_INTERVAL_MS, &raw)?;
        }

        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_size == 0 {
            return Err(ConfigError::Validation("buffer_size must be greater than 0".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Validation("poll_interval_ms must be greater than 0".into()));
        }
        if let StorageConfig::File { data_dir } = &self.storage {
            if data_dir.as_os_str().is_empty() {
                return Err(ConfigError::Validation("file storage needs a data_dir".into()));
            }
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn parse_var<N: FromStr>(key: &str, raw: &str) -> Result<N, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Parse(format!("{key}: '{raw}' is not a number")))
}
