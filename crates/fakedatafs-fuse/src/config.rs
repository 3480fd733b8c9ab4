use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported config file extension: {0:?}")]
    UnsupportedExtension(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Tuning for the read-continuation cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadCacheConfig {
    /// Seconds a parked reader may stay untouched before the sweeper drops it.
    pub ttl_secs: u64,
    /// Seconds between two sweeps.
    pub sweep_interval_secs: u64,
}

impl Default for ReadCacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 20,
            sweep_interval_secs: 5,
        }
    }
}

impl ReadCacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Everything the daemon needs to build and serve a tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FakeDataConfig {
    pub seed: u64,
    pub files_per_dir: usize,
    /// Upper bound for generated file sizes, in KiB (exclusive).
    pub max_size_kib: u64,
    pub attr_timeout_secs: u64,
    pub entry_timeout_secs: u64,
    pub cache: ReadCacheConfig,
}

impl Default for FakeDataConfig {
    fn default() -> Self {
        Self {
            seed: 23,
            files_per_dir: 100,
            max_size_kib: 100,
            attr_timeout_secs: 1,
            entry_timeout_secs: 1,
            cache: ReadCacheConfig::default(),
        }
    }
}

impl FakeDataConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        match ext.to_lowercase().as_str() {
            "toml" => Ok(toml::from_str(&contents)?),
            "json" => Ok(serde_json::from_str(&contents)?),
            _ => Err(ConfigError::UnsupportedExtension(ext.to_string())),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_size_kib == 0 {
            return Err(ConfigError::Invalid(
                "max_size_kib must be greater than zero".to_string(),
            ));
        }
        if self.max_size_kib.checked_mul(1024).is_none() {
            return Err(ConfigError::Invalid(format!(
                "max_size_kib {} overflows a byte count",
                self.max_size_kib
            )));
        }
        if self.cache.ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "cache.ttl_secs must be greater than zero".to_string(),
            ));
        }
        if self.cache.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "cache.sweep_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_kib.saturating_mul(1024)
    }

    pub fn attr_timeout(&self) -> Duration {
        Duration::from_secs(self.attr_timeout_secs)
    }

    pub fn entry_timeout(&self) -> Duration {
        Duration::from_secs(self.entry_timeout_secs)
    }
}
