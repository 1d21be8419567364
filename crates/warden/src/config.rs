//! Configuration loading and types

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use warden_core::SupervisorConfig;

/// Top-level configuration for warden
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Log sink settings
    #[serde(default)]
    pub log: LogConfig,
    /// Thresholds, ledger and actor table
    #[serde(flatten)]
    pub supervisor: SupervisorConfig,
}

/// Log sink settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Append-only log file; `""` logs to stderr only
    #[serde(default = "default_log_file", deserialize_with = "log_file_or_none")]
    pub file: Option<PathBuf>,
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins if set
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            level: default_log_level(),
        }
    }
}

fn default_log_file() -> Option<PathBuf> {
    Some(PathBuf::from("/var/log/watchdog.log"))
}

fn log_file_or_none<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    let path = PathBuf::deserialize(deserializer)?;
    Ok((!path.as_os_str().is_empty()).then_some(path))
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("cannot read {}: {e}", path.display()))?;
        Self::parse(&content).map_err(|e| eyre::eyre!("invalid config {}: {e}", path.display()))
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    /// Returns error if the text is not valid configuration
    pub fn parse(content: &str) -> eyre::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Find a config file: `WARDEN_CONFIG`, then the working directory,
    /// `/etc/warden`, and the user config directory
    #[must_use]
    pub fn locate() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("WARDEN_CONFIG") {
            return Some(PathBuf::from(path));
        }

        let paths = [
            Some(PathBuf::from("warden.toml")),
            Some(PathBuf::from("/etc/warden/warden.toml")),
            dirs::config_dir().map(|p| p.join("warden/warden.toml")),
        ];

        paths.into_iter().flatten().find(|path| path.exists())
    }
}
