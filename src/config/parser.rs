//! Configuration file loading and validation

use super::settings::WatchConfig;
use crate::discovery;
use crate::error::{Result, WatchError};
use std::path::{Path, PathBuf};

/// Default config file name
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Directory under the user config dir holding the config file
pub const CONFIG_DIR_NAME: &str = "prover-watch";

/// Config file parser
pub struct ConfigParser;

impl ConfigParser {
    /// Default config file location
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/etc"))
            .join(CONFIG_DIR_NAME)
            .join(DEFAULT_CONFIG_FILE)
    }

    /// Load the config file at `path`, or the default location.
    ///
    /// An explicit path must exist. A missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<WatchConfig> {
        match path {
            Some(path) => Self::parse_file(path),
            None => {
                let path = Self::default_config_path();
                if path.exists() {
                    Self::parse_file(&path)
                } else {
                    tracing::debug!("No config file at {}, using defaults", path.display());
                    Ok(WatchConfig::default())
                }
            }
        }
    }

    /// Parse config file from path
    pub fn parse_file(path: &Path) -> Result<WatchConfig> {
        tracing::debug!("Loading config from {}", path.display());
        let content = std::fs::read_to_string(path)?;

        Self::parse_str(&content)
    }

    /// Parse config from string
    pub fn parse_str(content: &str) -> Result<WatchConfig> {
        if content.trim().is_empty() {
            return Ok(WatchConfig::default());
        }

        serde_yaml::from_str(content)
            .map_err(|e| WatchError::Yaml(format!("Failed to parse YAML: {}", e)))
    }

    /// Render a config as YAML
    pub fn to_yaml(config: &WatchConfig) -> Result<String> {
        serde_yaml::to_string(config).map_err(|e| WatchError::Yaml(e.to_string()))
    }

    /// Validate a config before running the watcher
    pub fn validate(config: &WatchConfig) -> Result<()> {
        if config.roster.is_empty() {
            return Err(WatchError::EmptyRoster);
        }

        if config.initial_index >= config.roster.len() {
            return Err(WatchError::InvalidConfig(format!(
                "initial_index {} is out of range for a roster of {}",
                config.initial_index,
                config.roster.len()
            )));
        }

        for id in &config.roster {
            if id.as_str().trim().is_empty() {
                return Err(WatchError::InvalidConfig(
                    "Roster contains an empty prover id".to_string(),
                ));
            }
            config.id_ordering.validate(id)?;
        }

        if config.poll_interval_secs == 0 {
            return Err(WatchError::InvalidConfig(
                "poll_interval_secs must be greater than zero".to_string(),
            ));
        }

        if config.crash_grace_secs == 0 {
            return Err(WatchError::InvalidConfig(
                "crash_grace_secs must be greater than zero".to_string(),
            ));
        }

        if config.sync_samples == 0 {
            return Err(WatchError::InvalidConfig(
                "sync_samples must be greater than zero".to_string(),
            ));
        }

        config.build_classifier()?;

        if let Some(id) = &config.discovery.static_id {
            config.id_ordering.validate(id)?;
        }
        discovery::from_config(&config.discovery)?;

        Ok(())
    }
}
