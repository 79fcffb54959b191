//! YAML configuration loading.
//!
//! Loading parses the file, validates it, stamps the release version and
//! substitutes tokens in every task. Any failure returns a [`ConfigError`]
//! and no configuration.

use std::path::Path;

use super::error::ConfigError;
use super::substitute::substitute_tasks;
use super::types::Config;
use super::validate::validate_config;

/// Oldest task file version this build accepts.
pub const MIN_CONFIG_VERSION: &str = "1.0.0";

/// YAML configuration loader.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate a task file.
    pub fn load(path: impl AsRef<Path>, min_version: &str) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, min_version)
    }

    /// Parse and validate a task file from a YAML string.
    pub fn parse(yaml: &str, min_version: &str) -> Result<Config, ConfigError> {
        let mut config: Config = serde_yaml::from_str(yaml)?;
        validate_config(&config, min_version)?;
        config.release_version = chrono::Utc::now().timestamp_millis();
        substitute_tasks(&mut config);
        Ok(config)
    }
}
