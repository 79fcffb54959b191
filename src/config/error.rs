//! Configuration error types.
//!
//! Every failure to turn a task file into a usable [`Config`](super::Config)
//! is reported as a [`ConfigError`]. Loading is all-or-nothing, so a caller
//! holding one of these never holds a partially built configuration.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse YAML.
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Missing or empty required field.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Two tasks share a name.
    #[error("duplicate task name: {0}")]
    DuplicateTask(String),

    /// A `depends_on` entry names a task that does not exist.
    #[error("task '{task}' depends on unknown task '{missing}'")]
    MissingDependency { task: String, missing: String },

    /// The dependency graph contains a cycle.
    #[error("dependency cycle detected: {}", .path.join(" -> "))]
    DependencyCycle { path: Vec<String> },

    /// The file's version is not compatible with this build.
    #[error("incompatible config version '{found}' (requires >= {required}, same major.minor)")]
    IncompatibleVersion { found: String, required: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_full_path() {
        let err = ConfigError::DependencyCycle {
            path: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "dependency cycle detected: a -> b -> a");
    }

    #[test]
    fn test_missing_dependency_names_both_tasks() {
        let err = ConfigError::MissingDependency {
            task: "deploy".into(),
            missing: "build".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("deploy"));
        assert!(msg.contains("build"));
    }
}
