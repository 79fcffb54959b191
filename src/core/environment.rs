//! Environment variables injected into remote commands.
//!
//! A host may name a local env file; its variables are loaded once per run
//! and exported in front of every command sent to that host.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors reading an env file.
#[derive(Debug, Error)]
pub enum EnvFileError {
    /// The file could not be read.
    #[error("failed to read env file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line is not `KEY=VALUE`.
    #[error("invalid line {line} in env file '{path}': {content}")]
    InvalidLine {
        path: PathBuf,
        line: usize,
        content: String,
    },
}

/// Environment variables exported before a remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Sorted so the exported prefix is stable.
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load variables from a `KEY=VALUE` file.
    ///
    /// Blank lines and `#` comments are skipped, an `export ` prefix is
    /// accepted and values may be single or double quoted.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self, EnvFileError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| EnvFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|(line, content)| EnvFileError::InvalidLine {
            path: path.to_path_buf(),
            line,
            content,
        })
    }

    /// Parse env file content; on failure returns the 1-based line number and text.
    fn parse(content: &str) -> Result<Self, (usize, String)> {
        let mut env = Self::new();
        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line = line.strip_prefix("export ").unwrap_or(line).trim_start();
            let Some((key, value)) = line.split_once('=') else {
                return Err((idx + 1, raw.to_string()));
            };
            let key = key.trim();
            if !is_valid_key(key) {
                return Err((idx + 1, raw.to_string()));
            }
            env.set(key, unquote(value.trim()));
        }
        Ok(env)
    }

    /// Builder: add an environment variable.
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Add an environment variable.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Get an environment variable.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(|s| s.as_str())
    }

    /// Check if the environment is empty.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Get the number of variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Iterate over the environment variables in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.vars.iter()
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Environment {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
