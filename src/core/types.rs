//! Core identifier and target types.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::config::Host;

/// Unique identifier for one orchestration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Generate a new random RunId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A host selected for a run: its configured name plus connection details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostTarget {
    /// Name the host is keyed by in the task file.
    pub name: String,
    /// Connection details.
    pub host: Host,
}

impl HostTarget {
    /// Create a target from a name and host entry.
    pub fn new(name: impl Into<String>, host: Host) -> Self {
        Self {
            name: name.into(),
            host,
        }
    }
}

impl fmt::Display for HostTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
