//! Configuration loading and validation.
//!
//! This module turns a YAML task file into a validated, substituted
//! [`Config`] that stays read-only for the rest of a run.

mod error;
mod graph;
mod substitute;
mod types;
mod validate;
mod yaml;

pub use error::ConfigError;
pub use graph::DependencyGraph;
pub use substitute::{APPNAME_TOKEN, RELEASE_VERSION_TOKEN, Substitutor, substitute};
pub use types::{Config, Host, OnFailure, Task};
pub use validate::{check_version, validate_config};
pub use yaml::{ConfigLoader, MIN_CONFIG_VERSION};
