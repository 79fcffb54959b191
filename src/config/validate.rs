//! Structural validation of a parsed configuration.
//!
//! Required fields are checked from static rule tables so every field goes
//! through the same path; the dependency graph is checked afterwards.

use std::collections::HashSet;

use super::error::ConfigError;
use super::graph::DependencyGraph;
use super::types::{Config, Host, Task};

/// A required-field check: the field name reported on failure and a predicate.
struct Rule<T> {
    field: &'static str,
    check: fn(&T) -> bool,
}

const CONFIG_RULES: &[Rule<Config>] = &[
    Rule {
        field: "version",
        check: |c: &Config| !c.version.trim().is_empty(),
    },
    Rule {
        field: "appname",
        check: |c: &Config| !c.app_name.trim().is_empty(),
    },
    Rule {
        field: "hosts",
        check: |c: &Config| !c.hosts.is_empty(),
    },
    Rule {
        field: "tasks",
        check: |c: &Config| !c.tasks.is_empty(),
    },
];

const HOST_RULES: &[Rule<Host>] = &[
    Rule {
        field: "host",
        check: |h: &Host| !h.host.trim().is_empty(),
    },
    Rule {
        field: "username",
        check: |h: &Host| !h.username.trim().is_empty(),
    },
];

const TASK_RULES: &[Rule<Task>] = &[
    Rule {
        field: "name",
        check: |t: &Task| !t.name.trim().is_empty(),
    },
    Rule {
        field: "cmd",
        check: |t: &Task| !t.cmd.trim().is_empty(),
    },
];

fn apply_rules<T>(rules: &[Rule<T>], value: &T, prefix: &str) -> Result<(), ConfigError> {
    for rule in rules {
        if !(rule.check)(value) {
            return Err(ConfigError::MissingField(format!("{}{}", prefix, rule.field)));
        }
    }
    Ok(())
}

/// Validate a parsed configuration against a minimum version.
pub fn validate_config(config: &Config, min_version: &str) -> Result<(), ConfigError> {
    apply_rules(CONFIG_RULES, config, "")?;
    check_version(&config.version, min_version)?;

    for (name, host) in &config.hosts {
        apply_rules(HOST_RULES, host, &format!("hosts.{}.", name))?;
    }
    for (index, task) in config.tasks.iter().enumerate() {
        apply_rules(TASK_RULES, task, &format!("tasks[{}].", index))?;
    }

    let mut names = HashSet::new();
    for task in &config.tasks {
        if !names.insert(task.name.as_str()) {
            return Err(ConfigError::DuplicateTask(task.name.clone()));
        }
    }

    DependencyGraph::new(&config.tasks).validate()
}

/// Check that `version` is lexically at least `min_version` and shares its
/// `major.minor` prefix.
pub fn check_version(version: &str, min_version: &str) -> Result<(), ConfigError> {
    let incompatible = || ConfigError::IncompatibleVersion {
        found: version.to_string(),
        required: min_version.to_string(),
    };

    let prefix = major_minor(min_version);
    let same_line = version == prefix || version.starts_with(&format!("{}.", prefix));
    if !same_line || version < min_version {
        return Err(incompatible());
    }
    Ok(())
}

fn major_minor(version: &str) -> &str {
    match version.match_indices('.').nth(1) {
        Some((idx, _)) => &version[..idx],
        None => version,
    }
}
