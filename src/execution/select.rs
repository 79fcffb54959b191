//! Task and host selection, done before a run starts.

use crate::config::{Config, Task};
use crate::core::types::HostTarget;

use super::error::SelectionError;

/// Pick the tasks to run, in file order.
///
/// With a `filter`, only the task of that name runs (library or not).
/// Otherwise every task runs except library tasks, unless
/// `include_library` is set.
pub fn select_tasks(
    tasks: &[Task],
    filter: Option<&str>,
    include_library: bool,
) -> Result<Vec<Task>, SelectionError> {
    match filter {
        Some(name) => tasks
            .iter()
            .find(|t| t.name == name)
            .map(|t| vec![t.clone()])
            .ok_or_else(|| SelectionError::UnknownTask(name.to_string())),
        None => Ok(tasks
            .iter()
            .filter(|t| include_library || !t.is_library)
            .cloned()
            .collect()),
    }
}

/// Resolve host names against the config. An empty list selects every host.
pub fn select_hosts(config: &Config, names: &[String]) -> Result<Vec<HostTarget>, SelectionError> {
    if names.is_empty() {
        return Ok(config
            .hosts
            .iter()
            .map(|(name, host)| HostTarget::new(name.clone(), host.clone()))
            .collect());
    }

    let mut targets: Vec<HostTarget> = Vec::with_capacity(names.len());
    for name in names {
        if targets.iter().any(|t| &t.name == name) {
            continue;
        }
        let host = config
            .host(name)
            .ok_or_else(|| SelectionError::UnknownHost(name.clone()))?;
        targets.push(HostTarget::new(name.clone(), host.clone()));
    }
    Ok(targets)
}
