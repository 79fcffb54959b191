//! Task dependency graph.
//!
//! Nodes are task names and edges point from a task to each task it depends
//! on. The graph only answers "is this well formed"; it never reorders the
//! task list, which always runs in file order.

use std::collections::{HashMap, HashSet};

use super::error::ConfigError;
use super::types::Task;

/// Directed graph of `task -> dependency` edges.
#[derive(Debug, Clone)]
pub struct DependencyGraph<'a> {
    /// Task names in file order.
    order: Vec<&'a str>,
    /// Edges: task name -> names it depends on.
    edges: HashMap<&'a str, Vec<&'a str>>,
}

impl<'a> DependencyGraph<'a> {
    /// Build the graph from a task list.
    pub fn new(tasks: &'a [Task]) -> Self {
        let order = tasks.iter().map(|t| t.name.as_str()).collect();
        let edges = tasks
            .iter()
            .map(|t| {
                let deps = t.depends_on.iter().map(String::as_str).collect();
                (t.name.as_str(), deps)
            })
            .collect();
        Self { order, edges }
    }

    /// Number of tasks in the graph.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if the graph has no tasks.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Get the dependencies of a task.
    pub fn dependencies(&self, name: &str) -> Option<&[&'a str]> {
        self.edges.get(name).map(|v| v.as_slice())
    }

    /// Run both validation passes: existence first, then cycles.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.check_dependencies_exist()?;
        self.check_acyclic()
    }

    /// Confirm every `depends_on` target names an existing task.
    pub fn check_dependencies_exist(&self) -> Result<(), ConfigError> {
        for task in &self.order {
            for dep in &self.edges[task] {
                if !self.edges.contains_key(dep) {
                    return Err(ConfigError::MissingDependency {
                        task: (*task).to_string(),
                        missing: (*dep).to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Depth-first search with an on-stack set; reports the full loop.
    ///
    /// Assumes [`check_dependencies_exist`](Self::check_dependencies_exist)
    /// has passed. A task depending on itself is reported as `[a, a]`.
    pub fn check_acyclic(&self) -> Result<(), ConfigError> {
        let mut done: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = Vec::new();

        for task in &self.order {
            if let Some(path) = self.find_cycle(*task, &mut stack, &mut done) {
                return Err(ConfigError::DependencyCycle {
                    path: path.into_iter().map(str::to_string).collect(),
                });
            }
        }
        Ok(())
    }

    fn find_cycle(
        &self,
        node: &'a str,
        stack: &mut Vec<&'a str>,
        done: &mut HashSet<&'a str>,
    ) -> Option<Vec<&'a str>> {
        if done.contains(node) {
            return None;
        }
        if let Some(pos) = stack.iter().position(|n| *n == node) {
            let mut path = stack[pos..].to_vec();
            path.push(node);
            return Some(path);
        }

        stack.push(node);
        for dep in self.edges.get(node).into_iter().flatten() {
            if let Some(path) = self.find_cycle(*dep, stack, done) {
                return Some(path);
            }
        }
        stack.pop();
        done.insert(node);
        None
    }
}
