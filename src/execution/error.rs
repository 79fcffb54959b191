//! Errors surfaced by a run.

use thiserror::Error;

/// A failure recorded while running tasks against hosts.
///
/// Failures never stop sibling hosts. Every one is logged when it happens;
/// the run returns one of them once all tasks have finished.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    /// The session to a host could not be opened.
    #[error("host '{host}': connection failed: {reason}")]
    Connection { host: String, reason: String },

    /// The command could not be run on an open session.
    #[error("task '{task}' on host '{host}': {reason}")]
    Transport {
        task: String,
        host: String,
        reason: String,
    },

    /// The command ran but exited with an unexpected code.
    #[error("task '{task}' on host '{host}': expected exit code {expected}, got {actual}")]
    ExitMismatch {
        task: String,
        host: String,
        expected: i32,
        actual: i32,
    },

    /// The worker for a host panicked while running a task.
    #[error("task '{task}' on host '{host}': worker panicked")]
    Panicked { task: String, host: String },

    /// The task filter or host list did not match the config.
    #[error(transparent)]
    Selection(#[from] SelectionError),
}

impl RunError {
    /// Host the failure happened on, if it happened on one.
    pub fn host(&self) -> Option<&str> {
        match self {
            RunError::Connection { host, .. }
            | RunError::Transport { host, .. }
            | RunError::ExitMismatch { host, .. }
            | RunError::Panicked { host, .. } => Some(host),
            RunError::Selection(_) => None,
        }
    }

    /// Task the failure happened in, if it happened inside one.
    pub fn task(&self) -> Option<&str> {
        match self {
            RunError::Connection { .. } | RunError::Selection(_) => None,
            RunError::Transport { task, .. }
            | RunError::ExitMismatch { task, .. }
            | RunError::Panicked { task, .. } => Some(task),
        }
    }
}

/// Invalid task or host selection, reported before anything runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// The task filter names no task in the config.
    #[error("unknown task: {0}")]
    UnknownTask(String),

    /// A requested host is not defined in the config.
    #[error("unknown host: {0}")]
    UnknownHost(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_mismatch_message() {
        let err = RunError::ExitMismatch {
            task: "migrate".into(),
            host: "db".into(),
            expected: 0,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "task 'migrate' on host 'db': expected exit code 0, got 2"
        );
        assert_eq!(err.host(), Some("db"));
        assert_eq!(err.task(), Some("migrate"));
    }

    #[test]
    fn test_connection_error_has_no_task() {
        let err = RunError::Connection {
            host: "web".into(),
            reason: "refused".into(),
        };
        assert_eq!(err.task(), None);
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn test_selection_error_has_no_host() {
        let err = RunError::from(SelectionError::UnknownTask("deploy".into()));
        assert_eq!(err.host(), None);
        assert_eq!(err.task(), None);
        assert_eq!(err.to_string(), "unknown task: deploy");
    }
}
