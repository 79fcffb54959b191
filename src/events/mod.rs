//! Run events and the log sink they are written to.
//!
//! The runner describes what happens as [`Event`] values; each event renders
//! to one log line via `Display` and is emitted on a [`LogSink`].

mod sink;

pub use sink::{FileWriter, LogSink, LogWriter, SinkHandle, TracingWriter};

use std::fmt;
use std::time::Duration;

use crate::core::types::RunId;

/// Lifecycle events emitted during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A run has started.
    RunStarted {
        run_id: RunId,
        hosts: usize,
        tasks: usize,
    },

    /// A session to a host is open.
    HostConnected { host: String },

    /// A session to a host could not be opened.
    HostUnreachable { host: String, error: String },

    /// The exact command line about to run (debug mode).
    CommandLine {
        task: String,
        host: String,
        command: String,
    },

    /// A task has started on a host.
    TaskStarted { task: String, host: String },

    /// A task finished with the expected exit code.
    TaskSucceeded {
        task: String,
        host: String,
        duration: Duration,
    },

    /// A task could not run, or ran with the wrong exit code.
    TaskFailed {
        task: String,
        host: String,
        reason: String,
    },

    /// Captured output of a task on a host.
    TaskOutput {
        task: String,
        host: String,
        output: String,
    },

    /// The task's configured message, after success.
    TaskMessage {
        task: String,
        host: String,
        message: String,
    },

    /// The operator chose to run a failed task again.
    TaskRetrying { task: String, host: String },

    /// A retried task matched its expected exit code.
    TaskRecovered { task: String, host: String },

    /// A task was not run on an unreachable host.
    TaskSkipped { task: String, host: String },

    /// Every host has finished a task.
    TaskFinished {
        task: String,
        index: usize,
        total: usize,
    },

    /// The run stopped early under the abort failure policy.
    RunAborted { after_task: String },

    /// A run has finished.
    RunFinished {
        run_id: RunId,
        failures: usize,
        duration: Duration,
    },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::RunStarted {
                run_id,
                hosts,
                tasks,
            } => write!(f, "run {} started: {} task(s) on {} host(s)", run_id, tasks, hosts),
            Event::HostConnected { host } => write!(f, "[{}] connected", host),
            Event::HostUnreachable { host, error } => {
                write!(f, "[{}] connection failed: {}", host, error)
            }
            Event::CommandLine {
                task,
                host,
                command,
            } => write!(f, "[{}] {}: $ {}", host, task, command),
            Event::TaskStarted { task, host } => write!(f, "[{}] {}: started", host, task),
            Event::TaskSucceeded {
                task,
                host,
                duration,
            } => write!(f, "[{}] {}: ok ({:.2?})", host, task, duration),
            Event::TaskFailed { task, host, reason } => {
                write!(f, "[{}] {}: FAILED: {}", host, task, reason)
            }
            Event::TaskOutput { task, host, output } => {
                write!(f, "[{}] {}: output:", host, task)?;
                for line in output.trim_end().lines() {
                    write!(f, "\n[{}] {}: | {}", host, task, line)?;
                }
                Ok(())
            }
            Event::TaskMessage {
                task,
                host,
                message,
            } => write!(f, "[{}] {}: {}", host, task, message),
            Event::TaskRetrying { task, host } => write!(f, "[{}] {}: retrying", host, task),
            Event::TaskRecovered { task, host } => {
                write!(f, "[{}] {}: succeeded after retry", host, task)
            }
            Event::TaskSkipped { task, host } => {
                write!(f, "[{}] {}: skipped (host unreachable)", host, task)
            }
            Event::TaskFinished { task, index, total } => {
                write!(f, "task {}/{} '{}' finished on all hosts", index + 1, total, task)
            }
            Event::RunAborted { after_task } => {
                write!(f, "run aborted after task '{}' failed", after_task)
            }
            Event::RunFinished {
                run_id,
                failures,
                duration,
            } => {
                if *failures == 0 {
                    write!(f, "run {} finished in {:.2?}", run_id, duration)
                } else {
                    write!(
                        f,
                        "run {} finished in {:.2?} with {} failure(s)",
                        run_id, duration, failures
                    )
                }
            }
        }
    }
}
