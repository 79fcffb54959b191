//! Per-host task execution.
//!
//! A `HostWorker` owns the session to one host for the whole run. For each
//! task it:
//! - Opens the session on first use, loading the host's env file
//! - Runs the command and compares the exit code with the expected one
//! - Records at most one error per task on the run's error channel
//! - Offers a single interactive retry when the task allows it

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::Task;
use crate::core::environment::Environment;
use crate::core::retry::Prompter;
use crate::core::types::HostTarget;
use crate::events::{Event, LogSink};
use crate::session::{
    Connector, ExecOutput, ExecRequest, RemoteCommand, RemoteSession, SessionError, expand_home,
};

use super::error::RunError;

/// What happened to one task on one host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Exited with the expected code.
    Succeeded,
    /// Failed, then succeeded on an operator-confirmed retry.
    Recovered,
    /// Could not run, or exited with an unexpected code.
    Failed,
    /// Not run because the host is unreachable.
    Skipped,
}

impl TaskOutcome {
    /// Whether the task is still failed on this host.
    pub fn is_failed(&self) -> bool {
        matches!(self, TaskOutcome::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HostState {
    Pending,
    Connected,
    Unreachable,
}

/// Shared pieces every worker of a run gets.
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub connector: Arc<dyn Connector>,
    pub prompter: Arc<dyn Prompter>,
    pub sink: LogSink,
    pub errors: mpsc::Sender<RunError>,
    pub debug: bool,
}

/// Drives the tasks of a run on one host.
pub(crate) struct HostWorker {
    target: HostTarget,
    ctx: WorkerContext,
    state: HostState,
    session: Option<Box<dyn RemoteSession>>,
    environment: Environment,
}

impl HostWorker {
    pub fn new(target: HostTarget, ctx: WorkerContext) -> Self {
        Self {
            target,
            ctx,
            state: HostState::Pending,
            session: None,
            environment: Environment::new(),
        }
    }

    fn name(&self) -> &str {
        &self.target.name
    }

    /// Run one task on this host and report the outcome.
    pub async fn run_task(&mut self, task: &Task) -> TaskOutcome {
        if self.state == HostState::Unreachable {
            self.emit(Event::TaskSkipped {
                task: task.name.clone(),
                host: self.name().to_string(),
            });
            return TaskOutcome::Skipped;
        }

        if self.state == HostState::Pending {
            if let Err(reason) = self.connect().await {
                self.state = HostState::Unreachable;
                self.emit(Event::HostUnreachable {
                    host: self.name().to_string(),
                    error: reason.clone(),
                });
                self.record(RunError::Connection {
                    host: self.name().to_string(),
                    reason,
                });
                return TaskOutcome::Failed;
            }
            self.state = HostState::Connected;
            self.emit(Event::HostConnected {
                host: self.name().to_string(),
            });
        }

        let command = RemoteCommand::for_task(task, &self.environment).to_shell_line();
        if self.ctx.debug {
            self.emit(Event::CommandLine {
                task: task.name.clone(),
                host: self.name().to_string(),
                command: command.clone(),
            });
        }
        self.emit(Event::TaskStarted {
            task: task.name.clone(),
            host: self.name().to_string(),
        });

        let start = Instant::now();
        let output = match self.exec(task, &command).await {
            Ok(output) => output,
            Err(e) => {
                self.failed(task, e.to_string());
                self.record(RunError::Transport {
                    task: task.name.clone(),
                    host: self.name().to_string(),
                    reason: e.to_string(),
                });
                return TaskOutcome::Failed;
            }
        };

        if output.exit_code == task.expected_exit_code {
            self.succeeded(task, &output, start);
            return TaskOutcome::Succeeded;
        }

        self.mismatched(task, &output);
        self.record(RunError::ExitMismatch {
            task: task.name.clone(),
            host: self.name().to_string(),
            expected: task.expected_exit_code,
            actual: output.exit_code,
        });
        if self.ctx.debug || task.show_output || task.retry {
            self.output(task, &output);
        }

        if !task.retry
            || !self
                .ctx
                .prompter
                .confirm_retry(&task.name, &self.target.name)
                .await
        {
            return TaskOutcome::Failed;
        }

        self.emit(Event::TaskRetrying {
            task: task.name.clone(),
            host: self.name().to_string(),
        });
        match self.exec(task, &command).await {
            Ok(output) if output.exit_code == task.expected_exit_code => {
                self.emit(Event::TaskRecovered {
                    task: task.name.clone(),
                    host: self.name().to_string(),
                });
                if self.ctx.debug || task.show_output {
                    self.output(task, &output);
                }
                self.message(task);
                TaskOutcome::Recovered
            }
            Ok(output) => {
                self.mismatched(task, &output);
                if self.ctx.debug || task.show_output {
                    self.output(task, &output);
                }
                TaskOutcome::Failed
            }
            Err(e) => {
                self.failed(task, e.to_string());
                TaskOutcome::Failed
            }
        }
    }

    /// Record a panic in `task` as a failure and give up on this host.
    ///
    /// The session may be mid-command, so it is dropped without a clean close
    /// and every later task on this host is skipped.
    pub fn abandon(&mut self, task: &Task) -> TaskOutcome {
        self.session = None;
        self.state = HostState::Unreachable;
        self.failed(task, "worker panicked".to_string());
        self.record(RunError::Panicked {
            task: task.name.clone(),
            host: self.name().to_string(),
        });
        TaskOutcome::Failed
    }

    /// Close the session if one is open.
    pub async fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close().await;
            debug!(host = %self.target.name, "session closed");
        }
    }

    async fn connect(&mut self) -> Result<(), String> {
        if let Some(path) = self.target.host.env_file_path.as_deref() {
            self.environment =
                Environment::from_env_file(expand_home(path)).map_err(|e| e.to_string())?;
            debug!(host = %self.target.name, vars = self.environment.len(), "loaded env file");
        }
        let session = self
            .ctx
            .connector
            .open(&self.target)
            .await
            .map_err(|e| e.to_string())?;
        self.session = Some(session);
        Ok(())
    }

    async fn exec(&mut self, task: &Task, command: &str) -> Result<ExecOutput, SessionError> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| SessionError::Channel("session is not open".to_string()))?;
        let request = ExecRequest {
            task: &task.name,
            command,
            pty: task.ask_pass,
            prompter: self.ctx.prompter.as_ref(),
        };
        debug!(host = %self.target.name, task = %task.name, pty = task.ask_pass, "executing");
        session.exec(&request).await
    }

    fn succeeded(&self, task: &Task, output: &ExecOutput, start: Instant) {
        self.emit(Event::TaskSucceeded {
            task: task.name.clone(),
            host: self.name().to_string(),
            duration: start.elapsed(),
        });
        if self.ctx.debug || task.show_output {
            self.output(task, output);
        }
        self.message(task);
    }

    fn mismatched(&self, task: &Task, output: &ExecOutput) {
        self.failed(
            task,
            format!(
                "expected exit code {}, got {}",
                task.expected_exit_code, output.exit_code
            ),
        );
    }

    fn failed(&self, task: &Task, reason: String) {
        self.emit(Event::TaskFailed {
            task: task.name.clone(),
            host: self.name().to_string(),
            reason,
        });
    }

    fn output(&self, task: &Task, output: &ExecOutput) {
        if output.output.trim().is_empty() {
            return;
        }
        self.emit(Event::TaskOutput {
            task: task.name.clone(),
            host: self.name().to_string(),
            output: output.output.clone(),
        });
    }

    fn message(&self, task: &Task) {
        if let Some(message) = task.message.as_deref().filter(|m| !m.is_empty()) {
            self.emit(Event::TaskMessage {
                task: task.name.clone(),
                host: self.name().to_string(),
                message: message.to_string(),
            });
        }
    }

    fn emit(&self, event: Event) {
        self.ctx.sink.event(&event);
    }

    fn record(&self, error: RunError) {
        debug!(host = %self.target.name, error = %error, "recording failure");
        if self.ctx.errors.try_send(error).is_err() {
            debug!(host = %self.target.name, "error channel full, failure only logged");
        }
    }
}
