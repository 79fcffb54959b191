//! Testing utilities for users of the hostrun library.
//!
//! These helpers let a [`TaskRunner`](crate::execution::TaskRunner) run
//! without a network:
//!
//! - [`ScriptedConnector`]: hands out sessions that answer from a [`HostScript`]
//! - [`RecordingWriter`]: a log writer that keeps every line in memory
//! - [`ScriptedPrompter`]: answers retry and password prompts with fixed values
//!
//! # Example
//!
//! ```
//! use hostrun::testing::{HostScript, Reply, ScriptedConnector};
//!
//! let connector = ScriptedConnector::new()
//!     .host("web1", HostScript::new().reply("deploy", Reply::exit(1)))
//!     .host("web2", HostScript::new().fail_connect("connection refused"));
//!
//! assert!(connector.opened().is_empty());
//! ```

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Barrier;

use crate::core::retry::Prompter;
use crate::core::types::HostTarget;
use crate::events::{LogSink, LogWriter, SinkHandle};
use crate::session::{Connector, ExecOutput, ExecRequest, RemoteSession, SessionError};

/// Scripted result of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The command ran and exited with a code and output.
    Exit(i32, String),
    /// The command could not be run.
    Transport(String),
}

impl Reply {
    /// Exit code 0 with no output.
    pub fn ok() -> Self {
        Reply::Exit(0, String::new())
    }

    /// The given exit code with no output.
    pub fn exit(code: i32) -> Self {
        Reply::Exit(code, String::new())
    }

    /// The given exit code and output.
    pub fn output(code: i32, output: impl Into<String>) -> Self {
        Reply::Exit(code, output.into())
    }

    /// A transport failure.
    pub fn transport(reason: impl Into<String>) -> Self {
        Reply::Transport(reason.into())
    }
}

/// How one host behaves.
///
/// Replies are queued per task and consumed one per execution; a task with
/// no queued reply succeeds with no output.
#[derive(Debug, Clone, Default)]
pub struct HostScript {
    connect_error: Option<String>,
    replies: HashMap<String, VecDeque<Reply>>,
}

impl HostScript {
    /// A host that connects and succeeds at everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make opening a session to this host fail.
    pub fn fail_connect(mut self, reason: impl Into<String>) -> Self {
        self.connect_error = Some(reason.into());
        self
    }

    /// Queue the reply for the next execution of `task`.
    pub fn reply(mut self, task: impl Into<String>, reply: Reply) -> Self {
        self.replies.entry(task.into()).or_default().push_back(reply);
        self
    }
}

/// One command a scripted session received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecCall {
    /// Host name.
    pub host: String,
    /// Task name.
    pub task: String,
    /// Full command line.
    pub command: String,
    /// Whether a PTY was requested.
    pub pty: bool,
    /// Password given to the prompt, for PTY executions.
    pub password: Option<String>,
}

/// Start and finish marks of scripted executions, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trace {
    Started { host: String, task: String },
    Finished { host: String, task: String },
}

#[derive(Debug, Default)]
struct Recorder {
    opened: Vec<String>,
    closed: Vec<String>,
    calls: Vec<ExecCall>,
    trace: Vec<Trace>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A [`Connector`] whose sessions answer from scripts.
#[derive(Debug, Default)]
pub struct ScriptedConnector {
    scripts: HashMap<String, HostScript>,
    gate: Option<Arc<Barrier>>,
    recorder: Arc<Mutex<Recorder>>,
}

impl ScriptedConnector {
    /// A connector where every host succeeds at everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a host by name.
    pub fn host(mut self, name: impl Into<String>, script: HostScript) -> Self {
        self.scripts.insert(name.into(), script);
        self
    }

    /// Hold every execution until `parties` executions are in flight at once.
    ///
    /// A run that serialised hosts would never get past the gate.
    pub fn gate(mut self, parties: usize) -> Self {
        self.gate = Some(Arc::new(Barrier::new(parties)));
        self
    }

    /// Hosts sessions were opened to, in order.
    pub fn opened(&self) -> Vec<String> {
        lock(&self.recorder).opened.clone()
    }

    /// Hosts whose sessions were closed.
    pub fn closed(&self) -> Vec<String> {
        lock(&self.recorder).closed.clone()
    }

    /// Every execution, in order.
    pub fn calls(&self) -> Vec<ExecCall> {
        lock(&self.recorder).calls.clone()
    }

    /// Hosts that executed `task`, in order.
    pub fn hosts_for(&self, task: &str) -> Vec<String> {
        lock(&self.recorder)
            .calls
            .iter()
            .filter(|c| c.task == task)
            .map(|c| c.host.clone())
            .collect()
    }

    /// Start and finish marks of every execution.
    pub fn trace(&self) -> Vec<Trace> {
        lock(&self.recorder).trace.clone()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn open(&self, target: &HostTarget) -> Result<Box<dyn RemoteSession>, SessionError> {
        let script = self.scripts.get(&target.name).cloned().unwrap_or_default();
        if let Some(reason) = script.connect_error {
            return Err(SessionError::Connect {
                address: target.host.host.clone(),
                reason,
            });
        }
        lock(&self.recorder).opened.push(target.name.clone());
        Ok(Box::new(ScriptedSession {
            host: target.name.clone(),
            replies: script.replies,
            gate: self.gate.clone(),
            recorder: Arc::clone(&self.recorder),
        }))
    }
}

struct ScriptedSession {
    host: String,
    replies: HashMap<String, VecDeque<Reply>>,
    gate: Option<Arc<Barrier>>,
    recorder: Arc<Mutex<Recorder>>,
}

#[async_trait]
impl RemoteSession for ScriptedSession {
    async fn exec(&mut self, request: &ExecRequest<'_>) -> Result<ExecOutput, SessionError> {
        lock(&self.recorder).trace.push(Trace::Started {
            host: self.host.clone(),
            task: request.task.to_string(),
        });

        let password = if request.pty {
            request.prompter.password(&self.host, "Password:").await
        } else {
            None
        };
        if let Some(gate) = &self.gate {
            gate.wait().await;
        }

        let reply = self
            .replies
            .get_mut(request.task)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(Reply::ok);

        let mut recorder = lock(&self.recorder);
        recorder.calls.push(ExecCall {
            host: self.host.clone(),
            task: request.task.to_string(),
            command: request.command.to_string(),
            pty: request.pty,
            password,
        });
        recorder.trace.push(Trace::Finished {
            host: self.host.clone(),
            task: request.task.to_string(),
        });

        match reply {
            Reply::Exit(code, output) => Ok(ExecOutput::new(code, output)),
            Reply::Transport(reason) => Err(SessionError::Channel(reason)),
        }
    }

    async fn close(&mut self) {
        lock(&self.recorder).closed.push(self.host.clone());
    }
}

/// A log writer that keeps lines in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingWriter {
    lines: Arc<Mutex<Vec<String>>>,
}

impl RecordingWriter {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorder as a writer for [`LogSink::open`].
    pub fn writer(&self) -> Arc<dyn LogWriter> {
        Arc::new(self.clone())
    }

    /// Every line written so far.
    pub fn lines(&self) -> Vec<String> {
        lock(&self.lines).clone()
    }

    /// Whether any line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        lock(&self.lines).iter().any(|l| l.contains(needle))
    }

    /// Number of lines containing `needle`.
    pub fn count(&self, needle: &str) -> usize {
        lock(&self.lines).iter().filter(|l| l.contains(needle)).count()
    }
}

impl LogWriter for RecordingWriter {
    fn write_line(&self, line: &str) {
        lock(&self.lines).push(line.to_string());
    }
}

/// Open a sink that records into a fresh [`RecordingWriter`].
pub fn recording_sink() -> (LogSink, SinkHandle, RecordingWriter) {
    let recorder = RecordingWriter::new();
    let (sink, handle) = LogSink::open(1024, vec![recorder.writer()]);
    (sink, handle, recorder)
}

/// A prompter with fixed answers that counts how often it was asked.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    retry: bool,
    password: Option<String>,
    asked: Mutex<Vec<(String, String)>>,
}

impl ScriptedPrompter {
    /// Answer every retry question with `retry`.
    pub fn new(retry: bool) -> Self {
        Self {
            retry,
            ..Default::default()
        }
    }

    /// Answer password prompts with `password`.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// `(task, host)` pairs a retry was asked for.
    pub fn asked(&self) -> Vec<(String, String)> {
        lock(&self.asked).clone()
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn confirm_retry(&self, task: &str, host: &str) -> bool {
        lock(&self.asked).push((task.to_string(), host.to_string()));
        self.retry
    }

    async fn password(&self, _host: &str, _prompt: &str) -> Option<String> {
        self.password.clone()
    }
}
