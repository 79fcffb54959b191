//! hostrun - run declared tasks across SSH hosts, one task at a time.
//!
//! A YAML task file declares hosts, parameters and an ordered task list.
//! [`ConfigLoader`] validates and substitutes it as a whole; [`TaskRunner`]
//! then runs each task on every selected host concurrently and waits for all
//! hosts to finish before moving to the next task.

pub mod config;
pub mod core;
pub mod events;
pub mod execution;
pub mod session;
pub mod testing;

pub use config::{
    Config, ConfigError, ConfigLoader, DependencyGraph, Host, MIN_CONFIG_VERSION, OnFailure,
    Substitutor, Task,
};
pub use crate::core::environment::{EnvFileError, Environment};
pub use crate::core::retry::{ConsolePrompter, NoPrompt, Prompter};
pub use crate::core::types::{HostTarget, RunId};
pub use events::{Event, FileWriter, LogSink, LogWriter, SinkHandle, TracingWriter};
pub use execution::{
    RunError, SelectionError, TaskOutcome, TaskRunner, select_hosts, select_tasks,
};
pub use session::{
    Connector, ExecOutput, ExecRequest, RemoteCommand, RemoteSession, SessionError, SshConnector,
};
