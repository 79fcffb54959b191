//! Remote sessions.
//!
//! A [`Connector`] opens one [`RemoteSession`] per host. The session belongs
//! to the worker driving that host for the whole run and is closed when the
//! run ends.
//!
//! A session reports two kinds of outcome and keeps them apart:
//!
//! - `Err(SessionError)` means the command could not be run at all (dial,
//!   authentication or channel failure).
//! - `Ok(ExecOutput)` means the command ran; its exit code may still be one
//!   the task did not expect, which the caller decides.

mod command;
mod ssh;

pub use command::{RemoteCommand, RemoteCommandBuilder, password_prompt, shell_quote};
pub use ssh::{SshConnector, expand_home};

use async_trait::async_trait;
use thiserror::Error;

use crate::core::retry::Prompter;
use crate::core::types::HostTarget;

/// Transport-level failures. A non-zero exit code is never one of these.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Could not reach the host.
    #[error("connection to {address} failed: {reason}")]
    Connect { address: String, reason: String },

    /// The server rejected the credentials.
    #[error("authentication failed for user '{user}'")]
    Auth { user: String },

    /// The private key could not be loaded.
    #[error("failed to load private key '{path}': {reason}")]
    Key { path: String, reason: String },

    /// The host entry has neither a password nor a private key.
    #[error("no password or private key configured for user '{user}'")]
    NoCredentials { user: String },

    /// The session channel failed while running a command.
    #[error("channel error: {0}")]
    Channel(String),
}

impl From<russh::Error> for SessionError {
    fn from(err: russh::Error) -> Self {
        SessionError::Channel(err.to_string())
    }
}

/// A command ready to send to a host.
pub struct ExecRequest<'a> {
    /// Task name, for diagnostics.
    pub task: &'a str,
    /// Full shell line including exports and `cd`.
    pub command: &'a str,
    /// Allocate a PTY and answer password prompts.
    pub pty: bool,
    /// Answers password prompts when `pty` is set.
    pub prompter: &'a dyn Prompter,
}

/// What a command produced once it ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    /// Remote exit status, `-1` if the remote side reported none.
    pub exit_code: i32,
    /// Stdout and stderr interleaved in arrival order.
    pub output: String,
}

impl ExecOutput {
    /// Create an output value.
    pub fn new(exit_code: i32, output: impl Into<String>) -> Self {
        Self {
            exit_code,
            output: output.into(),
        }
    }
}

/// An open execution channel to one host.
#[async_trait]
pub trait RemoteSession: Send {
    /// Run one command to completion.
    async fn exec(&mut self, request: &ExecRequest<'_>) -> Result<ExecOutput, SessionError>;

    /// Close the session. Errors are logged, not returned.
    async fn close(&mut self);
}

/// Opens sessions to hosts.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect and authenticate to a host.
    async fn open(&self, target: &HostTarget) -> Result<Box<dyn RemoteSession>, SessionError>;
}
