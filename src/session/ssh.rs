//! SSH sessions backed by `russh`.
//!
//! Authentication uses the host's private key when one is configured and
//! falls back to its password. Commands run on a fresh channel each; a PTY
//! is requested for `askpass` tasks so the remote side can prompt.

use async_trait::async_trait;
use russh::client::{self, Handle};
use russh::{ChannelMsg, Disconnect};
use russh_keys::key;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use super::command::password_prompt;
use super::{Connector, ExecOutput, ExecRequest, RemoteSession, SessionError};
use crate::core::types::HostTarget;

/// Opens SSH sessions.
#[derive(Clone)]
pub struct SshConnector {
    config: Arc<client::Config>,
    strict_host_keys: bool,
}

impl SshConnector {
    /// Create a connector that accepts any host key.
    pub fn new() -> Self {
        Self {
            config: Arc::new(client::Config::default()),
            strict_host_keys: false,
        }
    }

    /// Require host keys to match `~/.ssh/known_hosts`.
    pub fn strict_host_keys(mut self, strict: bool) -> Self {
        self.strict_host_keys = strict;
        self
    }
}

impl Default for SshConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for SshConnector {
    async fn open(&self, target: &HostTarget) -> Result<Box<dyn RemoteSession>, SessionError> {
        let (host, port) = target.host.address();
        let address = format!("{}:{}", host, port);
        debug!(host = %target.name, %address, "opening ssh session");

        let handler = ClientHandler {
            host: host.to_string(),
            port,
            strict: self.strict_host_keys,
        };
        let mut handle = client::connect(self.config.clone(), (host, port), handler)
            .await
            .map_err(|e| SessionError::Connect {
                address: address.clone(),
                reason: e.to_string(),
            })?;

        let user = &target.host.username;
        let authenticated = if let Some(key_path) = target.host.private_key_path.as_deref() {
            let path = expand_home(key_path);
            let key_pair =
                russh_keys::load_secret_key(&path, None).map_err(|e| SessionError::Key {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;
            handle.authenticate_publickey(user, Arc::new(key_pair)).await?
        } else if let Some(password) = target.host.password.as_deref() {
            handle.authenticate_password(user, password).await?
        } else {
            return Err(SessionError::NoCredentials { user: user.clone() });
        };

        if !authenticated {
            return Err(SessionError::Auth { user: user.clone() });
        }

        Ok(Box::new(SshSession {
            name: target.name.clone(),
            handle,
        }))
    }
}

struct ClientHandler {
    host: String,
    port: u16,
    strict: bool,
}

#[async_trait]
impl client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &key::PublicKey,
    ) -> Result<bool, Self::Error> {
        if !self.strict {
            return Ok(true);
        }
        match russh_keys::check_known_hosts(&self.host, self.port, server_public_key) {
            Ok(known) => Ok(known),
            Err(e) => {
                warn!(host = %self.host, error = %e, "host key check failed");
                Ok(false)
            }
        }
    }
}

struct SshSession {
    name: String,
    handle: Handle<ClientHandler>,
}

#[async_trait]
impl RemoteSession for SshSession {
    async fn exec(&mut self, request: &ExecRequest<'_>) -> Result<ExecOutput, SessionError> {
        let mut channel = self.handle.channel_open_session().await?;
        if request.pty {
            channel
                .request_pty(true, "xterm", 80, 24, 0, 0, &[])
                .await?;
        }
        channel.exec(true, request.command).await?;

        let mut buf: Vec<u8> = Vec::new();
        let mut answered_at = 0usize;
        let mut exit_code = None;

        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => {
                    buf.extend_from_slice(data);
                    if request.pty {
                        let pending = String::from_utf8_lossy(&buf[answered_at..]).into_owned();
                        if let Some(prompt) = password_prompt(&pending) {
                            answered_at = buf.len();
                            if let Some(password) =
                                request.prompter.password(&self.name, prompt).await
                            {
                                let line = format!("{}\n", password);
                                channel.data(line.as_bytes()).await?;
                            }
                        }
                    }
                }
                ChannelMsg::ExtendedData { ref data, .. } => {
                    buf.extend_from_slice(data);
                }
                ChannelMsg::ExitStatus { exit_status } => {
                    exit_code = Some(exit_status as i32);
                }
                ChannelMsg::ExitSignal { signal_name, .. } => {
                    debug!(host = %self.name, task = request.task, ?signal_name, "command killed by signal");
                }
                _ => {}
            }
        }

        Ok(ExecOutput {
            exit_code: exit_code.unwrap_or(-1),
            output: String::from_utf8_lossy(&buf).into_owned(),
        })
    }

    async fn close(&mut self) {
        if let Err(e) = self
            .handle
            .disconnect(Disconnect::ByApplication, "", "English")
            .await
        {
            debug!(host = %self.name, error = %e, "ssh disconnect failed");
        }
    }
}

/// Expand a leading `~/` to the current user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
