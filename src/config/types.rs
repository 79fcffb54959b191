//! Configuration type definitions.
//!
//! These types mirror the YAML task file: the application name, the hosts to
//! reach, the parameters used for substitution and the ordered task list.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A complete, validated task file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Task file format version.
    #[serde(default)]
    pub version: String,
    /// Application name, available as `${appname}`.
    #[serde(default, rename = "appname")]
    pub app_name: String,
    /// Hosts keyed by their short name.
    #[serde(default)]
    pub hosts: BTreeMap<String, Host>,
    /// Tasks in file order.
    #[serde(default)]
    pub tasks: Vec<Task>,
    /// User parameters available as `${name}`.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    /// What to do after a task fails on some host.
    #[serde(default)]
    pub on_failure: OnFailure,
    /// Epoch milliseconds stamped at load time, available as `${release_version}`.
    #[serde(skip_deserializing)]
    pub release_version: i64,
}

impl Config {
    /// Look up a task by name.
    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Look up a host by name.
    pub fn host(&self, name: &str) -> Option<&Host> {
        self.hosts.get(name)
    }
}

/// Connection details for one remote host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    /// Address: `name`, `name:port`, a bare IPv6 address or `[addr]:port`.
    #[serde(default)]
    pub host: String,
    /// Login user.
    #[serde(default)]
    pub username: String,
    /// Password for password authentication.
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    /// Private key path; takes precedence over `password`.
    #[serde(default, rename = "private_key")]
    pub private_key_path: Option<String>,
    /// Local file of `KEY=VALUE` lines exported before every command.
    #[serde(default, rename = "envfile")]
    pub env_file_path: Option<String>,
}

impl Host {
    /// Split the address into host name and port (default 22).
    ///
    /// A port is only split off `name:port` or `[addr]:port`; an address
    /// with several colons and no brackets is a bare IPv6 address.
    pub fn address(&self) -> (&str, u16) {
        let host = self.host.as_str();
        if let Some((addr, rest)) = host.strip_prefix('[').and_then(|h| h.split_once(']')) {
            let port = rest
                .strip_prefix(':')
                .and_then(|p| p.parse().ok())
                .unwrap_or(22);
            return (addr, port);
        }
        if host.matches(':').count() == 1 {
            if let Some((name, port)) = host.split_once(':') {
                if let Ok(port) = port.parse() {
                    return (name, port);
                }
            }
        }
        (host, 22)
    }
}

/// One named remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task name.
    #[serde(default)]
    pub name: String,
    /// Shell command to run remotely.
    #[serde(default)]
    pub cmd: String,
    /// Remote working directory.
    #[serde(default)]
    pub dir: Option<String>,
    /// Exit code that counts as success.
    #[serde(default, rename = "expect")]
    pub expected_exit_code: i32,
    /// Message shown after the task succeeds.
    #[serde(default)]
    pub message: Option<String>,
    /// Offer an interactive retry when the exit code does not match.
    #[serde(default)]
    pub retry: bool,
    /// Run under a PTY so the command can prompt for a password.
    #[serde(default, rename = "askpass")]
    pub ask_pass: bool,
    /// Only run when selected by name or when library tasks are included.
    #[serde(default, rename = "lib")]
    pub is_library: bool,
    /// Always show the command's output.
    #[serde(default, rename = "output")]
    pub show_output: bool,
    /// Tasks that must exist and must not form a cycle with this one.
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// Run-level failure policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnFailure {
    /// Run every task on every host regardless of earlier failures.
    #[default]
    Continue,
    /// Stop before the next task once any host failed the current one.
    Abort,
}
