//! Remote command lines.
//!
//! [`RemoteCommand`] composes the single shell line sent to a host: exported
//! environment variables, an optional `cd` into the task directory, then the
//! task's command.
//!
//! ```
//! use hostrun::{Environment, RemoteCommand};
//!
//! let line = RemoteCommand::builder("systemctl restart api")
//!     .working_dir("/srv/api")
//!     .environment(Environment::new().with_var("APP_ENV", "prod"))
//!     .build()
//!     .to_shell_line();
//!
//! assert_eq!(line, "export APP_ENV='prod'; cd '/srv/api' && systemctl restart api");
//! ```

use crate::config::Task;
use crate::core::environment::Environment;

/// A shell command with its environment and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    /// The command as written in the task.
    command: String,
    /// Variables exported before the command.
    environment: Environment,
    /// Directory to change into first.
    working_dir: Option<String>,
}

impl RemoteCommand {
    /// Create a new builder for a command.
    pub fn builder(command: impl Into<String>) -> RemoteCommandBuilder {
        RemoteCommandBuilder::new(command)
    }

    /// Build the command line for a task with a host's environment.
    pub fn for_task(task: &Task, environment: &Environment) -> Self {
        let mut builder = Self::builder(task.cmd.clone()).environment(environment.clone());
        if let Some(dir) = task.dir.as_deref().filter(|d| !d.is_empty()) {
            builder = builder.working_dir(dir);
        }
        builder.build()
    }

    /// Get the bare command.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Get the working directory.
    pub fn working_dir(&self) -> Option<&str> {
        self.working_dir.as_deref()
    }

    /// Render the single line sent to the remote shell.
    pub fn to_shell_line(&self) -> String {
        let mut line = String::new();
        for (key, value) in self.environment.iter() {
            line.push_str(&format!("export {}={}; ", key, shell_quote(value)));
        }
        if let Some(dir) = &self.working_dir {
            line.push_str(&format!("cd {} && ", shell_quote(dir)));
        }
        line.push_str(&self.command);
        line
    }
}

/// Builder for creating `RemoteCommand` instances.
#[derive(Debug, Clone)]
pub struct RemoteCommandBuilder {
    command: String,
    environment: Environment,
    working_dir: Option<String>,
}

impl RemoteCommandBuilder {
    /// Create a new builder with the given command.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            environment: Environment::default(),
            working_dir: None,
        }
    }

    /// Set environment variables.
    pub fn environment(mut self, env: Environment) -> Self {
        self.environment = env;
        self
    }

    /// Add a single environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.set(key, value);
        self
    }

    /// Set the working directory.
    pub fn working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Build the `RemoteCommand`.
    pub fn build(self) -> RemoteCommand {
        RemoteCommand {
            command: self.command,
            environment: self.environment,
            working_dir: self.working_dir,
        }
    }
}

/// Quote a value for a POSIX shell using single quotes.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// If `output` currently ends in a password prompt, return the prompt line.
///
/// A prompt is a last line, without trailing newline, that mentions
/// "password" and ends with `:` (e.g. `[sudo] password for deploy: `).
pub fn password_prompt(output: &str) -> Option<&str> {
    if output.ends_with('\n') {
        return None;
    }
    let last = output.rsplit('\n').next()?.trim_end_matches('\r');
    let trimmed = last.trim_end();
    if trimmed.ends_with(':') && trimmed.to_ascii_lowercase().contains("password") {
        Some(trimmed)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_command() {
        let cmd = RemoteCommand::builder("uptime").build();
        assert_eq!(cmd.command(), "uptime");
        assert_eq!(cmd.working_dir(), None);
        assert_eq!(cmd.to_shell_line(), "uptime");
    }

    #[test]
    fn test_exports_are_sorted_and_quoted() {
        let line = RemoteCommand::builder("env")
            .env("B", "two words")
            .env("A", "it's")
            .build()
            .to_shell_line();
        assert_eq!(line, r"export A='it'\''s'; export B='two words'; env");
    }

    #[test]
    fn test_for_task_uses_dir() {
        let task = Task {
            name: "ls".into(),
            cmd: "ls -la".into(),
            dir: Some("/var/log".into()),
            ..Default::default()
        };
        let line = RemoteCommand::for_task(&task, &Environment::new()).to_shell_line();
        assert_eq!(line, "cd '/var/log' && ls -la");
    }

    #[test]
    fn test_for_task_ignores_empty_dir() {
        let task = Task {
            name: "ls".into(),
            cmd: "ls".into(),
            dir: Some(String::new()),
            ..Default::default()
        };
        let line = RemoteCommand::for_task(&task, &Environment::new()).to_shell_line();
        assert_eq!(line, "ls");
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("a'b"), r"'a'\''b'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn test_password_prompt_detection() {
        assert_eq!(
            password_prompt("starting\n[sudo] password for deploy: "),
            Some("[sudo] password for deploy:")
        );
        assert_eq!(password_prompt("Password:"), Some("Password:"));
        assert_eq!(password_prompt("Password:\n"), None);
        assert_eq!(password_prompt("password accepted"), None);
        assert_eq!(password_prompt("loading: "), None);
    }
}
