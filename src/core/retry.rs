//! Interactive retry confirmation and password prompts.
//!
//! A failed task is never retried automatically. When a task allows retry,
//! the runner asks a [`Prompter`] whether to run it once more on the failing
//! host. The same capability answers password prompts for `askpass` tasks.
//! The console implementation blocks on stdin; other front ends can answer
//! asynchronously.

use async_trait::async_trait;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::io::{BufRead, IsTerminal, Write};
use tokio::sync::Mutex;

/// Operator interaction needed while a run is in progress.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Ask whether `task` should be run once more on `host`.
    async fn confirm_retry(&self, task: &str, host: &str) -> bool;

    /// Answer a remote password prompt on `host`. `None` leaves it unanswered.
    async fn password(&self, host: &str, prompt: &str) -> Option<String>;
}

/// Prompter that never retries and never answers passwords.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrompt;

#[async_trait]
impl Prompter for NoPrompt {
    async fn confirm_retry(&self, _task: &str, _host: &str) -> bool {
        false
    }

    async fn password(&self, _host: &str, _prompt: &str) -> Option<String> {
        None
    }
}

/// Prompter reading answers from the process's stdin.
///
/// Prompts are serialised: while one is waiting for input every other
/// worker that needs an answer waits too. Passwords are read with echo off
/// when stdin is a terminal.
#[derive(Debug, Default)]
pub struct ConsolePrompter {
    lock: Mutex<()>,
}

impl ConsolePrompter {
    /// Create a console prompter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Print `question` and read one line. With `hidden`, typed characters
    /// are not echoed when stdin is a terminal.
    async fn ask(&self, question: String, hidden: bool) -> Option<String> {
        let _guard = self.lock.lock().await;
        tokio::task::spawn_blocking(move || {
            let mut stdout = std::io::stdout();
            write!(stdout, "{}", question).ok()?;
            stdout.flush().ok()?;
            if hidden && std::io::stdin().is_terminal() {
                let answer = read_hidden_line();
                write!(stdout, "\r\n").ok()?;
                stdout.flush().ok()?;
                return answer.ok().flatten();
            }
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line).ok()?;
            Some(line.trim_end_matches(['\r', '\n']).to_string())
        })
        .await
        .ok()
        .flatten()
    }
}

/// What a key press does to a hidden line being typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    Continue,
    Submit,
    Cancel,
}

fn apply_key(line: &mut String, key: KeyEvent) -> KeyAction {
    if key.kind == KeyEventKind::Release {
        return KeyAction::Continue;
    }
    match key.code {
        KeyCode::Enter => KeyAction::Submit,
        KeyCode::Esc => KeyAction::Cancel,
        KeyCode::Char('c' | 'd') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            KeyAction::Cancel
        }
        KeyCode::Char(c) => {
            line.push(c);
            KeyAction::Continue
        }
        KeyCode::Backspace => {
            line.pop();
            KeyAction::Continue
        }
        _ => KeyAction::Continue,
    }
}

/// Read a line in raw mode so nothing is echoed. `None` if cancelled.
fn read_hidden_line() -> std::io::Result<Option<String>> {
    terminal::enable_raw_mode()?;
    let mut line = String::new();
    let result = loop {
        match event::read() {
            Ok(Event::Key(key)) => match apply_key(&mut line, key) {
                KeyAction::Continue => {}
                KeyAction::Submit => break Ok(Some(line)),
                KeyAction::Cancel => break Ok(None),
            },
            Ok(_) => {}
            Err(e) => break Err(e),
        }
    };
    terminal::disable_raw_mode()?;
    result
}

#[async_trait]
impl Prompter for ConsolePrompter {
    async fn confirm_retry(&self, task: &str, host: &str) -> bool {
        let answer = self
            .ask(
                format!("Retry task '{}' on host '{}'? [y/N] ", task, host),
                false,
            )
            .await;
        answer.as_deref().is_some_and(is_yes)
    }

    async fn password(&self, host: &str, prompt: &str) -> Option<String> {
        self.ask(format!("[{}] {} ", host, prompt.trim()), true).await
    }
}

/// Interpret a console answer as yes/no.
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
