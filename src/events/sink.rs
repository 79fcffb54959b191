//! Non-blocking log sink.
//!
//! [`LogSink`] is a cheap, cloneable handle that every worker can emit on at
//! once. Lines go through a bounded queue to a single writer task; when the
//! queue is full the line is dropped and counted rather than blocking the
//! caller. The writer task runs until [`SinkHandle::close`] drains it.

use chrono::{SecondsFormat, Utc};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::Event;

/// Destination for emitted lines. Called from the single writer task.
pub trait LogWriter: Send + Sync {
    /// Write one line.
    fn write_line(&self, line: &str);
}

#[derive(Debug, Default)]
struct SinkState {
    closed: AtomicBool,
    dropped: AtomicU64,
}

/// Handle for emitting log lines.
#[derive(Debug, Clone)]
pub struct LogSink {
    tx: mpsc::Sender<String>,
    state: Arc<SinkState>,
}

impl LogSink {
    /// Open a sink with a queue of `capacity` lines feeding `writers`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(capacity: usize, writers: Vec<Arc<dyn LogWriter>>) -> (LogSink, SinkHandle) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (close_tx, close_rx) = oneshot::channel();
        let state = Arc::new(SinkState::default());
        let task = tokio::spawn(drain(rx, close_rx, writers));

        let sink = LogSink {
            tx,
            state: Arc::clone(&state),
        };
        let handle = SinkHandle {
            close_tx,
            task,
            state,
        };
        (sink, handle)
    }

    /// Queue a line without waiting. Dropped if the queue is full or closed.
    pub fn emit(&self, line: impl Into<String>) {
        if self.state.closed.load(Ordering::Acquire) || self.tx.try_send(line.into()).is_err() {
            self.state.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Emit the log line for an event.
    pub fn event(&self, event: &Event) {
        self.emit(event.to_string());
    }

    /// Number of lines dropped so far.
    pub fn dropped(&self) -> u64 {
        self.state.dropped.load(Ordering::Relaxed)
    }

    /// Whether the sink has been closed.
    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::Acquire)
    }
}

/// Owner side of a sink; closing it flushes queued lines.
#[derive(Debug)]
pub struct SinkHandle {
    close_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
    state: Arc<SinkState>,
}

impl SinkHandle {
    /// Stop accepting lines, write everything already queued and wait for the
    /// writer task to finish.
    pub async fn close(self) {
        self.state.closed.store(true, Ordering::Release);
        let _ = self.close_tx.send(());
        if let Err(e) = self.task.await {
            debug!(error = %e, "log writer task ended abnormally");
        }
    }
}

async fn drain(
    mut rx: mpsc::Receiver<String>,
    mut close_rx: oneshot::Receiver<()>,
    writers: Vec<Arc<dyn LogWriter>>,
) {
    let write = |line: &str| {
        for writer in &writers {
            writer.write_line(line);
        }
    };

    loop {
        tokio::select! {
            biased;
            line = rx.recv() => match line {
                Some(line) => write(&line),
                None => break,
            },
            _ = &mut close_rx => {
                while let Ok(line) = rx.try_recv() {
                    write(&line);
                }
                break;
            }
        }
    }
}

/// Mirrors lines to `tracing` at INFO level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingWriter;

impl LogWriter for TracingWriter {
    fn write_line(&self, line: &str) {
        info!(target: "hostrun", "{}", line);
    }
}

/// Appends timestamped lines to a file.
#[derive(Debug)]
pub struct FileWriter {
    file: Mutex<File>,
}

impl FileWriter {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl LogWriter for FileWriter {
    fn write_line(&self, line: &str) {
        let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let Ok(mut file) = self.file.lock() else {
            return;
        };
        if let Err(e) = writeln!(file, "{} {}", stamp, line) {
            debug!(error = %e, "failed to write log file");
        }
    }
}
