//! Task runner.
//!
//! The `TaskRunner` fans each task out to every selected host and waits at a
//! barrier until all hosts have finished it before any host starts the next
//! one. Hosts run a task concurrently with no ordering among themselves.
//!
//! Failures never stop sibling hosts. They are collected on a bounded channel
//! sized so that no worker ever blocks on reporting, and once every task has
//! run the first one enqueued is returned. With [`OnFailure::Abort`] the run
//! stops at the barrier of the first task any host failed. A worker that
//! panics inside a task records a failure for it and still reaches the
//! barrier, so its siblings are never left waiting.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::sync::{Barrier, mpsc};
use tracing::{Instrument, debug, info_span, warn};

use crate::config::{OnFailure, Task};
use crate::core::retry::{NoPrompt, Prompter};
use crate::core::types::{HostTarget, RunId};
use crate::events::{Event, LogSink};
use crate::session::Connector;

use super::error::RunError;
use super::executor::{HostWorker, WorkerContext};
use super::select::select_tasks;

/// Runs tasks across hosts with one barrier per task.
pub struct TaskRunner {
    connector: Arc<dyn Connector>,
    prompter: Arc<dyn Prompter>,
    sink: LogSink,
    debug: bool,
    on_failure: OnFailure,
}

impl TaskRunner {
    /// Create a runner that opens sessions with `connector` and logs to `sink`.
    ///
    /// Retries are declined until a prompter is set.
    pub fn new(connector: Arc<dyn Connector>, sink: LogSink) -> Self {
        Self {
            connector,
            prompter: Arc::new(NoPrompt),
            sink,
            debug: false,
            on_failure: OnFailure::default(),
        }
    }

    /// Set the prompter for retry confirmations and password prompts.
    pub fn prompter(mut self, prompter: Arc<dyn Prompter>) -> Self {
        self.prompter = prompter;
        self
    }

    /// Echo command lines and show output of every task.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set the failure policy.
    pub fn on_failure(mut self, policy: OnFailure) -> Self {
        self.on_failure = policy;
        self
    }

    /// Select tasks from `tasks` and run them on `hosts`.
    ///
    /// With a `filter` only the named task runs, library or not. Without
    /// one every task runs except library tasks, which are included when
    /// `include_library` is set. An unknown task name fails before any host
    /// is contacted.
    pub async fn run_selected(
        &self,
        hosts: &[HostTarget],
        tasks: &[Task],
        filter: Option<&str>,
        include_library: bool,
    ) -> Result<(), RunError> {
        let selected = select_tasks(tasks, filter, include_library)?;
        self.run(hosts, &selected).await
    }

    /// Run `tasks` in order on every host in `hosts`.
    ///
    /// Returns the first failure recorded, after every task has finished on
    /// every host. All failures are logged to the sink as they happen.
    pub async fn run(&self, hosts: &[HostTarget], tasks: &[Task]) -> Result<(), RunError> {
        let run_id = RunId::new();
        let span = info_span!(
            "run",
            run_id = %run_id,
            host_count = hosts.len(),
            task_count = tasks.len(),
        );
        self.run_inner(run_id, hosts, tasks).instrument(span).await
    }

    async fn run_inner(
        &self,
        run_id: RunId,
        hosts: &[HostTarget],
        tasks: &[Task],
    ) -> Result<(), RunError> {
        let start = Instant::now();
        self.sink.event(&Event::RunStarted {
            run_id,
            hosts: hosts.len(),
            tasks: tasks.len(),
        });

        if hosts.is_empty() || tasks.is_empty() {
            debug!("nothing to run");
            self.sink.event(&Event::RunFinished {
                run_id,
                failures: 0,
                duration: start.elapsed(),
            });
            return Ok(());
        }

        // One slot per (task, host) pair, plus one per host for a panic after
        // that pair already recorded its error.
        let (errors_tx, mut errors_rx) = mpsc::channel(hosts.len() * (tasks.len() + 1));
        let tasks: Arc<[Task]> = tasks.to_vec().into();
        let failed: Arc<[AtomicBool]> = (0..tasks.len())
            .map(|_| AtomicBool::new(false))
            .collect::<Vec<_>>()
            .into();
        let barrier = Arc::new(Barrier::new(hosts.len()));

        let ctx = WorkerContext {
            connector: Arc::clone(&self.connector),
            prompter: Arc::clone(&self.prompter),
            sink: self.sink.clone(),
            errors: errors_tx,
            debug: self.debug,
        };

        let mut handles = Vec::with_capacity(hosts.len());
        for target in hosts {
            let span = info_span!("host", host = %target.name);
            let worker = HostWorker::new(target.clone(), ctx.clone());
            let plan = RunPlan {
                tasks: Arc::clone(&tasks),
                failed: Arc::clone(&failed),
                barrier: Arc::clone(&barrier),
                on_failure: self.on_failure,
                sink: self.sink.clone(),
            };
            handles.push(tokio::spawn(drive_host(worker, plan).instrument(span)));
        }
        drop(ctx);

        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "host worker ended abnormally");
            }
        }

        let first = errors_rx.try_recv().ok();
        let mut failures = usize::from(first.is_some());
        while errors_rx.try_recv().is_ok() {
            failures += 1;
        }

        self.sink.event(&Event::RunFinished {
            run_id,
            failures,
            duration: start.elapsed(),
        });

        match first {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

struct RunPlan {
    tasks: Arc<[Task]>,
    failed: Arc<[AtomicBool]>,
    barrier: Arc<Barrier>,
    on_failure: OnFailure,
    sink: LogSink,
}

async fn drive_host(mut worker: HostWorker, plan: RunPlan) {
    let total = plan.tasks.len();
    for (index, task) in plan.tasks.iter().enumerate() {
        let outcome = match AssertUnwindSafe(worker.run_task(task)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(task = %task.name, "host worker panicked");
                worker.abandon(task)
            }
        };
        if outcome.is_failed() {
            plan.failed[index].store(true, Ordering::Release);
        }

        // Every flag for this task is set before anyone passes the barrier.
        let leader = plan.barrier.wait().await.is_leader();
        let abort = plan.on_failure == OnFailure::Abort && plan.failed[index].load(Ordering::Acquire);

        if leader {
            plan.sink.event(&Event::TaskFinished {
                task: task.name.clone(),
                index,
                total,
            });
            if abort && index + 1 < total {
                plan.sink.event(&Event::RunAborted {
                    after_task: task.name.clone(),
                });
            }
        }
        if abort {
            break;
        }
    }
    worker.close().await;
}
