//! Concurrency tests.
//!
//! Hosts run a task at the same time; the next task waits for all of them.

use hostrun::testing::{HostScript, Reply, ScriptedConnector, Trace};
use std::sync::Arc;
use std::time::Duration;

use crate::common::{hosts, runner, tasks};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_all_hosts_start_before_any_finishes() {
    const HOSTS: usize = 6;
    let connector = Arc::new(ScriptedConnector::new().gate(HOSTS));
    let (runner, handle, _recorder) = runner(&connector);

    // A serialised run would never get through the gate.
    let result = tokio::time::timeout(
        Duration::from_secs(10),
        runner.run(&hosts(HOSTS), &tasks(&["deploy"])),
    )
    .await
    .expect("hosts did not run concurrently");
    handle.close().await;
    assert!(result.is_ok());

    let trace = connector.trace();
    assert_eq!(trace.len(), HOSTS * 2);
    assert!(trace[..HOSTS].iter().all(|t| matches!(t, Trace::Started { .. })));
    assert!(trace[HOSTS..].iter().all(|t| matches!(t, Trace::Finished { .. })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_next_task_waits_for_every_host() {
    let connector = Arc::new(ScriptedConnector::new().gate(3));
    let (runner, handle, recorder) = runner(&connector);

    runner
        .run(&hosts(3), &tasks(&["one", "two", "three"]))
        .await
        .unwrap();
    handle.close().await;

    let trace = connector.trace();
    for (i, task) in ["one", "two", "three"].iter().enumerate() {
        let window = &trace[i * 6..(i + 1) * 6];
        assert!(window.iter().all(|t| match t {
            Trace::Started { task: name, .. } | Trace::Finished { task: name, .. } => name == task,
        }));
    }
    let finished: Vec<String> = recorder
        .lines()
        .into_iter()
        .filter(|l| l.contains("finished on all hosts"))
        .collect();
    assert_eq!(
        finished,
        vec![
            "task 1/3 'one' finished on all hosts",
            "task 2/3 'two' finished on all hosts",
            "task 3/3 'three' finished on all hosts",
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failed_host_still_releases_barrier() {
    let connector = Arc::new(
        ScriptedConnector::new()
            .gate(2)
            .host("host2", HostScript::new().reply("one", Reply::transport("reset"))),
    );
    let (runner, handle, _recorder) = runner(&connector);

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        runner.run(&hosts(2), &tasks(&["one", "two"])),
    )
    .await
    .expect("barrier was not released");
    handle.close().await;

    assert!(result.is_err());
    assert_eq!(connector.hosts_for("two").len(), 2);
}
