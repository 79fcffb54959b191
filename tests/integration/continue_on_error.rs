//! Continue-on-error tests.
//!
//! Failures on one host never stop the others, every task runs on every
//! host, and the run returns a single error at the end.

use hostrun::RunError;
use hostrun::testing::{HostScript, Reply, ScriptedConnector};
use std::sync::Arc;

use crate::common::{hosts, runner, tasks};

#[tokio::test]
async fn test_one_failing_host_does_not_stop_the_others() {
    let connector = Arc::new(
        ScriptedConnector::new().host("host3", HostScript::new().reply("deploy", Reply::exit(1))),
    );
    let (runner, handle, recorder) = runner(&connector);

    let result = runner.run(&hosts(5), &tasks(&["deploy"])).await;
    handle.close().await;

    assert!(matches!(result, Err(RunError::ExitMismatch { ref host, actual: 1, .. }) if host == "host3"));
    let mut ran = connector.hosts_for("deploy");
    ran.sort();
    assert_eq!(ran, vec!["host1", "host2", "host3", "host4", "host5"]);
    assert_eq!(recorder.count("deploy: ok"), 4);
    assert_eq!(recorder.count("deploy: FAILED"), 1);
}

#[tokio::test]
async fn test_later_tasks_still_run_and_one_error_is_returned() {
    let connector = Arc::new(
        ScriptedConnector::new().host("host1", HostScript::new().reply("one", Reply::exit(2))),
    );
    let (runner, handle, recorder) = runner(&connector);

    let result = runner.run(&hosts(2), &tasks(&["one", "two"])).await;
    handle.close().await;

    let err = result.unwrap_err();
    assert_eq!(err.task(), Some("one"));
    assert_eq!(connector.hosts_for("two").len(), 2);
    assert!(recorder.contains("with 1 failure(s)"));
}

#[tokio::test]
async fn test_many_failures_return_only_one_but_log_all() {
    let mut connector = ScriptedConnector::new();
    for i in 1..=2 {
        connector = connector.host(
            format!("host{}", i),
            HostScript::new()
                .reply("one", Reply::exit(1))
                .reply("two", Reply::exit(1)),
        );
    }
    let connector = Arc::new(connector);
    let (runner, handle, recorder) = runner(&connector);

    let result = runner.run(&hosts(2), &tasks(&["one", "two"])).await;
    handle.close().await;

    // Errors from task one are enqueued before task two starts.
    assert_eq!(result.unwrap_err().task(), Some("one"));
    assert_eq!(recorder.count("FAILED"), 4);
    assert!(recorder.contains("with 4 failure(s)"));
}

#[tokio::test]
async fn test_unreachable_host_records_one_error_and_skips() {
    let connector = Arc::new(
        ScriptedConnector::new().host("host2", HostScript::new().fail_connect("no route to host")),
    );
    let (runner, handle, recorder) = runner(&connector);

    let result = runner.run(&hosts(3), &tasks(&["one", "two", "three"])).await;
    handle.close().await;

    assert!(matches!(result, Err(RunError::Connection { ref host, .. }) if host == "host2"));
    for task in ["one", "two", "three"] {
        let ran = connector.hosts_for(task);
        assert_eq!(ran.len(), 2);
        assert!(!ran.contains(&"host2".to_string()));
    }
    assert_eq!(recorder.count("[host2] connection failed: "), 1);
    assert_eq!(recorder.count("skipped (host unreachable)"), 2);
    assert!(recorder.contains("with 1 failure(s)"));
}

#[tokio::test]
async fn test_transport_failure_continues_on_same_session() {
    let connector = Arc::new(
        ScriptedConnector::new()
            .host("host1", HostScript::new().reply("one", Reply::transport("channel closed"))),
    );
    let (runner, handle, _recorder) = runner(&connector);

    let result = runner.run(&hosts(1), &tasks(&["one", "two"])).await;
    handle.close().await;

    assert!(matches!(result, Err(RunError::Transport { .. })));
    assert_eq!(connector.hosts_for("two"), vec!["host1"]);
    assert_eq!(connector.opened(), vec!["host1"]);
}
