//! Interactive retry tests.
//!
//! A failed task with `retry` set asks once whether to run again on that
//! host. A confirmed retry runs the command exactly once more.

use hostrun::RunError;
use hostrun::testing::{HostScript, Reply, ScriptedConnector, ScriptedPrompter};
use std::sync::Arc;

use crate::common::{hosts, runner, tasks};

fn retrying(names: &[&str]) -> Vec<hostrun::Task> {
    let mut tasks = tasks(names);
    for task in &mut tasks {
        task.retry = true;
    }
    tasks
}

#[tokio::test]
async fn test_recovered_task_is_logged_but_run_still_fails() {
    let connector = Arc::new(
        ScriptedConnector::new().host(
            "host1",
            HostScript::new()
                .reply("migrate", Reply::output(1, "lock held"))
                .reply("migrate", Reply::ok()),
        ),
    );
    let prompter = Arc::new(ScriptedPrompter::new(true));
    let (runner, handle, recorder) = runner(&connector);
    let runner = runner.prompter(prompter.clone());

    let result = runner.run(&hosts(2), &retrying(&["migrate"])).await;
    handle.close().await;

    assert!(matches!(result, Err(RunError::ExitMismatch { ref host, .. }) if host == "host1"));
    assert_eq!(
        prompter.asked(),
        vec![("migrate".to_string(), "host1".to_string())]
    );
    assert_eq!(connector.hosts_for("migrate").len(), 3);
    assert!(recorder.contains("[host1] migrate: | lock held"));
    assert!(recorder.contains("[host1] migrate: succeeded after retry"));
}

#[tokio::test]
async fn test_declined_retry_does_not_rerun() {
    let connector = Arc::new(
        ScriptedConnector::new().host("host1", HostScript::new().reply("migrate", Reply::exit(1))),
    );
    let prompter = Arc::new(ScriptedPrompter::new(false));
    let (runner, handle, recorder) = runner(&connector);
    let runner = runner.prompter(prompter.clone());

    assert!(runner.run(&hosts(1), &retrying(&["migrate"])).await.is_err());
    handle.close().await;

    assert_eq!(prompter.asked().len(), 1);
    assert_eq!(connector.hosts_for("migrate").len(), 1);
    assert!(!recorder.contains("retrying"));
}

#[tokio::test]
async fn test_no_prompt_without_retry_flag() {
    let connector = Arc::new(
        ScriptedConnector::new().host("host1", HostScript::new().reply("one", Reply::exit(1))),
    );
    let prompter = Arc::new(ScriptedPrompter::new(true));
    let (runner, handle, _recorder) = runner(&connector);
    let runner = runner.prompter(prompter.clone());

    assert!(runner.run(&hosts(1), &tasks(&["one"])).await.is_err());
    handle.close().await;

    assert!(prompter.asked().is_empty());
    assert_eq!(connector.hosts_for("one").len(), 1);
}

#[tokio::test]
async fn test_askpass_answers_password_prompt() {
    let mut tasks = tasks(&["restart"]);
    tasks[0].ask_pass = true;
    let connector = Arc::new(ScriptedConnector::new());
    let prompter = Arc::new(ScriptedPrompter::new(false).with_password("sudo-pass"));
    let (runner, handle, _recorder) = runner(&connector);
    let runner = runner.prompter(prompter);

    runner.run(&hosts(2), &tasks).await.unwrap();
    handle.close().await;

    let calls = connector.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.pty && c.password.as_deref() == Some("sudo-pass")));
}
