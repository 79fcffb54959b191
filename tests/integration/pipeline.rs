//! Load-to-run pipeline tests.
//!
//! A task file is parsed, validated and substituted as a whole before any
//! host is contacted.

use hostrun::testing::{HostScript, Reply, ScriptedConnector};
use hostrun::{ConfigError, ConfigLoader, OnFailure, RunError, select_hosts, select_tasks};
use std::sync::Arc;
use std::time::Duration;

use crate::common::{TASK_FILE, runner};

#[tokio::test]
async fn test_task_file_runs_substituted_commands_in_file_order() {
    let config = ConfigLoader::parse(TASK_FILE, "1.0.0").unwrap();
    let tasks = select_tasks(&config.tasks, None, false).unwrap();
    let hosts = select_hosts(&config, &[]).unwrap();

    let connector = Arc::new(ScriptedConnector::new());
    let (runner, handle, recorder) = runner(&connector);
    runner.run(&hosts, &tasks).await.unwrap();
    handle.close().await;

    let calls = connector.calls();
    let order: Vec<&str> = calls.iter().map(|c| c.task.as_str()).collect();
    assert_eq!(order.len(), 6);
    assert!(order[..2].iter().all(|t| *t == "stop"));
    assert!(order[2..4].iter().all(|t| *t == "deploy"));
    assert!(order[4..].iter().all(|t| *t == "start"));

    let deploy = calls.iter().find(|c| c.task == "deploy").unwrap();
    assert_eq!(
        deploy.command,
        format!("cd '/srv/shop' && ./deploy.sh prod {}", config.release_version)
    );
    assert_eq!(recorder.count("Deployed shop to prod"), 2);
}

#[tokio::test]
async fn test_library_task_runs_only_when_selected() {
    let config = ConfigLoader::parse(TASK_FILE, "1.0.0").unwrap();
    let hosts = select_hosts(&config, &["web2".to_string()]).unwrap();

    let connector = Arc::new(ScriptedConnector::new());
    let (runner, handle, _recorder) = runner(&connector);

    runner
        .run_selected(&hosts, &config.tasks, None, false)
        .await
        .unwrap();
    assert!(connector.hosts_for("cleanup").is_empty());

    runner
        .run_selected(&hosts, &config.tasks, Some("cleanup"), false)
        .await
        .unwrap();
    handle.close().await;

    assert_eq!(connector.hosts_for("cleanup"), vec!["web2"]);
    assert_eq!(connector.calls().len(), 4);
}

#[tokio::test]
async fn test_missing_appname_fails_before_any_session() {
    let yaml = TASK_FILE.replace("appname: shop\n", "");
    let connector = Arc::new(ScriptedConnector::new());

    let result = ConfigLoader::parse(&yaml, "1.0.0");
    assert!(matches!(result, Err(ConfigError::MissingField(ref f)) if f == "appname"));
    assert!(connector.opened().is_empty());
}

#[tokio::test]
async fn test_invalid_dependency_graph_is_rejected() {
    let missing = TASK_FILE.replace("depends_on: [deploy]", "depends_on: [migrate]");
    match ConfigLoader::parse(&missing, "1.0.0") {
        Err(ConfigError::MissingDependency { task, missing }) => {
            assert_eq!(task, "start");
            assert_eq!(missing, "migrate");
        }
        other => panic!("expected missing dependency, got {:?}", other),
    }

    let cycle = TASK_FILE.replace(
        "cmd: systemctl stop ${appname}",
        "cmd: systemctl stop ${appname}\n    depends_on: [start]",
    );
    match ConfigLoader::parse(&cycle, "1.0.0") {
        Err(ConfigError::DependencyCycle { path }) => {
            assert_eq!(path.first(), path.last());
            for name in ["stop", "deploy", "start"] {
                assert!(path.iter().any(|p| p == name));
            }
        }
        other => panic!("expected cycle, got {:?}", other),
    }
}

#[tokio::test]
async fn test_release_version_changes_between_loads() {
    let first = ConfigLoader::parse(TASK_FILE, "1.0.0").unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = ConfigLoader::parse(TASK_FILE, "1.0.0").unwrap();

    let deploy = |c: &hostrun::Config| c.task("deploy").unwrap().cmd.clone();
    assert_ne!(deploy(&first), deploy(&second));
}

#[tokio::test]
async fn test_abort_policy_from_task_file() {
    let yaml = format!("on_failure: abort\n{}", TASK_FILE);
    let config = ConfigLoader::parse(&yaml, "1.0.0").unwrap();
    assert_eq!(config.on_failure, OnFailure::Abort);

    let connector = Arc::new(
        ScriptedConnector::new().host("web1", HostScript::new().reply("stop", Reply::exit(1))),
    );
    let (runner, handle, _recorder) = runner(&connector);
    let runner = runner.on_failure(config.on_failure);

    let tasks = select_tasks(&config.tasks, None, false).unwrap();
    let hosts = select_hosts(&config, &[]).unwrap();
    let result = runner.run(&hosts, &tasks).await;
    handle.close().await;

    assert!(matches!(result, Err(RunError::ExitMismatch { ref host, .. }) if host == "web1"));
    assert_eq!(connector.hosts_for("stop").len(), 2);
    assert!(connector.hosts_for("deploy").is_empty());
}

#[tokio::test]
async fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.yml");
    std::fs::write(&path, TASK_FILE).unwrap();

    let config = ConfigLoader::load(&path, "1.0.0").unwrap();
    assert_eq!(config.app_name, "shop");
    assert_eq!(config.hosts["web2"].address(), ("10.0.0.2", 2222));
    assert_eq!(config.task("stop").unwrap().cmd, "systemctl stop shop");
}
