//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use hostrun::testing::{RecordingWriter, ScriptedConnector, recording_sink};
use hostrun::{Host, HostTarget, SinkHandle, Task, TaskRunner};
use std::sync::Arc;

/// Targets named `host1..=hostN`.
pub fn hosts(count: usize) -> Vec<HostTarget> {
    (1..=count)
        .map(|i| {
            HostTarget::new(
                format!("host{}", i),
                Host {
                    host: format!("10.0.0.{}", i),
                    username: "deploy".into(),
                    password: Some("secret".into()),
                    ..Default::default()
                },
            )
        })
        .collect()
}

/// Plain tasks running `./<name>.sh` and expecting exit code 0.
pub fn tasks(names: &[&str]) -> Vec<Task> {
    names
        .iter()
        .map(|name| Task {
            name: (*name).to_string(),
            cmd: format!("./{}.sh", name),
            ..Default::default()
        })
        .collect()
}

/// A runner over `connector` plus the sink handle and recorded lines.
pub fn runner(connector: &Arc<ScriptedConnector>) -> (TaskRunner, SinkHandle, RecordingWriter) {
    let (sink, handle, recorder) = recording_sink();
    let runner = TaskRunner::new(connector.clone(), sink);
    (runner, handle, recorder)
}

/// A valid task file with two hosts.
pub const TASK_FILE: &str = r#"
version: "1.0.3"
appname: shop
params:
  env: prod
hosts:
  web1:
    host: 10.0.0.1
    username: deploy
    password: secret
  web2:
    host: 10.0.0.2:2222
    username: deploy
    password: secret
tasks:
  - name: stop
    cmd: systemctl stop ${appname}
  - name: deploy
    cmd: ./deploy.sh ${env} ${release_version}
    dir: /srv/${appname}
    message: Deployed ${appname} to ${env}
    depends_on: [stop]
  - name: start
    cmd: systemctl start ${appname}
    depends_on: [deploy]
  - name: cleanup
    cmd: rm -rf /tmp/${appname}
    lib: true
"#;
