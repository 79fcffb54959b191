//! `${token}` substitution for task strings.
//!
//! Tokens are `${param}` for any user parameter plus the built-ins
//! `${appname}` and `${release_version}`. Parameters that share a built-in's
//! name are ignored, so the built-in value always wins. Unknown tokens are
//! left as written.
//!
//! Expansion is a single pass over the template: a substituted value is
//! never scanned again, so a parameter whose value contains `${other}` is
//! inserted literally.

use std::collections::BTreeMap;

use super::types::{Config, Task};

/// Built-in token for the application name.
pub const APPNAME_TOKEN: &str = "appname";
/// Built-in token for the release version stamp.
pub const RELEASE_VERSION_TOKEN: &str = "release_version";

/// Replaces `${token}` placeholders against a fixed set of values.
#[derive(Debug, Clone)]
pub struct Substitutor<'a> {
    params: &'a BTreeMap<String, String>,
    app_name: &'a str,
    release_version: String,
}

impl<'a> Substitutor<'a> {
    /// Create a substitutor over parameters and built-in values.
    pub fn new(params: &'a BTreeMap<String, String>, app_name: &'a str, release_version: i64) -> Self {
        Self {
            params,
            app_name,
            release_version: release_version.to_string(),
        }
    }

    /// Substitute every known token in `template`.
    pub fn substitute(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                rest = &rest[start..];
                break;
            };
            let name = &after[..end];
            match self.lookup(name) {
                Some(value) => out.push_str(value),
                None => out.push_str(&rest[start..start + 2 + end + 1]),
            }
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        out
    }

    fn lookup(&self, name: &str) -> Option<&str> {
        match name {
            APPNAME_TOKEN => Some(self.app_name),
            RELEASE_VERSION_TOKEN => Some(&self.release_version),
            _ => self.params.get(name).map(String::as_str),
        }
    }

    /// Substitute the `cmd`, `dir` and `message` fields of a task in place.
    pub fn apply(&self, task: &mut Task) {
        task.cmd = self.substitute(&task.cmd);
        if let Some(dir) = task.dir.as_mut() {
            *dir = self.substitute(dir);
        }
        if let Some(message) = task.message.as_mut() {
            *message = self.substitute(message);
        }
    }
}

/// Substitute a single template against a configuration's values.
pub fn substitute(
    template: &str,
    params: &BTreeMap<String, String>,
    app_name: &str,
    release_version: i64,
) -> String {
    Substitutor::new(params, app_name, release_version).substitute(template)
}

/// Apply substitution to every task in a configuration.
pub(crate) fn substitute_tasks(config: &mut Config) {
    let substitutor = Substitutor::new(&config.params, &config.app_name, config.release_version);
    for task in &mut config.tasks {
        substitutor.apply(task);
    }
}
