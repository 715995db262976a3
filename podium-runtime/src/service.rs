//! Launch descriptions for supervised services.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use crate::paths::{BACKEND_HEALTH_PATH, FRONTEND_HEALTH_PATH};
use crate::settings::{Mode, RuntimeSettings};

/// Where and how often to poll before a service counts as ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessCheck {
    pub url: String,
    pub interval: Duration,
    /// `None` polls until the service answers or exits.
    pub max_wait: Option<Duration>,
}

/// One external process the orchestrator starts and watches.
#[derive(Debug, Clone)]
pub struct ServiceSpec {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Complete environment of the child; nothing else is inherited.
    pub env: BTreeMap<OsString, OsString>,
    pub readiness: Option<ReadinessCheck>,
}

impl ServiceSpec {
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            cwd: PathBuf::from("."),
            env: BTreeMap::new(),
            readiness: None,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    pub fn env(mut self, env: BTreeMap<OsString, OsString>) -> Self {
        self.env = env;
        self
    }

    pub fn readiness(mut self, check: ReadinessCheck) -> Self {
        self.readiness = Some(check);
        self
    }

    /// `program arg1 arg2 …` for log lines.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Snapshot of the current process environment with `additions` layered on
/// top. Variables that are not valid UTF-8 are carried over unchanged.
pub fn environment_snapshot(
    additions: &BTreeMap<OsString, OsString>,
) -> BTreeMap<OsString, OsString> {
    let mut env: BTreeMap<OsString, OsString> = std::env::vars_os().collect();
    env.extend(additions.iter().map(|(k, v)| (k.clone(), v.clone())));
    env
}

/// Backend then frontend, in launch order.
pub fn plan(settings: &RuntimeSettings, env: &BTreeMap<OsString, OsString>) -> Vec<ServiceSpec> {
    vec![backend(settings, env), frontend(settings, env)]
}

pub fn backend(settings: &RuntimeSettings, env: &BTreeMap<OsString, OsString>) -> ServiceSpec {
    let script = match settings.mode {
        Mode::Development => "server_autoreload.py",
        Mode::Production => "server.py",
    };
    ServiceSpec::new("backend", &settings.python)
        .args([script.to_string(), "--port".to_string(), settings.backend_port.to_string()])
        .cwd(&settings.backend_dir)
        .env(env.clone())
        .readiness(check(settings, format!("{}{BACKEND_HEALTH_PATH}", settings.backend_url())))
}

pub fn frontend(settings: &RuntimeSettings, env: &BTreeMap<OsString, OsString>) -> ServiceSpec {
    let script = match settings.mode {
        Mode::Development => "dev",
        Mode::Production => "start",
    };
    ServiceSpec::new("frontend", &settings.npm)
        .args([
            "run".to_string(),
            script.to_string(),
            "--".to_string(),
            "-p".to_string(),
            settings.frontend_port.to_string(),
        ])
        .cwd(&settings.frontend_dir)
        .env(env.clone())
        .readiness(check(settings, format!("{}{FRONTEND_HEALTH_PATH}", settings.frontend_url())))
}

fn check(settings: &RuntimeSettings, url: String) -> ReadinessCheck {
    ReadinessCheck {
        url,
        interval: settings.poll_interval,
        max_wait: settings.ready_timeout,
    }
}
