//! Fail-fast supervision of the service processes.
//!
//! Each launched service gets a watcher task that owns the child, publishes
//! its exit code on a `watch` channel, and terminates it on request. The
//! first service to exit ends supervision; every survivor is then stopped
//! and the first exit code becomes the orchestrator's own.

use std::future::Future;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::sync::{oneshot, watch};

use crate::error::RuntimeError;
use crate::readiness::{self, Probe, Ready};
use crate::service::{ReadinessCheck, ServiceSpec};

/// Reported when a service's real exit status is unavailable.
pub const UNKNOWN_EXIT_CODE: i32 = 1;

/// Exit code of the orchestrator when stopped by Ctrl-C / SIGTERM.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Handle to one supervised service.
#[derive(Debug)]
pub struct ProcessRef {
    name: String,
    pid: Option<u32>,
    exit_rx: watch::Receiver<Option<i32>>,
    stop_tx: Option<oneshot::Sender<()>>,
}

impl ProcessRef {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// OS process id; `None` for in-process services.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Exit code if the service has already exited.
    pub fn exit_code(&self) -> Option<i32> {
        *self.exit_rx.borrow()
    }

    /// Resolves with the exit code once the service has exited.
    pub fn exited(&self) -> impl Future<Output = i32> + Send + 'static {
        let mut exit_rx = self.exit_rx.clone();
        async move {
            match exit_rx.wait_for(Option::is_some).await {
                Ok(code) => (*code).unwrap_or(UNKNOWN_EXIT_CODE),
                Err(_) => UNKNOWN_EXIT_CODE,
            }
        }
    }

    /// Ask the service to stop. Idempotent; a no-op once it has exited.
    pub fn request_stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }

    /// Supervise an in-process task under the same policy as a child
    /// process. `task` receives the stop signal and yields an exit code.
    pub fn spawn_task<F, Fut>(name: impl Into<String>, task: F) -> Self
    where
        F: FnOnce(oneshot::Receiver<()>) -> Fut,
        Fut: Future<Output = i32> + Send + 'static,
    {
        let name = name.into();
        let (exit_tx, exit_rx) = watch::channel(None);
        let (stop_tx, stop_rx) = oneshot::channel();
        let running = task(stop_rx);

        let service = name.clone();
        tokio::spawn(async move {
            let code = running.await;
            tracing::info!(service = %service, code, "service exited");
            let _ = exit_tx.send(Some(code));
        });

        Self {
            name,
            pid: None,
            exit_rx,
            stop_tx: Some(stop_tx),
        }
    }
}

/// How supervision ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// `name` was the first service to exit.
    Exited { name: String, code: i32 },
    /// The orchestrator itself was asked to shut down.
    Interrupted,
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Exited { code, .. } => *code,
            Outcome::Interrupted => INTERRUPTED_EXIT_CODE,
        }
    }
}

/// Start `spec` with its own working directory and environment snapshot,
/// sharing the orchestrator's stdio.
pub fn launch(spec: &ServiceSpec, stop_grace: Duration) -> Result<ProcessRef, RuntimeError> {
    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .current_dir(&spec.cwd)
        .env_clear()
        .envs(&spec.env)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|source| RuntimeError::Spawn {
        name: spec.name.clone(),
        program: spec.program.clone(),
        source,
    })?;
    let pid = child.id();
    tracing::info!(
        service = %spec.name,
        pid,
        command = %spec.command_line(),
        cwd = %spec.cwd.display(),
        "service launched",
    );

    let (exit_tx, exit_rx) = watch::channel(None);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let service = spec.name.clone();
    tokio::spawn(async move {
        let status = tokio::select! {
            status = child.wait() => status,
            Ok(()) = stop_rx => terminate(&mut child, &service, stop_grace).await,
        };
        let code = match status {
            Ok(status) => exit_code(status),
            Err(err) => {
                tracing::warn!(service = %service, error = %err, "failed to collect exit status");
                UNKNOWN_EXIT_CODE
            }
        };
        tracing::info!(service = %service, code, "service exited");
        let _ = exit_tx.send(Some(code));
    });

    Ok(ProcessRef {
        name: spec.name.clone(),
        pid,
        exit_rx,
        stop_tx: Some(stop_tx),
    })
}

/// Poll `check` until `process` is ready, abandoning the wait if it exits.
pub async fn await_ready(
    process: &ProcessRef,
    check: &ReadinessCheck,
    probe: &dyn Probe,
) -> Result<Ready, RuntimeError> {
    readiness::wait_ready(&process.name, probe, check, process.exited()).await
}

/// Wait for the first exit among `services` (or `shutdown`), then stop the
/// rest. There are no restarts.
pub async fn supervise_all<S>(services: Vec<ProcessRef>, shutdown: S, stop_grace: Duration) -> Outcome
where
    S: Future<Output = ()>,
{
    let outcome = tokio::select! {
        (name, code) = first_exit(&services) => Outcome::Exited { name, code },
        _ = shutdown => Outcome::Interrupted,
    };

    match &outcome {
        Outcome::Exited { name, code } => tracing::warn!(
            service = %name,
            code,
            "service exited; stopping all services",
        ),
        Outcome::Interrupted => tracing::info!("shutdown requested; stopping all services"),
    }

    stop_all(services, stop_grace).await;
    outcome
}

/// Resolves with the name and exit code of whichever of `services` exits
/// first. Never resolves for an empty slice.
pub fn first_exit(services: &[ProcessRef]) -> impl Future<Output = (String, i32)> + Send + 'static {
    let exits: Vec<_> = services
        .iter()
        .map(|service| {
            let name = service.name.clone();
            let exited = service.exited();
            Box::pin(async move { (name, exited.await) })
        })
        .collect();
    async move {
        if exits.is_empty() {
            return std::future::pending().await;
        }
        let (first, _, _) = futures::future::select_all(exits).await;
        first
    }
}

/// Best-effort stop of every service, bounded by twice the grace period.
pub async fn stop_all(mut services: Vec<ProcessRef>, stop_grace: Duration) {
    for service in &mut services {
        service.request_stop();
    }

    let exits = futures::future::join_all(services.iter().map(|service| {
        let name = service.name.clone();
        let exited = service.exited();
        async move { (name, exited.await) }
    }));

    match tokio::time::timeout(stop_grace * 2, exits).await {
        Ok(exits) => {
            for (name, code) in exits {
                tracing::debug!(service = %name, code, "service stopped");
            }
        }
        Err(_) => tracing::warn!("some services did not stop in time"),
    }
}

async fn terminate(
    child: &mut Child,
    service: &str,
    stop_grace: Duration,
) -> std::io::Result<ExitStatus> {
    if send_sigterm(child) {
        match tokio::time::timeout(stop_grace, child.wait()).await {
            Ok(status) => return status,
            Err(_) => tracing::warn!(
                service,
                grace_ms = stop_grace.as_millis() as u64,
                "service ignored SIGTERM; killing",
            ),
        }
    }
    child.kill().await?;
    child.wait().await
}

#[cfg(unix)]
fn send_sigterm(child: &Child) -> bool {
    let Some(pid) = child.id() else {
        return false;
    };
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // SAFETY: `pid` belongs to a child we spawned and have not reaped yet.
    unsafe { libc::kill(pid, libc::SIGTERM) == 0 }
}

#[cfg(not(unix))]
fn send_sigterm(_child: &Child) -> bool {
    false
}

/// Exit code, or `128 + signal` for a child killed by a signal.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    UNKNOWN_EXIT_CODE
}
