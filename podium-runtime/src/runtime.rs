use std::fs;
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;

use podium_core::{store, ConfigError};

use crate::error::{io_err, RuntimeError};
use crate::paths::PROBE_REQUEST_TIMEOUT;
use crate::readiness::{wait_ready, HttpProbe, Probe, Ready};
use crate::service::{self, ReadinessCheck};
use crate::settings::RuntimeSettings;
use crate::static_files;
use crate::supervisor::{self, ProcessRef, INTERRUPTED_EXIT_CODE};

/// Start the orchestrator and block the current thread until it exits.
///
/// Returns the exit code the process should exit with.
pub fn start_blocking(settings: RuntimeSettings, json_logs: bool) -> Result<i32, RuntimeError> {
    init_tracing(json_logs);
    build_runtime()?.block_on(run(settings))
}

/// Serve `base` on `addr` in the foreground until Ctrl-C or SIGTERM.
pub fn serve_static_blocking(addr: SocketAddr, base: PathBuf) -> Result<(), RuntimeError> {
    init_tracing(false);
    build_runtime()?.block_on(async move {
        let listener = static_files::bind(addr).await?;
        static_files::serve(listener, base, shutdown_signal()).await
    })
}

/// Poll `check.url` over HTTP until it answers or `check.max_wait` runs out.
pub fn wait_blocking(check: &ReadinessCheck) -> Result<Ready, RuntimeError> {
    init_tracing(false);
    build_runtime()?.block_on(async {
        let probe = HttpProbe::new(PROBE_REQUEST_TIMEOUT);
        wait_ready("target", &probe, check, std::future::pending()).await
    })
}

fn build_runtime() -> Result<tokio::runtime::Runtime, RuntimeError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))
}

/// Run the orchestrator with HTTP readiness probes and OS signal handling.
pub async fn run(settings: RuntimeSettings) -> Result<i32, RuntimeError> {
    let probe = HttpProbe::new(PROBE_REQUEST_TIMEOUT);
    run_with(settings, &probe, shutdown_signal()).await
}

/// Bootstrap config → backend → wait → frontend → wait → static server →
/// supervise. Launches are strictly sequential and no readiness wait is
/// skipped.
///
/// Startup failures stop whatever was already launched before returning.
/// A dependency dying during its readiness wait ends the run with that
/// dependency's exit code.
pub async fn run_with<S>(
    settings: RuntimeSettings,
    probe: &dyn Probe,
    shutdown: S,
) -> Result<i32, RuntimeError>
where
    S: Future<Output = ()>,
{
    ensure_runtime_dirs(&settings)?;
    let config = store::bootstrap(&settings.user_config_path, settings.credentials.clone())?;
    tracing::info!(
        path = %settings.user_config_path.display(),
        provider = config.llm.map(|p| p.as_str()).unwrap_or("unset"),
        "user config ready",
    );
    if !config.has_valid_credentials() {
        tracing::warn!("no usable provider credentials yet; configure them from the settings page");
    }

    let env = service::environment_snapshot(&settings.child_environment());
    let grace = settings.stop_grace;
    tokio::pin!(shutdown);

    let mut launched: Vec<ProcessRef> = Vec::new();
    for spec in service::plan(&settings, &env) {
        let process = match supervisor::launch(&spec, grace) {
            Ok(process) => process,
            Err(err) => {
                supervisor::stop_all(launched, grace).await;
                return Err(err);
            }
        };

        // An earlier service dying while this one starts is as fatal as
        // this one dying.
        let readiness = match &spec.readiness {
            Some(check) => tokio::select! {
                ready = supervisor::await_ready(&process, check, probe) => Some(ready.map(|_| ())),
                (name, code) = supervisor::first_exit(&launched) => {
                    Some(Err(RuntimeError::DependencyExited { name, code }))
                }
                _ = &mut shutdown => None,
            },
            None => Some(Ok(())),
        };
        launched.push(process);

        match readiness {
            Some(Ok(())) => {}
            Some(Err(RuntimeError::DependencyExited { name, code })) => {
                tracing::error!(service = %name, code, "service exited during startup");
                supervisor::stop_all(launched, grace).await;
                return Ok(code);
            }
            Some(Err(err)) => {
                tracing::error!(error = %err, "startup aborted");
                supervisor::stop_all(launched, grace).await;
                return Err(err);
            }
            None => {
                tracing::info!("shutdown requested during startup");
                supervisor::stop_all(launched, grace).await;
                return Ok(INTERRUPTED_EXIT_CODE);
            }
        }
    }

    match static_files::launch(settings.static_addr(), settings.data_dir.clone()).await {
        Ok(process) => launched.push(process),
        Err(err) => {
            supervisor::stop_all(launched, grace).await;
            return Err(err);
        }
    }
    tracing::info!(
        backend = %settings.backend_url(),
        frontend = %settings.frontend_url(),
        static_files = %settings.static_url(),
        "all services running",
    );

    let outcome = supervisor::supervise_all(launched, shutdown, grace).await;
    Ok(outcome.exit_code())
}

/// The data directory holds the config file by default, so failing to
/// create it is a config write failure.
fn ensure_runtime_dirs(settings: &RuntimeSettings) -> Result<(), RuntimeError> {
    let data = &settings.data_dir;
    if !data.exists() {
        fs::create_dir_all(data).map_err(|source| ConfigError::Write {
            path: data.clone(),
            source,
        })?;
    }
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl-c"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }
}

pub fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_target(false);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
