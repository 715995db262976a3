//! `podium start` — bootstrap config and run the supervised service stack.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;

use podium_runtime::{start_blocking, RuntimeSettings};

/// Arguments for `podium start`.
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Directory containing `servers/fastapi` and `servers/nextjs`.
    /// Defaults to the current directory.
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Override the backend working directory.
    #[arg(long)]
    pub backend_dir: Option<PathBuf>,

    /// Override the frontend working directory.
    #[arg(long)]
    pub frontend_dir: Option<PathBuf>,

    /// Interpreter used to run the backend.
    #[arg(long)]
    pub python: Option<String>,

    /// Package runner used to run the frontend.
    #[arg(long)]
    pub npm: Option<String>,

    /// Host used for readiness probes and the URLs handed to services.
    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub backend_port: Option<u16>,

    #[arg(long)]
    pub frontend_port: Option<u16>,

    #[arg(long)]
    pub static_port: Option<u16>,

    /// Seconds between readiness probes.
    #[arg(long)]
    pub poll_interval_secs: Option<u64>,

    /// Give up on a service that is not ready after this many seconds.
    /// 0 waits forever.
    #[arg(long)]
    pub ready_timeout_secs: Option<u64>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub json_logs: bool,
}

impl StartArgs {
    pub fn run(self) -> Result<()> {
        let root = match self.root.clone() {
            Some(root) => root,
            None => std::env::current_dir().context("could not determine current directory")?,
        };
        let mut settings =
            RuntimeSettings::from_env(&root).context("failed to resolve runtime settings")?;
        self.apply(&mut settings);

        for (name, dir) in [
            ("backend", &settings.backend_dir),
            ("frontend", &settings.frontend_dir),
        ] {
            if !dir.is_dir() {
                bail!("{name} directory not found: {}", dir.display());
            }
        }

        let json_logs = self.json_logs;
        let code = start_blocking(settings, json_logs).context("orchestrator failed")?;
        std::process::exit(code);
    }

    fn apply(&self, settings: &mut RuntimeSettings) {
        if let Some(dir) = &self.backend_dir {
            settings.backend_dir = dir.clone();
        }
        if let Some(dir) = &self.frontend_dir {
            settings.frontend_dir = dir.clone();
        }
        if let Some(python) = &self.python {
            settings.python = python.clone();
        }
        if let Some(npm) = &self.npm {
            settings.npm = npm.clone();
        }
        if let Some(host) = &self.host {
            settings.host = host.clone();
        }
        if let Some(port) = self.backend_port {
            settings.backend_port = port;
        }
        if let Some(port) = self.frontend_port {
            settings.frontend_port = port;
        }
        if let Some(port) = self.static_port {
            settings.static_port = port;
        }
        if let Some(secs) = self.poll_interval_secs {
            settings.poll_interval = Duration::from_secs(secs.max(1));
        }
        if let Some(secs) = self.ready_timeout_secs {
            settings.ready_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
    }
}
