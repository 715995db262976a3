//! `podium serve-static` — run the asset server on its own.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use podium_runtime::paths::{static_base_url, DEFAULT_STATIC_PORT};
use podium_runtime::{serve_static_blocking, RuntimeSettings};

/// Arguments for `podium serve-static`.
#[derive(Args, Debug)]
pub struct ServeStaticArgs {
    /// Directory to serve. Defaults to the app data directory.
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1")]
    pub bind: IpAddr,

    #[arg(long, default_value_t = DEFAULT_STATIC_PORT)]
    pub port: u16,
}

impl ServeStaticArgs {
    pub fn run(self) -> Result<()> {
        let dir = match self.dir {
            Some(dir) => dir,
            None => {
                let cwd = std::env::current_dir()
                    .context("could not determine current directory")?;
                RuntimeSettings::from_env(&cwd)
                    .context("failed to resolve app data directory")?
                    .data_dir
            }
        };
        if !dir.is_dir() {
            anyhow::bail!("static directory not found: {}", dir.display());
        }

        println!(
            "serving {} at {}",
            dir.display(),
            static_base_url(&self.bind.to_string(), self.port)
        );
        serve_static_blocking(SocketAddr::new(self.bind, self.port), dir)
            .context("static server failed")
    }
}
