//! `podium wait` — block until a URL is ready.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use podium_runtime::paths::DEFAULT_READY_TIMEOUT;
use podium_runtime::{wait_blocking, ReadinessCheck};

/// Arguments for `podium wait`.
#[derive(Args, Debug)]
pub struct WaitArgs {
    /// URL to poll; any 2xx or 3xx response counts as ready.
    pub url: String,

    /// Seconds between attempts.
    #[arg(long, default_value_t = 1)]
    pub interval_secs: u64,

    /// Give up after this many seconds. 0 waits forever.
    #[arg(long, default_value_t = DEFAULT_READY_TIMEOUT.as_secs())]
    pub timeout_secs: u64,
}

impl WaitArgs {
    pub fn run(self) -> Result<()> {
        let check = ReadinessCheck {
            url: self.url,
            interval: Duration::from_secs(self.interval_secs.max(1)),
            max_wait: (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs)),
        };
        let ready = wait_blocking(&check)
            .with_context(|| format!("{} never became ready", check.url))?;
        println!(
            "{} ready after {} attempt(s) in {:.1}s",
            check.url,
            ready.attempts,
            ready.elapsed.as_secs_f64()
        );
        Ok(())
    }
}
