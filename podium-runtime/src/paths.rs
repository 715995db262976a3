use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_BACKEND_PORT: u16 = 8000;
pub const DEFAULT_FRONTEND_PORT: u16 = 3000;
pub const DEFAULT_STATIC_PORT: u16 = 8080;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(5);
pub const PROBE_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Route prefix of the static asset server, without slashes.
pub const STATIC_ROUTE_PREFIX: &str = "user-static";

pub const BACKEND_HEALTH_PATH: &str = "/docs";
pub const FRONTEND_HEALTH_PATH: &str = "/";

pub fn servers_dir(root: &Path) -> PathBuf {
    root.join("servers")
}

pub fn backend_dir(root: &Path) -> PathBuf {
    servers_dir(root).join("fastapi")
}

pub fn frontend_dir(root: &Path) -> PathBuf {
    servers_dir(root).join("nextjs")
}

pub fn base_url(host: &str, port: u16) -> String {
    format!("http://{host}:{port}")
}

pub fn static_base_url(host: &str, port: u16) -> String {
    format!("{}/{STATIC_ROUTE_PREFIX}", base_url(host, port))
}
