//! Runtime settings computed once at startup.
//!
//! The orchestrator never mutates its own process environment. Everything a
//! child needs to know about its siblings is computed here and handed to
//! each [`crate::service::ServiceSpec`] as an explicit environment snapshot.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use podium_core::{env, store, ConfigError, UserConfig};

use crate::paths::{
    backend_dir, base_url, frontend_dir, static_base_url, DEFAULT_BACKEND_PORT,
    DEFAULT_FRONTEND_PORT, DEFAULT_HOST, DEFAULT_POLL_INTERVAL, DEFAULT_READY_TIMEOUT,
    DEFAULT_STATIC_PORT, DEFAULT_STOP_GRACE,
};

pub const APP_DATA_DIRECTORY_VAR: &str = "APP_DATA_DIRECTORY";
pub const USER_CONFIG_PATH_VAR: &str = "USER_CONFIG_PATH";
pub const NODE_ENV_VAR: &str = "NODE_ENV";
pub const USER_STATIC_BASE_URL_VAR: &str = "USER_STATIC_BASE_URL";
pub const BACKEND_URL_VAR: &str = "NEXT_PUBLIC_FAST_API";
pub const FRONTEND_URL_VAR: &str = "NEXT_PUBLIC_URL";

/// Development runs the auto-reloading variants of both services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Development,
    Production,
}

impl Mode {
    fn from_node_env(value: Option<&str>) -> Self {
        match value {
            Some("development") => Mode::Development,
            _ => Mode::Production,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub mode: Mode,
    /// Static asset base directory and default parent of the config file.
    pub data_dir: PathBuf,
    pub user_config_path: PathBuf,
    /// Environment-provided credentials, merged over the persisted record.
    pub credentials: UserConfig,
    pub can_change_keys: bool,

    pub backend_dir: PathBuf,
    pub frontend_dir: PathBuf,
    pub python: String,
    pub npm: String,

    /// Host used to reach the services and to build their public URLs.
    pub host: String,
    pub backend_port: u16,
    pub frontend_port: u16,
    pub static_bind: IpAddr,
    pub static_port: u16,

    pub poll_interval: Duration,
    /// `None` waits forever.
    pub ready_timeout: Option<Duration>,
    pub stop_grace: Duration,
}

impl RuntimeSettings {
    /// Resolve settings from a variable lookup, with `root` as the directory
    /// containing `servers/`.
    pub fn from_lookup<F>(root: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = match non_empty(lookup(APP_DATA_DIRECTORY_VAR)) {
            Some(dir) => PathBuf::from(dir),
            None => store::default_data_dir()?,
        };
        let user_config_path = non_empty(lookup(USER_CONFIG_PATH_VAR))
            .map(PathBuf::from)
            .unwrap_or_else(|| store::config_path_at(&data_dir));

        Ok(Self {
            mode: Mode::from_node_env(lookup(NODE_ENV_VAR).as_deref()),
            user_config_path,
            credentials: env::credentials_from_lookup(&lookup)?,
            can_change_keys: env::can_change_keys_from_lookup(&lookup),
            data_dir,
            backend_dir: backend_dir(root),
            frontend_dir: frontend_dir(root),
            python: "python".to_string(),
            npm: "npm".to_string(),
            host: DEFAULT_HOST.to_string(),
            backend_port: DEFAULT_BACKEND_PORT,
            frontend_port: DEFAULT_FRONTEND_PORT,
            static_bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            static_port: DEFAULT_STATIC_PORT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            ready_timeout: Some(DEFAULT_READY_TIMEOUT),
            stop_grace: DEFAULT_STOP_GRACE,
        })
    }

    /// `from_lookup` over the process environment.
    pub fn from_env(root: &Path) -> Result<Self, ConfigError> {
        Self::from_lookup(root, |key| std::env::var(key).ok())
    }

    pub fn backend_url(&self) -> String {
        base_url(&self.host, self.backend_port)
    }

    pub fn frontend_url(&self) -> String {
        base_url(&self.host, self.frontend_port)
    }

    pub fn static_url(&self) -> String {
        static_base_url(&self.host, self.static_port)
    }

    pub fn static_addr(&self) -> SocketAddr {
        SocketAddr::new(self.static_bind, self.static_port)
    }

    /// Variables the orchestrator adds on top of the inherited environment.
    pub fn child_environment(&self) -> BTreeMap<OsString, OsString> {
        BTreeMap::from([
            (
                APP_DATA_DIRECTORY_VAR.into(),
                self.data_dir.clone().into_os_string(),
            ),
            (
                USER_CONFIG_PATH_VAR.into(),
                self.user_config_path.clone().into_os_string(),
            ),
            (USER_STATIC_BASE_URL_VAR.into(), self.static_url().into()),
            (BACKEND_URL_VAR.into(), self.backend_url().into()),
            (FRONTEND_URL_VAR.into(), self.frontend_url().into()),
        ])
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
