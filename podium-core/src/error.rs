//! Error types for podium-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from reading, merging, or writing the user
/// configuration record.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("failed to read user config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not a valid record.
    #[error("failed to parse user config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The configuration directory or file could not be created or written.
    #[error("failed to write user config at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("unknown provider '{0}'; expected one of: openai, google")]
    UnknownProvider(String),

    /// `CAN_CHANGE_KEYS=false` is set for this deployment.
    #[error("changing provider keys is disabled for this deployment (CAN_CHANGE_KEYS=false)")]
    KeysLocked,

    /// Neither `APP_DATA_DIRECTORY` nor a platform data directory is available.
    #[error("cannot determine application data directory; set APP_DATA_DIRECTORY")]
    DataDirNotFound,
}

pub(crate) fn write_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Write {
        path: path.into(),
        source,
    }
}
