//! On-disk persistence for `userConfig.json`.
//!
//! # Storage layout
//!
//! ```text
//! $APP_DATA_DIRECTORY/
//!   userConfig.json      (mode 0600 — holds provider secrets)
//! ```
//!
//! The record is always read whole and rewritten whole; there is no
//! partial-field patch path. A single writer per data directory is assumed,
//! so no locking is done.

use std::path::{Path, PathBuf};

use crate::error::{write_err, ConfigError};
use crate::types::UserConfig;

pub const USER_CONFIG_FILE: &str = "userConfig.json";

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<data_dir>/userConfig.json` — pure, no I/O.
pub fn config_path_at(data_dir: &Path) -> PathBuf {
    data_dir.join(USER_CONFIG_FILE)
}

/// Platform data directory fallback (`~/.local/share/podium` on Linux).
pub fn default_data_dir() -> Result<PathBuf, ConfigError> {
    dirs::data_dir()
        .map(|dir| dir.join("podium"))
        .ok_or(ConfigError::DataDirNotFound)
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load the record at `path`. An absent file is an empty record.
pub fn load(path: &Path) -> Result<UserConfig, ConfigError> {
    if !path.exists() {
        return Ok(UserConfig::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if contents.trim().is_empty() {
        return Ok(UserConfig::default());
    }
    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically overwrite `path` with `config`.
///
/// Write flow: create parent dirs → serialize → `.tmp` sibling → `chmod 0600`
/// → `rename`. The `.tmp` file lives next to the target so the rename never
/// crosses filesystems.
pub fn save(path: &Path, config: &UserConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| write_err(parent, e))?;
        }
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| USER_CONFIG_FILE.to_string());
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));

    let json = serde_json::to_string(config)?;
    std::fs::write(&tmp_path, json).map_err(|e| write_err(&tmp_path, e))?;
    set_file_permissions(&tmp_path)?;
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(write_err(path, e));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// 4. Merge-then-overwrite
// ---------------------------------------------------------------------------

/// Startup bootstrap: merge the environment `overlay` over the persisted
/// record and write the result back, creating the directory if needed.
///
/// Environment values win whenever they are present.
pub fn bootstrap(path: &Path, overlay: UserConfig) -> Result<UserConfig, ConfigError> {
    merge_and_save(path, overlay)
}

/// Settings save: merge `incoming` over the persisted record and write it
/// back. Refused when key changes are locked for this deployment.
pub fn update(
    path: &Path,
    incoming: UserConfig,
    can_change_keys: bool,
) -> Result<UserConfig, ConfigError> {
    if !can_change_keys {
        return Err(ConfigError::KeysLocked);
    }
    merge_and_save(path, incoming)
}

fn merge_and_save(path: &Path, overlay: UserConfig) -> Result<UserConfig, ConfigError> {
    let merged = load(path)?.merge(overlay);
    save(path, &merged)?;
    Ok(merged)
}

// ---------------------------------------------------------------------------
// Permissions
// ---------------------------------------------------------------------------

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| write_err(path, e))
}

#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}
