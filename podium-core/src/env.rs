//! Environment-derived configuration inputs.
//!
//! Every reader has two forms:
//! - `fn_from_lookup(lookup, …)` — explicit variable source; used in tests
//! - `fn_from_env(…)` — reads the process environment, delegates to the lookup form

use crate::error::ConfigError;
use crate::types::{ApiKey, Provider, UserConfig};

pub const LLM_VAR: &str = "LLM";
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const GOOGLE_API_KEY_VAR: &str = "GOOGLE_API_KEY";
pub const CAN_CHANGE_KEYS_VAR: &str = "CAN_CHANGE_KEYS";

/// Build the credential overlay from a variable lookup.
///
/// Unset and empty variables both map to absent fields. An unrecognized
/// `LLM` value is an error rather than silently ignored.
pub fn credentials_from_lookup<F>(lookup: F) -> Result<UserConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let llm = match lookup(LLM_VAR).filter(|v| !v.trim().is_empty()) {
        Some(value) => Some(value.parse::<Provider>()?),
        None => None,
    };
    Ok(UserConfig {
        llm,
        openai_api_key: lookup(OPENAI_API_KEY_VAR).and_then(ApiKey::new),
        google_api_key: lookup(GOOGLE_API_KEY_VAR).and_then(ApiKey::new),
    })
}

/// `credentials_from_lookup` over the process environment.
pub fn credentials_from_env() -> Result<UserConfig, ConfigError> {
    credentials_from_lookup(|key| std::env::var(key).ok())
}

/// Keys may be changed unless `CAN_CHANGE_KEYS` is exactly `false`.
pub fn can_change_keys_from_lookup<F>(lookup: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(CAN_CHANGE_KEYS_VAR).as_deref() != Some("false")
}

/// `can_change_keys_from_lookup` over the process environment.
pub fn can_change_keys_from_env() -> bool {
    can_change_keys_from_lookup(|key| std::env::var(key).ok())
}
