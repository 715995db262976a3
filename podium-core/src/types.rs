//! Domain types for the persisted user configuration.
//!
//! Every optional string field is normalized at the boundary: an empty or
//! whitespace-only value is treated exactly like an absent one, both when
//! read from disk and when taken from the environment.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// The model provider the application is configured to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Google,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::OpenAi, Provider::Google];

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Google => "google",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "google" => Ok(Provider::Google),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ApiKey
// ---------------------------------------------------------------------------

/// A provider secret. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    /// Returns `None` for empty or whitespace-only input.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// `sk-a…wxyz` style rendering for terminal output.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 8 {
            return "*".repeat(chars.len());
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}…{tail}")
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

// ---------------------------------------------------------------------------
// UserConfig
// ---------------------------------------------------------------------------

/// The durable configuration record stored as `userConfig.json`.
///
/// Keys for inactive providers are retained so switching providers back and
/// forth does not lose secrets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(
        rename = "LLM",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "provider_or_none"
    )]
    pub llm: Option<Provider>,

    #[serde(
        rename = "OPENAI_API_KEY",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "key_or_none"
    )]
    pub openai_api_key: Option<ApiKey>,

    #[serde(
        rename = "GOOGLE_API_KEY",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "key_or_none"
    )]
    pub google_api_key: Option<ApiKey>,
}

impl UserConfig {
    /// Per-field merge: every field set in `overlay` wins, everything else is
    /// kept from `self`. Fields absent from both stay absent.
    pub fn merge(self, overlay: UserConfig) -> UserConfig {
        UserConfig {
            llm: overlay.llm.or(self.llm),
            openai_api_key: overlay.openai_api_key.or(self.openai_api_key),
            google_api_key: overlay.google_api_key.or(self.google_api_key),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.llm.is_none() && self.openai_api_key.is_none() && self.google_api_key.is_none()
    }

    pub fn key_for(&self, provider: Provider) -> Option<&ApiKey> {
        match provider {
            Provider::OpenAi => self.openai_api_key.as_ref(),
            Provider::Google => self.google_api_key.as_ref(),
        }
    }

    /// A provider is selected and its key is present.
    pub fn has_valid_credentials(&self) -> bool {
        self.llm
            .map(|provider| self.key_for(provider).is_some())
            .unwrap_or(false)
    }
}

fn provider_or_none<'de, D>(deserializer: D) -> Result<Option<Provider>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        Some(value) if !value.trim().is_empty() => value
            .parse::<Provider>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

fn key_or_none<'de, D>(deserializer: D) -> Result<Option<ApiKey>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(ApiKey::new))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
