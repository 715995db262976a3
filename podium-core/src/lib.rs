//! Podium core library — the persisted user configuration record.
//!
//! - [`types`] — [`UserConfig`], [`Provider`], [`ApiKey`]
//! - [`env`] — credential overlay and key-change policy from the environment
//! - [`store`] — load / bootstrap / update with atomic writes
//! - [`error`] — [`ConfigError`]

pub mod env;
pub mod error;
pub mod store;
pub mod types;

pub use error::ConfigError;
pub use types::{ApiKey, Provider, UserConfig};
