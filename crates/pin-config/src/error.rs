//! Local error kind for the KV/config layer, convertible into the shared
//! [`pin_events::PinError`] at call sites that propagate across crates.

use pin_events::PinError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("storage failure: {0}")]
    StorageFail(String),
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

impl From<ConfigError> for PinError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::StorageFail(msg) => PinError::StorageFail(msg),
            ConfigError::InvalidValue(msg) => PinError::InvalidArgument(msg),
        }
    }
}
