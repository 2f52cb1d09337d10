use pin_events::PinError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PluginError {
    #[error("plugin not found: {0}")]
    NotFound(String),
    #[error("plugin already registered: {0}")]
    AlreadyExists(String),
    #[error("registry full, capacity {0}")]
    Full(usize),
    #[error("out of memory: requested {requested}, limit {limit}, used {used}")]
    OutOfMemory {
        requested: u32,
        limit: u32,
        used: u32,
    },
    #[error("rate limited: {calls} calls in window, limit {limit}")]
    RateLimited { calls: u32, limit: u32 },
    #[error("domain not allow-listed: {0}")]
    NotAllowed(String),
    #[error("invalid plugin state for this operation: {0}")]
    InvalidState(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("storage failure: {0}")]
    StorageFail(String),
}

impl From<PluginError> for PinError {
    fn from(e: PluginError) -> Self {
        match e {
            PluginError::NotFound(s) => PinError::NotFound(s),
            PluginError::AlreadyExists(s) => PinError::AlreadyExists(s),
            PluginError::Full(n) => PinError::OutOfMemory(format!("registry full at {n}")),
            PluginError::OutOfMemory { requested, limit, used } => {
                PinError::OutOfMemory(format!("requested {requested}, used {used}/{limit}"))
            }
            PluginError::RateLimited { calls, limit } => {
                PinError::RateLimited(format!("{calls}/{limit} per window"))
            }
            PluginError::NotAllowed(s) => PinError::NotAllowed(s),
            PluginError::InvalidState(s) => PinError::InvalidState(s),
            PluginError::InvalidArgument(s) => PinError::InvalidArgument(s),
            PluginError::StorageFail(s) => PinError::StorageFail(s),
        }
    }
}

impl From<pin_config::ConfigError> for PluginError {
    fn from(e: pin_config::ConfigError) -> Self {
        match e {
            pin_config::ConfigError::StorageFail(s) => PluginError::StorageFail(s),
            pin_config::ConfigError::InvalidValue(s) => PluginError::InvalidArgument(s),
        }
    }
}
