use pin_events::PinError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WifiError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("radio failure: {0}")]
    RadioFailure(String),
    #[error("storage failure: {0}")]
    StorageFail(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<WifiError> for PinError {
    fn from(e: WifiError) -> Self {
        match e {
            WifiError::InvalidArgument(s) => PinError::InvalidArgument(s),
            WifiError::RadioFailure(s) => PinError::Busy(s),
            WifiError::StorageFail(s) => PinError::StorageFail(s),
            WifiError::NotFound(s) => PinError::NotFound(s),
        }
    }
}

impl From<pin_config::ConfigError> for WifiError {
    fn from(e: pin_config::ConfigError) -> Self {
        match e {
            pin_config::ConfigError::StorageFail(s) => WifiError::StorageFail(s),
            pin_config::ConfigError::InvalidValue(s) => WifiError::InvalidArgument(s),
        }
    }
}
