use pin_events::PinError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CanvasError {
    #[error("canvas not found: {0}")]
    NotFound(String),
    #[error("canvas already has {0} elements, limit is 50")]
    Full(usize),
    #[error("duplicate element id: {0}")]
    Duplicate(String),
    #[error("image too large: {0} bytes, limit is 65536")]
    TooLarge(usize),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("storage failure: {0}")]
    StorageFail(String),
}

impl From<CanvasError> for PinError {
    fn from(e: CanvasError) -> Self {
        match e {
            CanvasError::NotFound(s) => PinError::NotFound(s),
            CanvasError::Full(n) => PinError::OutOfMemory(format!("{n} elements")),
            CanvasError::Duplicate(s) => PinError::AlreadyExists(s),
            CanvasError::TooLarge(n) => PinError::OutOfMemory(format!("{n} bytes")),
            CanvasError::InvalidArgument(s) => PinError::InvalidArgument(s),
            CanvasError::StorageFail(s) => PinError::StorageFail(s),
        }
    }
}

impl From<pin_config::ConfigError> for CanvasError {
    fn from(e: pin_config::ConfigError) -> Self {
        match e {
            pin_config::ConfigError::StorageFail(s) => CanvasError::StorageFail(s),
            pin_config::ConfigError::InvalidValue(s) => CanvasError::InvalidArgument(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_large_maps_to_out_of_memory_so_http_reports_413() {
        let mapped: PinError = CanvasError::TooLarge(70_000).into();
        assert!(matches!(mapped, PinError::OutOfMemory(_)));
        assert_eq!(mapped.status_code(), 413);
    }
}
