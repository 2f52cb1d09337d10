//! Domain-level error kinds shared by every subsystem.
//!
//! Each layer handles what it can locally (the panel driver retries a bus
//! transaction once before surfacing `HardwareFail`; the Wi-Fi FSM falls
//! back to `ApMode` on repeated `Failed`) and surfaces everything else
//! through this enum. `pin-http` maps it to a conventional HTTP status
//! code.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PinError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("out of memory: {0}")]
    OutOfMemory(String),

    #[error("timed out waiting on {0}")]
    Timeout(String),

    #[error("busy: {0}")]
    Busy(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("not allowed: {0}")]
    NotAllowed(String),

    #[error("storage failure: {0}")]
    StorageFail(String),

    #[error("integrity check failed: {0}")]
    IntegrityFail(String),

    #[error("hardware failure: {0}")]
    HardwareFail(String),
}

impl PinError {
    /// The conventional HTTP status code assigned to each error kind.
    pub fn status_code(&self) -> u16 {
        match self {
            PinError::InvalidArgument(_) => 400,
            PinError::NotFound(_) => 404,
            PinError::AlreadyExists(_) => 400,
            PinError::OutOfMemory(_) => 413,
            PinError::Timeout(_) => 503,
            PinError::Busy(_) => 503,
            PinError::InvalidState(_) => 400,
            PinError::RateLimited(_) => 503,
            PinError::NotAllowed(_) => 400,
            PinError::StorageFail(_) => 500,
            PinError::IntegrityFail(_) => 500,
            PinError::HardwareFail(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_each_error_kind() {
        assert_eq!(PinError::InvalidArgument("x".into()).status_code(), 400);
        assert_eq!(PinError::NotFound("x".into()).status_code(), 404);
        assert_eq!(PinError::OutOfMemory("x".into()).status_code(), 413);
        assert_eq!(PinError::StorageFail("x".into()).status_code(), 500);
        assert_eq!(PinError::Timeout("x".into()).status_code(), 503);
    }
}
