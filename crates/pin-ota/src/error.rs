//! OTA-local error kinds, converted into the shared domain error type at
//! the crate boundary.

use pin_events::PinError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OtaError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("manifest fetch failed: {0}")]
    FetchFailed(String),

    #[error("no firmware asset in manifest")]
    AssetMissing,

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("write to update slot failed: {0}")]
    SlotWriteFailed(String),

    #[error("cancelled")]
    Cancelled,
}

impl From<OtaError> for PinError {
    fn from(err: OtaError) -> Self {
        match err {
            OtaError::InvalidArgument(m) => PinError::InvalidArgument(m),
            OtaError::InvalidState(m) => PinError::InvalidState(m),
            OtaError::FetchFailed(m) => PinError::HardwareFail(m),
            OtaError::AssetMissing => PinError::NotFound("pin_firmware.bin asset".to_string()),
            OtaError::DownloadFailed(m) => PinError::HardwareFail(m),
            OtaError::SlotWriteFailed(m) => PinError::StorageFail(m),
            OtaError::Cancelled => PinError::InvalidState("cancelled".to_string()),
        }
    }
}
