//! Maps the domain-level [`PinError`] to a conventional HTTP status code
//! and JSON error body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pin_events::PinError;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub status: u16,
}

pub fn error_response(err: &PinError) -> (StatusCode, ErrorBody) {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, ErrorBody { error: err.to_string(), status: status.as_u16() })
}

/// Wraps a `PinError` so handlers can `?`-propagate it and axum turns it
/// into the conventional JSON error response.
#[derive(Debug)]
pub struct ApiError(pub PinError);

impl From<PinError> for ApiError {
    fn from(err: PinError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = error_response(&self.0);
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_each_error_kind_to_its_status_code() {
        assert_eq!(error_response(&PinError::InvalidArgument("x".into())).0, StatusCode::BAD_REQUEST);
        assert_eq!(error_response(&PinError::NotFound("x".into())).0, StatusCode::NOT_FOUND);
        assert_eq!(error_response(&PinError::OutOfMemory("x".into())).0, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(error_response(&PinError::StorageFail("x".into())).0, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error_response(&PinError::Timeout("x".into())).0, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn error_body_carries_message_and_status() {
        let (status, body) = error_response(&PinError::NotAllowed("evil.example".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.status, 400);
        assert!(body.error.contains("evil.example"));
    }
}
