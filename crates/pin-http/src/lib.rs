//! HTTP surface for the device: request/response DTOs, a uniform JSON
//! error envelope, and the `axum::Router` builder that binds every route
//! to the domain engines via [`routes::AppState`].

pub mod dto;
pub mod error;
pub mod image_sniff;
pub mod routes;

pub use error::{error_response, ApiError, ErrorBody};
pub use routes::{build_router, AppState};
