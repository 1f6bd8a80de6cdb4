//! Relay error types with HTTP status code mapping.
//!
//! [`RelayError`] is the central error type surfaced to publishers. Each
//! variant maps to a specific HTTP status code and structured JSON error
//! response. Per-subscriber delivery failures never appear here; they are
//! contained at the connection boundary (see [`crate::domain::DeliveryError`]).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{ChannelId, ChannelIdError};

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "invalid channel id: channel id must be 36 bytes, got 3"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see [`RelayError`] code ranges).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status               |
/// |-----------|-----------------|---------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request           |
/// | 2000–2999 | Not Found       | 404 Not Found             |
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Path segment is not a well-formed channel id.
    #[error("invalid channel id: {0}")]
    InvalidChannel(#[from] ChannelIdError),

    /// Channel id is well-formed but nobody is listening on it.
    #[error("no subscribers on channel {0}")]
    NoSubscribers(ChannelId),
}

impl RelayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidChannel(_) => 1001,
            Self::NoSubscribers(_) => 2001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidChannel(_) => StatusCode::BAD_REQUEST,
            Self::NoSubscribers(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
