//! Error responses.
//!
//! Every failure the gatekeeper itself produces reaches the client as a
//! JSON `ErrorDetails` body, the same shape callers get from the normalizer.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::errors::{is_retryable_status, ErrorDetails};

/// Render `details` with the given HTTP status.
pub fn error_response(status: StatusCode, details: ErrorDetails) -> Response {
    (status, Json(details)).into_response()
}

/// A client error produced locally, before any upstream call.
pub fn local_error(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    error_response(
        status,
        ErrorDetails {
            status: status.as_u16(),
            message: message.into(),
            code: code.to_string(),
            retryable: is_retryable_status(status.as_u16()),
        },
    )
}
