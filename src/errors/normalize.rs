//! Error normalization.
//!
//! Collapses every [`Thrown`] shape into one [`ErrorDetails`] record so
//! callers never branch on where a failure came from. [`classify`] is total:
//! it returns a value for every input and never panics.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::transport::{Thrown, TransportError};

pub const UNKNOWN_ERROR_CODE: &str = "UNKNOWN_ERROR";
pub const GENERIC_ERROR_CODE: &str = "ERROR";
const TRANSPORT_FALLBACK_MESSAGE: &str = "Unknown error";
const UNKNOWN_VALUE_MESSAGE: &str = "An unknown error occurred";

/// Uniform description of a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// HTTP status, or `0` when no response was received.
    pub status: u16,
    pub message: String,
    pub code: String,
    /// Whether retrying the same operation is reasonable.
    pub retryable: bool,
}

/// Retry policy over a response status.
///
/// `0` (no response) is grouped with server errors, timeouts (408) and
/// rate limiting (429). Every other status is a client error.
pub fn is_retryable_status(status: u16) -> bool {
    status == 0 || status >= 500 || status == 408 || status == 429
}

/// Normalize a caught value.
pub fn classify(thrown: &Thrown) -> ErrorDetails {
    match thrown {
        Thrown::Transport(err) => classify_transport(err),
        Thrown::Error { message } => ErrorDetails {
            status: 0,
            message: message.clone(),
            code: GENERIC_ERROR_CODE.to_string(),
            retryable: true,
        },
        Thrown::Other(_) => ErrorDetails {
            status: 0,
            message: UNKNOWN_VALUE_MESSAGE.to_string(),
            code: UNKNOWN_ERROR_CODE.to_string(),
            retryable: true,
        },
    }
}

fn classify_transport(err: &TransportError) -> ErrorDetails {
    // Empty strings and a zero status count as absent.
    let status = err.status().unwrap_or(0);
    let message = err
        .body_message()
        .filter(|m| !m.is_empty())
        .or_else(|| err.message.as_deref().filter(|m| !m.is_empty()))
        .unwrap_or(TRANSPORT_FALLBACK_MESSAGE);
    let code = err
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .unwrap_or(UNKNOWN_ERROR_CODE);

    ErrorDetails {
        status,
        message: message.to_string(),
        code: code.to_string(),
        retryable: is_retryable_status(status),
    }
}

/// Normalize an arbitrary JSON value.
pub fn classify_value(value: &Value) -> ErrorDetails {
    classify(&Thrown::from_value(value.clone()))
}

/// Normalize a Rust error.
pub fn classify_error(err: &(dyn std::error::Error + 'static)) -> ErrorDetails {
    classify(&Thrown::from_error(err))
}

impl From<&Thrown> for ErrorDetails {
    fn from(thrown: &Thrown) -> Self {
        classify(thrown)
    }
}

impl From<&TransportError> for ErrorDetails {
    fn from(err: &TransportError) -> Self {
        classify_transport(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::transport::{ResponseBody, TransportResponse};
    use serde_json::json;

    fn transport(status: Option<u16>, body: Option<&str>, message: Option<&str>, code: Option<&str>) -> Thrown {
        Thrown::Transport(TransportError {
            message: message.map(str::to_string),
            code: code.map(str::to_string),
            response: status.map(|s| TransportResponse {
                status: Some(s),
                data: body.map(|m| ResponseBody { message: Some(m.to_string()) }),
            }),
        })
    }

    #[test]
    fn test_retryable_statuses() {
        for status in [0, 408, 429, 500, 502, 503, 504, 599] {
            assert!(is_retryable_status(status), "{status} should be retryable");
        }
        for status in [200, 301, 400, 401, 403, 404, 409, 422, 499] {
            assert!(!is_retryable_status(status), "{status} should not be retryable");
        }
    }

    #[test]
    fn test_transport_with_status() {
        let details = classify(&transport(Some(503), None, Some("Request failed"), Some("ERR_BAD_RESPONSE")));
        assert_eq!(
            details,
            ErrorDetails {
                status: 503,
                message: "Request failed".into(),
                code: "ERR_BAD_RESPONSE".into(),
                retryable: true,
            }
        );

        let details = classify(&transport(Some(404), None, Some("Not here"), None));
        assert_eq!(details.status, 404);
        assert_eq!(details.code, UNKNOWN_ERROR_CODE);
        assert!(!details.retryable);

        assert!(classify(&transport(Some(429), None, None, None)).retryable);
    }

    #[test]
    fn test_transport_without_response() {
        let details = classify(&transport(None, None, Some("Network Error"), Some("ERR_NETWORK")));
        assert_eq!(details.status, 0);
        assert_eq!(details.message, "Network Error");
        assert!(details.retryable);
    }

    #[test]
    fn test_body_message_wins() {
        let details = classify(&transport(
            Some(503),
            Some("Server busy"),
            Some("Request failed with status code 503"),
            None,
        ));
        assert_eq!(details.message, "Server busy");
        assert!(details.retryable);
    }

    #[test]
    fn test_transport_fallbacks() {
        let details = classify(&transport(Some(400), Some(""), None, Some("")));
        assert_eq!(details.message, TRANSPORT_FALLBACK_MESSAGE);
        assert_eq!(details.code, UNKNOWN_ERROR_CODE);
        assert!(!details.retryable);
    }

    #[test]
    fn test_generic_error() {
        let details = classify(&Thrown::Error { message: "boom".into() });
        assert_eq!(
            details,
            ErrorDetails {
                status: 0,
                message: "boom".into(),
                code: GENERIC_ERROR_CODE.into(),
                retryable: true,
            }
        );
    }

    #[test]
    fn test_total_over_unknown_values() {
        for value in [json!(null), json!(42), json!("a string"), json!({}), json!([1, 2])] {
            let details = classify_value(&value);
            assert_eq!(details.status, 0);
            assert_eq!(details.message, UNKNOWN_VALUE_MESSAGE);
            assert_eq!(details.code, UNKNOWN_ERROR_CODE);
            assert!(details.retryable);
        }
    }

    #[test]
    fn test_classify_error_uses_display() {
        let err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let details = classify_error(&err);
        assert_eq!(details.message, "reset by peer");
        assert_eq!(details.code, GENERIC_ERROR_CODE);
    }

    #[test]
    fn test_serializes_flat() {
        let details = classify(&transport(Some(404), Some("Missing"), None, Some("ERR_BAD_REQUEST")));
        assert_eq!(
            serde_json::to_value(&details).unwrap(),
            json!({ "status": 404, "message": "Missing", "code": "ERR_BAD_REQUEST", "retryable": false })
        );
    }

    #[test]
    fn test_from_transport_error() {
        let details = ErrorDetails::from(&TransportError::with_status(429, Some("Slow down".into())));
        assert_eq!(details.status, 429);
        assert_eq!(details.message, "Slow down");
        assert_eq!(details.code, "ERR_BAD_REQUEST");
        assert!(details.retryable);

        let details = ErrorDetails::from(&TransportError::without_response("Upstream timed out", "ECONNABORTED"));
        assert_eq!(details.status, 0);
        assert_eq!(details.code, "ECONNABORTED");
        assert!(details.retryable);
    }
}
