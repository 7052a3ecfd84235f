//! Shapes of caught failures.
//!
//! A caught value is one of three things: a transport error from an HTTP
//! call (which may or may not carry a response), an ordinary error with a
//! message, or anything else. [`Thrown`] is that taxonomy as a type.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error arising from a network/HTTP call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{}", .message.as_deref().unwrap_or("transport error"))]
#[serde(default)]
pub struct TransportError {
    /// The error's own top-level message.
    pub message: Option<String>,
    /// Machine-readable code such as `ECONNABORTED`.
    pub code: Option<String>,
    /// Present only when the server answered.
    pub response: Option<TransportResponse>,
}

/// The part of a response a transport error carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportResponse {
    pub status: Option<u16>,
    pub data: Option<ResponseBody>,
}

/// Response body fields the normalizer looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseBody {
    pub message: Option<String>,
}

impl TransportError {
    /// A transport error that never got a response.
    pub fn without_response(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            code: Some(code.into()),
            response: None,
        }
    }

    /// A transport error for a response with the given status.
    pub fn with_status(status: u16, body_message: Option<String>) -> Self {
        Self {
            message: Some(format!("Request failed with status code {status}")),
            code: Some(if status >= 500 { "ERR_BAD_RESPONSE" } else { "ERR_BAD_REQUEST" }.to_string()),
            response: Some(TransportResponse {
                status: Some(status),
                data: body_message.map(|message| ResponseBody { message: Some(message) }),
            }),
        }
    }

    /// Response status, if a response was received.
    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().and_then(|r| r.status)
    }

    /// Message from the response body, if any.
    pub fn body_message(&self) -> Option<&str> {
        self.response
            .as_ref()
            .and_then(|r| r.data.as_ref())
            .and_then(|d| d.message.as_deref())
    }

    /// Lenient extraction from a JSON object; fields of the wrong type are
    /// treated as absent.
    fn from_json(obj: &serde_json::Map<String, Value>) -> Self {
        let response = obj.get("response").and_then(Value::as_object).map(|resp| {
            TransportResponse {
                status: resp
                    .get("status")
                    .and_then(Value::as_u64)
                    .and_then(|s| u16::try_from(s).ok()),
                data: resp.get("data").and_then(Value::as_object).map(|data| ResponseBody {
                    message: string_field(data, "message"),
                }),
            }
        });

        Self {
            message: string_field(obj, "message"),
            code: string_field(obj, "code"),
            response,
        }
    }
}

fn string_field(obj: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

impl From<&reqwest::Error> for TransportError {
    fn from(err: &reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        let code = if err.is_timeout() {
            Some("ECONNABORTED")
        } else if err.is_connect() {
            Some("ERR_NETWORK")
        } else {
            match status {
                Some(s) if s >= 500 => Some("ERR_BAD_RESPONSE"),
                Some(_) => Some("ERR_BAD_REQUEST"),
                None if err.is_decode() || err.is_body() => Some("ERR_BAD_RESPONSE"),
                None => None,
            }
        };

        Self {
            message: Some(err.to_string()),
            code: code.map(str::to_string),
            response: status.map(|s| TransportResponse {
                status: Some(s),
                data: None,
            }),
        }
    }
}

/// A caught value of unknown shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Thrown {
    /// A network/HTTP failure.
    Transport(TransportError),
    /// Any other error that carries a message.
    Error { message: String },
    /// Anything else: null, numbers, strings, plain objects.
    Other(Value),
}

impl Thrown {
    /// Recognize the shape of an arbitrary JSON value.
    ///
    /// Objects flagged `isAxiosError` or carrying a `response` object are
    /// transport errors; other objects with a string `message` are generic
    /// errors; everything else is unknown.
    pub fn from_value(value: Value) -> Self {
        if let Value::Object(obj) = &value {
            let flagged = obj.get("isAxiosError").and_then(Value::as_bool) == Some(true);
            let has_response = obj.get("response").is_some_and(Value::is_object);
            if flagged || has_response {
                return Self::Transport(TransportError::from_json(obj));
            }
            if let Some(message) = obj.get("message").and_then(Value::as_str) {
                return Self::Error {
                    message: message.to_string(),
                };
            }
        }
        Self::Other(value)
    }

    /// Recognize the shape of a Rust error.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        if let Some(transport) = err.downcast_ref::<TransportError>() {
            return Self::Transport(transport.clone());
        }
        if let Some(reqwest_err) = err.downcast_ref::<reqwest::Error>() {
            return Self::Transport(reqwest_err.into());
        }
        Self::Error {
            message: err.to_string(),
        }
    }
}

impl From<TransportError> for Thrown {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}

impl From<&reqwest::Error> for Thrown {
    fn from(err: &reqwest::Error) -> Self {
        Self::Transport(err.into())
    }
}

impl From<Value> for Thrown {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}
