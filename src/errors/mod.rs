//! Error normalization subsystem.
//!
//! # Data Flow
//! ```text
//! Caught value (JSON, reqwest::Error, any std Error)
//!     → transport.rs (recognize shape → Thrown)
//!     → normalize.rs (classify → ErrorDetails)
//!     → caller renders status/message, decides whether to offer a retry
//! ```
//!
//! # Design Decisions
//! - Classification is total and pure: no I/O, no panics
//! - Unknown shapes default to retryable
//! - The retryable flag informs callers; nothing here retries on its own

pub mod normalize;
pub mod transport;

pub use normalize::{
    classify, classify_error, classify_value, is_retryable_status, ErrorDetails,
    GENERIC_ERROR_CODE, UNKNOWN_ERROR_CODE,
};
pub use transport::{ResponseBody, Thrown, TransportError, TransportResponse};
