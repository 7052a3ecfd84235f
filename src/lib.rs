//! Authenticating gatekeeper library.
//!
//! Route-based authentication gating in front of a web application, plus a
//! total normalizer that turns any caught failure into one `ErrorDetails`
//! record with a retryable verdict.

pub mod admin;
pub mod config;
pub mod errors;
pub mod gate;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::GatekeeperConfig;
pub use errors::{classify, ErrorDetails, Thrown};
pub use gate::{GateDecision, Gatekeeper};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
