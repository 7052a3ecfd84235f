//! Request middleware.

pub mod gatekeeper;

pub use gatekeeper::{gatekeeper_middleware, GateState, X_AUTHENTICATED_USER};
