//! Authentication gate subsystem.
//!
//! # Data Flow
//! ```text
//! Request URL + credentials
//!     → gatekeeper.rs (classify path against public / api patterns)
//!     → identity.rs (only for protected paths; bounded wait)
//!     → decision.rs (Allow / AllowDeferred / RedirectToSignIn)
//! ```
//!
//! # Design Decisions
//! - Fail closed: a missing identity or a timed-out lookup redirects
//! - Lookup errors propagate; nothing converts them into an allow
//! - Every outcome is an explicit enum variant

pub mod decision;
pub mod gatekeeper;
pub mod identity;

pub use decision::{GateDecision, Identity, RouteClass};
pub use gatekeeper::{GateConfigError, GateError, GateRules, Gatekeeper, SignInTarget, REDIRECT_PARAM};
pub use identity::{
    IdentityError, IdentityLookup, RemoteIdentityLookup, RemoteLookupError, RequestCredentials,
    StaticIdentityLookup,
};
